//! Test fixtures and helpers.
//!
//! Map and ship builders plus [`Sandbox`], a minimal stand-in for the game
//! environment that turns plans back into snapshots so tests can drive an
//! engine for many turns.

use std::collections::BTreeMap;

use fleet_core::config::GameConstants;
use fleet_core::engine::Engine;
use fleet_core::error::Result;
use fleet_core::grid::{Grid, Position};
use fleet_core::map::CellUpdate;
use fleet_core::plan::{Deadline, MoveAction, TurnPlan};
use fleet_core::ship::ShipId;
use fleet_core::snapshot::{Directive, GameSetup, ShipReport, TurnSnapshot};

/// Constants for a `width` x `height` board, everything else at defaults.
#[must_use]
pub fn constants(width: usize, height: usize) -> GameConstants {
    GameConstants {
        width,
        height,
        ..GameConstants::default()
    }
}

/// Halite in the bank at the start of a sandbox game.
pub const STARTING_BANK: u64 = 5000;

/// Game setup with the shipyard at the origin.
#[must_use]
pub fn setup(width: usize, height: usize, halite: Vec<u32>) -> GameSetup {
    assert_eq!(halite.len(), width * height, "halite length must match the board");
    GameSetup {
        constants: constants(width, height),
        my_player: 0,
        shipyard: Position::new(0, 0),
        initial_halite: halite,
    }
}

/// Every cell holds `value`.
#[must_use]
pub fn uniform_setup(width: usize, height: usize, value: u32) -> GameSetup {
    setup(width, height, vec![value; width * height])
}

/// Deterministic uneven halite: rich patches on a thin background.
///
/// The pattern depends only on the arguments, so repeated calls build
/// identical maps.
#[must_use]
pub fn patterned_halite(width: usize, height: usize, seed: u64) -> Vec<u32> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..width * height)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let roll = (state >> 33) % 100;
            if roll < 15 {
                300 + (roll as u32) * 40
            } else {
                (roll as u32) % 60
            }
        })
        .collect()
}

/// Setup over [`patterned_halite`].
#[must_use]
pub fn patterned_setup(width: usize, height: usize, seed: u64) -> GameSetup {
    setup(width, height, patterned_halite(width, height, seed))
}

/// Ship report at `(row, col)`.
#[must_use]
pub const fn ship(id: ShipId, row: usize, col: usize, cargo: u32) -> ShipReport {
    ShipReport {
        id,
        position: Position::new(row, col),
        cargo,
    }
}

/// Minimal game environment.
///
/// Applies plans the way the real game does for a single player: moves cost
/// a fraction of the origin cell's halite, staying off a base extracts,
/// ships on a base unload into the bank, an affordable construction turns a
/// ship into a base, and ships ending on the same cell are destroyed.
/// Spawning is free.
#[derive(Debug, Clone)]
pub struct Sandbox {
    grid: Grid,
    constants: GameConstants,
    shipyard: Position,
    halite: Vec<u32>,
    reported: Vec<u32>,
    ships: BTreeMap<ShipId, ShipReport>,
    dropoffs: Vec<Position>,
    spawned: Vec<ShipId>,
    lost: Vec<ShipId>,
    directives: Vec<Directive>,
    next_id: ShipId,
    turn: u32,
    banked: u64,
    bank: u64,
}

impl Sandbox {
    /// Environment matching `setup`, with no ships.
    #[must_use]
    pub fn new(setup: &GameSetup) -> Self {
        let constants = setup.constants;
        Self {
            grid: Grid::new(constants.width, constants.height),
            constants,
            shipyard: setup.shipyard,
            halite: setup.initial_halite.clone(),
            reported: setup.initial_halite.clone(),
            ships: BTreeMap::new(),
            dropoffs: vec![setup.shipyard],
            spawned: Vec::new(),
            lost: Vec::new(),
            directives: Vec::new(),
            next_id: 0,
            turn: 0,
            banked: 0,
            bank: STARTING_BANK,
        }
    }

    /// Place a ship directly, reported as spawned in the next snapshot.
    pub fn add_ship(&mut self, report: ShipReport) {
        self.next_id = self.next_id.max(report.id + 1);
        self.spawned.push(report.id);
        self.ships.insert(report.id, report);
    }

    /// Spawn an empty ship on the shipyard if it is free.
    pub fn spawn(&mut self) -> Option<ShipId> {
        if self.ships.values().any(|s| s.position == self.shipyard) {
            return None;
        }
        let id = self.next_id;
        self.add_ship(ShipReport {
            id,
            position: self.shipyard,
            cargo: 0,
        });
        Some(id)
    }

    /// Directives sent with every following snapshot while their ship lives.
    pub fn set_directives(&mut self, directives: Vec<Directive>) {
        self.directives = directives;
    }

    /// Snapshot for the next turn.
    pub fn snapshot(&mut self) -> TurnSnapshot {
        self.turn += 1;
        let halite_updates = self
            .halite
            .iter()
            .zip(self.reported.iter_mut())
            .enumerate()
            .filter_map(|(index, (&now, seen))| {
                (now != *seen).then(|| {
                    *seen = now;
                    CellUpdate {
                        position: self.grid.position(index),
                        halite: now,
                    }
                })
            })
            .collect();
        TurnSnapshot {
            turn: self.turn,
            halite_updates,
            ships: self.ships.values().copied().collect(),
            spawned: std::mem::take(&mut self.spawned),
            lost: std::mem::take(&mut self.lost),
            dropoffs: self.dropoffs.clone(),
            bank: u32::try_from(self.bank).unwrap_or(u32::MAX),
            directives: self
                .directives
                .iter()
                .filter(|d| self.ships.contains_key(&d.ship))
                .copied()
                .collect(),
            ..TurnSnapshot::default()
        }
    }

    /// Carry out a plan.
    pub fn apply(&mut self, plan: &TurnPlan) {
        let mut arrivals: BTreeMap<Position, Vec<ShipId>> = BTreeMap::new();
        for m in &plan.moves {
            let Some(ship) = self.ships.get_mut(&m.ship) else {
                continue;
            };
            let index = self.grid.index(ship.position);
            match m.action {
                MoveAction::Construct => {
                    let own = u64::from(ship.cargo) + u64::from(self.halite[index]);
                    let cost = u64::from(self.constants.dropoff_cost).saturating_sub(own);
                    if cost <= self.bank && !self.dropoffs.contains(&m.from) {
                        self.bank -= cost;
                        self.halite[index] = 0;
                        self.ships.remove(&m.ship);
                        self.dropoffs.push(m.from);
                        continue;
                    }
                }
                MoveAction::Stay if self.dropoffs.contains(&ship.position) => {}
                MoveAction::Stay => {
                    let room = self.constants.ship_capacity.saturating_sub(ship.cargo);
                    let taken = self.constants.extraction(self.halite[index]).min(room);
                    self.halite[index] -= taken;
                    ship.cargo += taken;
                }
                MoveAction::Move(direction) => {
                    let fuel = self.constants.move_cost(self.halite[index]);
                    if ship.cargo >= fuel {
                        ship.cargo -= fuel;
                        ship.position = self.grid.step(ship.position, direction);
                    }
                }
            }
            arrivals.entry(ship.position).or_default().push(ship.id);
        }
        for (pos, ids) in arrivals {
            if ids.len() > 1 {
                for id in ids {
                    self.ships.remove(&id);
                    self.lost.push(id);
                }
            } else if self.dropoffs.contains(&pos) {
                if let Some(ship) = self.ships.get_mut(&ids[0]) {
                    self.banked += u64::from(ship.cargo);
                    self.bank += u64::from(ship.cargo);
                    ship.cargo = 0;
                }
            }
        }
    }

    /// Snapshot, plan and apply one turn.
    ///
    /// # Errors
    /// Propagates engine errors.
    pub fn step(&mut self, engine: &mut Engine) -> Result<TurnPlan> {
        let snapshot = self.snapshot();
        let plan = engine.play_turn(&snapshot, &Deadline::unbounded())?;
        self.apply(&plan);
        Ok(plan)
    }

    /// Run `turns` turns, spawning a ship every `spawn_every` turns
    /// (never when zero). Returns every plan.
    ///
    /// # Errors
    /// Propagates engine errors.
    pub fn run(&mut self, engine: &mut Engine, turns: u32, spawn_every: u32) -> Result<Vec<TurnPlan>> {
        let mut plans = Vec::with_capacity(turns as usize);
        for turn in 0..turns {
            if spawn_every > 0 && turn % spawn_every == 0 {
                self.spawn();
            }
            plans.push(self.step(engine)?);
        }
        Ok(plans)
    }

    /// Live ships.
    #[must_use]
    pub const fn ships(&self) -> &BTreeMap<ShipId, ShipReport> {
        &self.ships
    }

    /// Bases, shipyard first.
    #[must_use]
    pub fn dropoffs(&self) -> &[Position] {
        &self.dropoffs
    }

    /// Halite on a cell.
    #[must_use]
    pub fn halite(&self, pos: Position) -> u32 {
        self.halite[self.grid.index(pos)]
    }

    /// Halite unloaded at bases so far.
    #[must_use]
    pub const fn banked(&self) -> u64 {
        self.banked
    }

    /// Halite available for building, after construction costs.
    #[must_use]
    pub const fn bank(&self) -> u64 {
        self.bank
    }

    /// Ships destroyed by collisions since the last snapshot.
    #[must_use]
    pub fn pending_losses(&self) -> &[ShipId] {
        &self.lost
    }
}
