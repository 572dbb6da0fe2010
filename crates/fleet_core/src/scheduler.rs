//! Turn scheduler.
//!
//! Turns the fleet into one finalized move per ship:
//!
//! 1. Ships that cannot pay the move cost off their cell stay and harvest.
//! 2. Every other ship is classified into a role and routed along the
//!    matching cost field, recording the cell it wants next.
//! 3. Ships are finalized one at a time in `(role priority, distance, id)`
//!    order. An occupied target triggers the push protocol, then a forced
//!    swap, then one deferral to a later pass, then staying in place. An
//!    iteration cap finalizes any stragglers in place.
//! 4. Staying harvests, which lowers the cell's halite and marks the cost
//!    fields stale; they are rebuilt and every pending route re-derived
//!    before the next selection.
//!
//! All state is passed in through [`TurnState`]; nothing is global.

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;

use crate::config::{EngineConfig, GameConstants};
use crate::error::{EngineError, Result};
use crate::fields::{FieldInputs, FieldSet, HarvestTimeTable};
use crate::grid::{CellSet, Grid, Position};
use crate::map::ResourceMap;
use crate::navigate::{self, Terrain};
use crate::occupancy::{DesireMap, ForbiddenCells, Occupancy};
use crate::plan::{Deadline, MoveAction, ShipMove, TurnPlan, TurnStats};
use crate::push::{find_push_path, PushLimits, PushOutcome, PushPath, PushView};
use crate::role::{self, Role};
use crate::ship::{Ship, ShipId};

/// Everything a turn is planned against, borrowed from the owner of the
/// persistent game state.
#[derive(Debug)]
pub struct TurnState<'a> {
    /// Turn number.
    pub turn: u32,
    /// Grid geometry.
    pub grid: &'a Grid,
    /// Game constants.
    pub constants: &'a GameConstants,
    /// Tuning constants.
    pub config: &'a EngineConfig,
    /// Precomputed harvest-time lookup.
    pub harvest_time: &'a HarvestTimeTable,
    /// Resource state, lowered by harvesting ships.
    pub map: &'a mut ResourceMap,
    /// Cached cost fields.
    pub fields: &'a mut FieldSet,
    /// Owned ships in identity order.
    pub ships: &'a mut BTreeMap<ShipId, Ship>,
    /// Owned bases.
    pub dropoffs: &'a [Position],
    /// Halite available for building dropoffs.
    pub bank: u32,
    /// Cells the return field may not route through.
    pub return_blocked: &'a CellSet,
    /// Opposing ship positions.
    pub enemy_ships: &'a [Position],
    /// Source of fugitive sampling.
    pub rng: &'a mut ChaCha8Rng,
}

/// Plan every owned ship's move for this turn.
///
/// Fails only on internal invariant violations. When `deadline` expires,
/// every ship not yet finalized stays in place and the plan is flagged
/// `timed_out`.
pub fn plan_turn(state: &mut TurnState<'_>, deadline: &Deadline) -> Result<TurnPlan> {
    let span = tracing::info_span!("plan_turn", turn = state.turn);
    let _entered = span.enter();
    Planner::new(state).run(deadline)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Finalized,
    Deferred,
}

struct Planner<'s, 'a> {
    state: &'s mut TurnState<'a>,
    homes: CellSet,
    occupancy: Occupancy,
    forbidden: ForbiddenCells,
    desires: DesireMap,
    acted_as: BTreeMap<ShipId, Role>,
    funds: u64,
    max_iterations: usize,
    stats: TurnStats,
}

impl<'s, 'a> Planner<'s, 'a> {
    fn new(state: &'s mut TurnState<'a>) -> Self {
        let grid = state.grid;
        let mut homes = CellSet::new(grid.cell_count());
        for &home in state.dropoffs {
            homes.insert(grid.index(home));
        }

        let mut forbidden = ForbiddenCells::new(grid);
        for &enemy in state.enemy_ships {
            let mut exclude = |pos: Position| {
                let index = grid.index(pos);
                if !homes.contains(index) {
                    forbidden.exclude(index);
                }
            };
            exclude(enemy);
            if state.config.avoid_enemy_adjacent {
                for neighbor in grid.neighbors(enemy) {
                    exclude(neighbor);
                }
            }
        }

        let mut occupancy = Occupancy::new(grid);
        for ship in state.ships.values_mut() {
            ship.begin_turn();
            occupancy.place(grid.index(ship.origin), ship.id);
        }

        let stats = TurnStats {
            ships: state.ships.len(),
            ..TurnStats::default()
        };
        let max_iterations = state.ships.len() * (state.config.max_deferrals as usize + 2) + 1;
        Self {
            homes,
            occupancy,
            forbidden,
            desires: DesireMap::new(grid),
            acted_as: BTreeMap::new(),
            funds: u64::from(state.bank),
            max_iterations,
            stats,
            state,
        }
    }

    fn run(mut self, deadline: &Deadline) -> Result<TurnPlan> {
        let rebuilds_before = self.state.fields.rebuilds();
        self.refresh_fields();
        self.finalize_stuck()?;

        let config = self.state.config;
        for ship in self.state.ships.values_mut() {
            if !ship.finalized {
                role::roll_fugitive(ship, config, &mut *self.state.rng);
            }
        }
        self.refresh_fields();
        self.derive_routes();

        let mut iterations = 0;
        let mut pass = 0;
        let mut timed_out = false;

        loop {
            if deadline.expired() {
                let remaining = self.unfinalized().count();
                if remaining > 0 {
                    tracing::warn!(
                        turn = self.state.turn,
                        remaining,
                        elapsed_ms = deadline.elapsed().as_millis() as u64,
                        "Turn deadline expired, remaining ships stay"
                    );
                    timed_out = true;
                    self.finalize_remaining_in_place()?;
                }
                break;
            }
            if self.refresh_fields() {
                self.derive_routes();
            }
            let Some(id) = self.select(pass) else {
                if self.unfinalized().next().is_none() {
                    break;
                }
                pass += 1;
                continue;
            };

            iterations += 1;
            if iterations > self.max_iterations {
                let remaining = self.unfinalized().count();
                tracing::warn!(
                    turn = self.state.turn,
                    remaining,
                    "Scheduler loop guard tripped, remaining ships stay"
                );
                self.stats.forced = remaining;
                self.finalize_remaining_in_place()?;
                break;
            }
            if self.attempt(id)? == Attempt::Deferred {
                tracing::debug!(ship = id, pass, "Ship deferred");
            }
        }

        self.stats.field_rebuilds = self.state.fields.rebuilds() - rebuilds_before;
        self.stats.elapsed_us = u64::try_from(deadline.elapsed().as_micros()).unwrap_or(u64::MAX);
        let plan = self.build_plan(timed_out)?;
        tracing::info!(
            turn = plan.turn,
            ships = plan.stats.ships,
            moved = plan.stats.moved,
            pushes = plan.stats.pushes,
            rebuilds = plan.stats.field_rebuilds,
            elapsed_us = plan.stats.elapsed_us,
            timed_out,
            "Turn planned"
        );
        Ok(plan)
    }

    fn terrain(&self) -> Terrain<'_> {
        Terrain {
            grid: self.state.grid,
            map: &*self.state.map,
            fields: &*self.state.fields,
            homes: &self.homes,
            constants: self.state.constants,
            config: self.state.config,
        }
    }

    /// Rebuild stale fields. Returns `true` when a rebuild happened.
    fn refresh_fields(&mut self) -> bool {
        let inputs = FieldInputs {
            grid: self.state.grid,
            map: &*self.state.map,
            dropoffs: self.state.dropoffs,
            return_blocked: self.state.return_blocked,
            forbidden: self.forbidden.all(),
            constants: self.state.constants,
            config: self.state.config,
            harvest_time: self.state.harvest_time,
        };
        self.state.fields.refresh(inputs)
    }

    fn unfinalized(&self) -> impl Iterator<Item = &Ship> + '_ {
        self.state.ships.values().filter(|ship| !ship.finalized)
    }

    fn finalize_stuck(&mut self) -> Result<()> {
        let constants = self.state.constants;
        let stuck: Vec<ShipId> = self
            .state
            .ships
            .values()
            .filter(|ship| ship.cargo < constants.move_cost(self.state.map.halite(ship.origin)))
            .map(|ship| ship.id)
            .collect();
        self.stats.stuck = stuck.len();
        for id in stuck {
            let origin = self.ship(id)?.origin;
            self.commit(id, origin)?;
        }
        Ok(())
    }

    fn finalize_remaining_in_place(&mut self) -> Result<()> {
        let remaining: Vec<ShipId> = self.unfinalized().map(|ship| ship.id).collect();
        for id in remaining {
            let origin = self.ship(id)?.origin;
            self.commit(id, origin)?;
        }
        Ok(())
    }

    /// Reclassify and reroute every unfinalized ship against fresh fields.
    fn derive_routes(&mut self) {
        let updates: Vec<(ShipId, Role, navigate::Route)> = {
            let terrain = self.terrain();
            self.unfinalized()
                .map(|ship| {
                    let role = role::classify(ship, &terrain);
                    (ship.id, role, navigate::plan_route(ship, role, &terrain))
                })
                .collect()
        };
        let grid = self.state.grid;
        for (id, role, route) in updates {
            let Some(ship) = self.state.ships.get_mut(&id) else {
                continue;
            };
            if ship.role != role {
                tracing::debug!(ship = id, from = ?ship.role, to = ?role, "Role changed");
                ship.role = role;
            }
            ship.destination = Some(route.destination);
            ship.distance = route.distance;
            ship.desired = Some(route.next);
            if route.next == ship.origin {
                self.desires.remove(id);
            } else {
                self.desires.set(id, grid.index(route.next));
            }
        }
    }

    /// Next ship to finalize among those not deferred past `pass`.
    fn select(&self, pass: u32) -> Option<ShipId> {
        self.unfinalized()
            .filter(|ship| ship.deferrals <= pass)
            .min_by_key(|ship| {
                let distance = if ship.role == Role::Harvester {
                    0
                } else {
                    ship.distance
                };
                (ship.role.priority(), distance, ship.id)
            })
            .map(|ship| ship.id)
    }

    fn ship(&self, id: ShipId) -> Result<&Ship> {
        self.state.ships.get(&id).ok_or(EngineError::UnknownShip(id))
    }

    /// Cells worth moving to, best first; staying is not included.
    fn candidate_moves(&self, ship: &Ship) -> Vec<Position> {
        let Some(desired) = ship.desired.filter(|&d| d != ship.origin) else {
            return Vec::new();
        };
        let terrain = self.terrain();
        let here = navigate::preference(ship, ship.role, ship.origin, &terrain);
        let mut others: Vec<(f64, Position)> = self
            .state
            .grid
            .neighbors(ship.origin)
            .into_iter()
            .filter(|&n| n != desired)
            .map(|n| (navigate::preference(ship, ship.role, n, &terrain), n))
            .filter(|&(score, _)| {
                if ship.is_fugitive() {
                    score.is_finite()
                } else {
                    score > here
                }
            })
            .collect();
        if ship.is_fugitive() {
            others.sort_by(|a, b| a.0.total_cmp(&b.0));
        } else {
            others.sort_by(|a, b| b.0.total_cmp(&a.0));
        }
        std::iter::once(desired)
            .chain(others.into_iter().map(|(_, n)| n))
            .collect()
    }

    fn attempt(&mut self, id: ShipId) -> Result<Attempt> {
        let ship = self.ship(id)?;
        let origin = ship.origin;
        let role = ship.role;
        if role == Role::DropoffBuilder && ship.directive_target() == Some(origin) {
            // Cargo and the cell's halite count toward the build cost.
            let own = u64::from(ship.cargo) + u64::from(self.state.map.halite(origin));
            let cost = u64::from(self.state.constants.dropoff_cost).saturating_sub(own);
            if cost <= self.funds {
                self.funds -= cost;
                if let Some(ship) = self.state.ships.get_mut(&id) {
                    ship.constructing = true;
                }
            } else {
                tracing::debug!(ship = id, cost, funds = self.funds, "Dropoff unaffordable, waiting");
            }
            self.commit(id, origin)?;
            return Ok(Attempt::Finalized);
        }

        let wants_to_move = ship.wants_to_move();
        let deferrals = ship.deferrals;
        let moves = self.candidate_moves(ship);
        let grid = self.state.grid;
        let limits = PushLimits {
            max_depth: self.state.config.max_push_depth,
            max_steps: self.state.config.max_push_steps,
        };

        let mut contested = false;
        for target in moves {
            if !self.forbidden.can_enter(grid.index(target)) {
                continue;
            }
            let Some(blocker) = self.occupancy.occupant(grid.index(target)) else {
                self.commit(id, target)?;
                return Ok(Attempt::Finalized);
            };
            match find_push_path(&*self, id, origin, target, limits) {
                PushOutcome::Success(path) => {
                    tracing::debug!(
                        ship = id,
                        displaced = path.displaced(),
                        "Push succeeded"
                    );
                    self.stats.pushes += 1;
                    self.replay(&path)?;
                    return Ok(Attempt::Finalized);
                }
                PushOutcome::Failed { steps } => {
                    tracing::debug!(ship = id, blocker, steps, "Push failed");
                    self.stats.push_failures += 1;
                    let blocker_role = self.ship(blocker)?.role;
                    if self.state.config.forced_swap
                        && role.outranks(blocker_role)
                        && self.forbidden.can_enter(grid.index(origin))
                    {
                        self.swap(id, blocker, origin, target)?;
                        return Ok(Attempt::Finalized);
                    }
                    contested = true;
                }
            }
        }

        if contested && wants_to_move && deferrals < self.state.config.max_deferrals {
            if let Some(ship) = self.state.ships.get_mut(&id) {
                ship.deferrals += 1;
            }
            self.stats.deferrals += 1;
            return Ok(Attempt::Deferred);
        }
        self.commit(id, origin)?;
        Ok(Attempt::Finalized)
    }

    fn replay(&mut self, path: &PushPath) -> Result<()> {
        for (ship, _, to) in path.replay_order() {
            self.commit(ship, to)?;
        }
        Ok(())
    }

    fn swap(&mut self, pusher: ShipId, blocker: ShipId, origin: Position, target: Position) -> Result<()> {
        tracing::debug!(pusher, blocker, "Forced swap");
        let grid = self.state.grid;
        self.occupancy.vacate(grid.index(origin), pusher);
        self.occupancy.vacate(grid.index(target), blocker);
        self.commit(blocker, origin)?;
        self.commit(pusher, target)?;
        self.stats.swaps += 1;
        Ok(())
    }

    /// Finalize a ship on `to`.
    ///
    /// Staying off a base harvests unless the ship is constructing; any other
    /// target is a move and pays the move cost of the origin cell.
    fn commit(&mut self, id: ShipId, to: Position) -> Result<()> {
        let grid = self.state.grid;
        let constants = self.state.constants;
        let next_role = {
            let ship = self.ship(id)?;
            role::next_role(ship, to, &self.terrain())
        };
        let ship = self
            .state
            .ships
            .get_mut(&id)
            .ok_or(EngineError::UnknownShip(id))?;
        if ship.finalized {
            return Err(EngineError::InvalidState(format!(
                "ship {id} finalized twice"
            )));
        }
        let origin = ship.origin;
        let to_index = grid.index(to);
        if self.occupancy.occupant(to_index).is_some_and(|other| other != id) {
            return Err(EngineError::InvalidState(format!(
                "ship {id} committed onto occupied cell {to}"
            )));
        }
        if !self.forbidden.commit(to_index) {
            return Err(EngineError::InvalidState(format!(
                "cell {to} committed twice"
            )));
        }
        self.occupancy.vacate(grid.index(origin), id);
        self.desires.remove(id);

        let wanted_to_move = ship.wants_to_move();
        ship.position = to;
        ship.finalized = true;
        if to == origin {
            ship.blocked_turns = if wanted_to_move {
                ship.blocked_turns + 1
            } else {
                0
            };
        } else {
            let fuel = constants.move_cost(self.state.map.halite(origin));
            ship.cargo = ship.cargo.saturating_sub(fuel);
            ship.blocked_turns = 0;
            self.stats.moved += 1;
        }
        ship.fugitive_turns = ship.fugitive_turns.saturating_sub(1);
        self.acted_as.insert(id, ship.role);
        if ship.role != next_role {
            tracing::debug!(ship = id, from = ?ship.role, to = ?next_role, "Role changed");
            ship.role = next_role;
        }

        if to == origin && !ship.constructing && !self.homes.contains(to_index) {
            let room = constants.ship_capacity.saturating_sub(ship.cargo);
            let wanted = constants.extraction(self.state.map.halite(origin)).min(room);
            let taken = self.state.map.extract(origin, wanted);
            ship.cargo += taken;
            if taken > 0 {
                self.stats.extracted += u64::from(taken);
                self.state.fields.mark_stale();
            }
        }
        Ok(())
    }

    fn build_plan(&self, timed_out: bool) -> Result<TurnPlan> {
        let grid = self.state.grid;
        let moves = self
            .state
            .ships
            .values()
            .map(|ship| {
                let action = if ship.constructing {
                    MoveAction::Construct
                } else if ship.position == ship.origin {
                    MoveAction::Stay
                } else {
                    let direction = grid
                        .direction_between(ship.origin, ship.position)
                        .ok_or_else(|| {
                            EngineError::InvalidState(format!(
                                "ship {} moved from {} to non-adjacent {}",
                                ship.id, ship.origin, ship.position
                            ))
                        })?;
                    MoveAction::Move(direction)
                };
                Ok(ShipMove {
                    ship: ship.id,
                    from: ship.origin,
                    to: ship.position,
                    action,
                    role: self.acted_as.get(&ship.id).copied().unwrap_or(ship.role),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        #[cfg(feature = "debug-validation")]
        {
            let mut targets = CellSet::new(grid.cell_count());
            for m in &moves {
                if !targets.insert(grid.index(m.to)) {
                    return Err(EngineError::InvalidState(format!(
                        "two ships end the turn on {}",
                        m.to
                    )));
                }
            }
        }
        Ok(TurnPlan {
            turn: self.state.turn,
            moves,
            timed_out,
            stats: self.stats,
        })
    }
}

impl PushView for Planner<'_, '_> {
    fn grid(&self) -> &Grid {
        self.state.grid
    }

    fn can_enter(&self, pos: Position) -> bool {
        self.forbidden.can_enter(self.state.grid.index(pos))
    }

    fn occupant(&self, pos: Position) -> Option<ShipId> {
        self.occupancy.occupant(self.state.grid.index(pos))
    }

    fn role(&self, ship: ShipId) -> Role {
        self.state.ships.get(&ship).map_or(Role::Idle, |s| s.role)
    }

    fn predicted_role(&self, ship: ShipId, at: Position) -> Role {
        self.state
            .ships
            .get(&ship)
            .map_or(Role::Idle, |s| role::next_role(s, at, &self.terrain()))
    }

    fn desired(&self, ship: ShipId) -> Option<Position> {
        self.state
            .ships
            .get(&ship)
            .and_then(|s| s.desired.filter(|&d| d != s.origin))
    }

    fn desirers(&self, pos: Position) -> &[ShipId] {
        self.desires.desirers(self.state.grid.index(pos))
    }

    fn preference(&self, ship: ShipId, pos: Position) -> f64 {
        self.state.ships.get(&ship).map_or(f64::NEG_INFINITY, |s| {
            navigate::preference(s, s.role, pos, &self.terrain())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    struct World {
        grid: Grid,
        constants: GameConstants,
        config: EngineConfig,
        harvest_time: HarvestTimeTable,
        map: ResourceMap,
        fields: FieldSet,
        ships: BTreeMap<ShipId, Ship>,
        dropoffs: Vec<Position>,
        bank: u32,
        return_blocked: CellSet,
        enemies: Vec<Position>,
        rng: ChaCha8Rng,
    }

    impl World {
        fn new(width: usize, height: usize, halite: Vec<u32>) -> Self {
            Self::with_config(width, height, halite, EngineConfig::default())
        }

        fn with_config(width: usize, height: usize, halite: Vec<u32>, config: EngineConfig) -> Self {
            let grid = Grid::new(width, height);
            let constants = GameConstants {
                width,
                height,
                ..GameConstants::default()
            };
            Self {
                harvest_time: HarvestTimeTable::new(&constants, &config),
                map: ResourceMap::new(grid.clone(), halite),
                fields: FieldSet::new(&grid),
                return_blocked: CellSet::new(grid.cell_count()),
                grid,
                constants,
                config,
                ships: BTreeMap::new(),
                dropoffs: vec![Position::new(0, 0)],
                bank: 5000,
                enemies: Vec::new(),
                rng: ChaCha8Rng::seed_from_u64(7),
            }
        }

        fn ship(&mut self, id: ShipId, row: usize, col: usize, cargo: u32, role: Role) -> &mut Ship {
            let mut ship = Ship::new(id, Position::new(row, col), cargo);
            ship.role = role;
            self.ships.insert(id, ship);
            self.ships.get_mut(&id).unwrap()
        }

        fn plan_with(&mut self, deadline: &Deadline) -> Result<TurnPlan> {
            self.plan_capped(deadline, None)
        }

        fn plan_capped(&mut self, deadline: &Deadline, max_iterations: Option<usize>) -> Result<TurnPlan> {
            let mut state = TurnState {
                turn: 1,
                grid: &self.grid,
                constants: &self.constants,
                config: &self.config,
                harvest_time: &self.harvest_time,
                map: &mut self.map,
                fields: &mut self.fields,
                ships: &mut self.ships,
                dropoffs: &self.dropoffs,
                bank: self.bank,
                return_blocked: &self.return_blocked,
                enemy_ships: &self.enemies,
                rng: &mut self.rng,
            };
            let mut planner = Planner::new(&mut state);
            if let Some(cap) = max_iterations {
                planner.max_iterations = cap;
            }
            planner.run(deadline)
        }

        fn plan(&mut self) -> TurnPlan {
            self.plan_with(&Deadline::unbounded()).unwrap()
        }
    }

    fn assert_distinct_targets(plan: &TurnPlan) {
        let targets: BTreeSet<_> = plan.moves.iter().map(|m| m.to).collect();
        assert_eq!(targets.len(), plan.moves.len(), "collision in {plan:?}");
    }

    #[test]
    fn test_full_ship_returns_home() {
        let mut world = World::new(4, 4, vec![0; 16]);
        world.ship(1, 0, 1, 1000, Role::Outbound);
        let plan = world.plan();
        let m = plan.move_of(1).unwrap();
        assert_eq!(m.to, Position::new(0, 0));
        assert_eq!(m.action, MoveAction::Move(crate::grid::Direction::West));
        // Arriving home flips the ship back out.
        assert_eq!(world.ships[&1].role, Role::Outbound);
    }

    #[test]
    fn test_stuck_ship_stays_and_harvests() {
        let mut halite = vec![0; 16];
        halite[5] = 400;
        let mut world = World::new(4, 4, halite);
        world.ship(1, 1, 1, 10, Role::Inbound);
        let plan = world.plan();
        assert_eq!(plan.move_of(1).unwrap().action, MoveAction::Stay);
        assert_eq!(plan.stats.stuck, 1);
        assert_eq!(world.ships[&1].cargo, 110);
        assert_eq!(world.map.halite(Position::new(1, 1)), 300);
        assert!(plan.stats.field_rebuilds >= 2);
    }

    #[test]
    fn test_harvest_respects_capacity() {
        let mut halite = vec![0; 16];
        halite[5] = 800;
        let mut world = World::new(4, 4, halite);
        world.ship(1, 1, 1, 880, Role::Harvester);
        world.plan();
        // 880 is below the fill threshold; 200 available but only 120 fits.
        assert_eq!(world.ships[&1].cargo, 1000);
        assert_eq!(world.map.halite(Position::new(1, 1)), 680);
    }

    #[test]
    fn test_higher_priority_ship_goes_first() {
        // The inbound ship is served first and takes the base.
        let mut world = World::new(4, 4, vec![0; 16]);
        world.ship(1, 1, 0, 0, Role::Outbound);
        world.ship(2, 0, 1, 1000, Role::Inbound);
        let plan = world.plan();
        assert_eq!(plan.move_of(2).unwrap().to, Position::new(0, 0));
        assert_distinct_targets(&plan);
    }

    #[test]
    fn test_push_chain_frees_target() {
        let mut world = World::new(8, 8, vec![0; 64]);
        world.ship(1, 0, 2, 1000, Role::Inbound);
        world.ship(2, 0, 1, 0, Role::Harvester);
        let plan = world.plan();
        assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 1));
        assert_ne!(plan.move_of(2).unwrap().to, Position::new(0, 1));
        assert_eq!(plan.stats.pushes, 1);
        assert_distinct_targets(&plan);
    }

    #[test]
    fn test_forced_swap_when_push_fails() {
        // A 2x1 torus: the only cells are each other's.
        let config = EngineConfig {
            forced_swap: true,
            ..EngineConfig::default()
        };
        let mut world = World::with_config(2, 1, vec![0, 0], config);
        world.dropoffs = vec![Position::new(0, 0)];
        world.ship(1, 0, 1, 1000, Role::Inbound);
        world.ship(2, 0, 0, 0, Role::Outbound);
        let plan = world.plan();
        assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 0));
        assert_eq!(plan.move_of(2).unwrap().to, Position::new(0, 1));
        assert_eq!(plan.stats.swaps, 1);
    }

    #[test]
    fn test_no_swap_without_toggle() {
        let config = EngineConfig {
            forced_swap: false,
            ..EngineConfig::default()
        };
        let mut world = World::with_config(2, 1, vec![0, 0], config);
        world.ship(1, 0, 1, 1000, Role::Inbound);
        world.ship(2, 0, 0, 0, Role::Outbound);
        let plan = world.plan();
        assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 1));
        assert_eq!(plan.move_of(2).unwrap().to, Position::new(0, 0));
        assert_eq!(world.ships[&1].blocked_turns, 1);
        assert_distinct_targets(&plan);
    }

    #[test]
    fn test_enemy_cells_are_avoided() {
        let mut world = World::new(8, 8, vec![0; 64]);
        world.enemies = vec![Position::new(0, 1)];
        world.ship(1, 0, 2, 1000, Role::Inbound);
        let plan = world.plan();
        assert_ne!(plan.move_of(1).unwrap().to, Position::new(0, 1));
    }

    #[test]
    fn test_expired_deadline_keeps_everyone_in_place() {
        let mut world = World::new(4, 4, vec![0; 16]);
        world.ship(1, 0, 1, 1000, Role::Outbound);
        world.ship(2, 2, 2, 1000, Role::Outbound);
        let plan = world
            .plan_with(&Deadline::after(std::time::Duration::ZERO))
            .unwrap();
        assert!(plan.timed_out);
        assert!(plan.moves.iter().all(|m| m.to == m.from));
        assert_eq!(plan.moves.len(), 2);
    }

    #[test]
    fn test_dropoff_builder_constructs_at_target() {
        use crate::snapshot::{Directive, DirectiveKind};
        let mut world = World::new(8, 8, vec![0; 64]);
        world.ship(1, 3, 3, 0, Role::Outbound).directive = Some(Directive {
            ship: 1,
            kind: DirectiveKind::BuildDropoff,
            target: Position::new(3, 3),
        });
        world.ship(2, 5, 5, 0, Role::Outbound).directive = Some(Directive {
            ship: 2,
            kind: DirectiveKind::BuildDropoff,
            target: Position::new(3, 5),
        });
        let plan = world.plan();
        assert_eq!(plan.move_of(1).unwrap().action, MoveAction::Construct);
        assert!(world.ships[&1].constructing);
        assert_eq!(plan.move_of(2).unwrap().to, Position::new(4, 5));
    }

    #[test]
    fn test_dropoff_builder_waits_for_funds() {
        use crate::snapshot::{Directive, DirectiveKind};
        let mut halite = vec![0; 64];
        halite[3 * 8 + 3] = 400;
        let mut world = World::new(8, 8, halite);
        world.bank = 3000;
        for (id, col) in [(1, 3), (2, 5)] {
            world.ship(id, 3, col, 600, Role::Outbound).directive = Some(Directive {
                ship: id,
                kind: DirectiveKind::BuildDropoff,
                target: Position::new(3, col),
            });
        }
        let plan = world.plan();
        // Ship 1 pays 4000 - 600 - 400 from the bank; ship 2 would need 3400.
        assert_eq!(plan.move_of(1).unwrap().action, MoveAction::Construct);
        assert_eq!(plan.move_of(2).unwrap().action, MoveAction::Stay);
        assert!(!world.ships[&2].constructing);
    }

    #[test]
    fn test_loop_guard_keeps_stragglers_in_place() {
        let mut world = World::new(4, 4, vec![0; 16]);
        world.ship(1, 0, 1, 1000, Role::Outbound);
        world.ship(2, 2, 2, 0, Role::Outbound);
        let plan = world.plan_capped(&Deadline::unbounded(), Some(1)).unwrap();
        assert!(!plan.timed_out);
        assert_eq!(plan.stats.forced, 1);
        assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 0));
        let straggler = plan.move_of(2).unwrap();
        assert_eq!(straggler.to, straggler.from);
        assert_eq!(plan.moves.len(), 2);
        assert!(world.ships.values().all(|s| s.finalized));
    }

    #[test]
    fn test_crowded_board_has_no_collisions() {
        let mut halite = vec![0; 36];
        for (i, h) in halite.iter_mut().enumerate() {
            *h = (i as u32 * 37) % 500;
        }
        let mut world = World::new(6, 6, halite);
        let roles = [Role::Inbound, Role::Outbound, Role::Harvester];
        for id in 0..20u32 {
            let index = (id as usize * 7) % 36;
            let cargo = if id % 3 == 0 { 950 } else { 100 };
            world.ship(id, index / 6, index % 6, cargo, roles[id as usize % 3]);
        }
        let plan = world.plan();
        assert_eq!(plan.moves.len(), world.ships.len());
        assert_distinct_targets(&plan);
        for m in &plan.moves {
            assert!(world.grid.distance(m.from, m.to) <= 1);
        }
    }
}
