//! Persistent per-game state and the per-turn entry point.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{EngineConfig, GameConstants};
use crate::error::{EngineError, Result};
use crate::fields::{FieldSet, FieldSnapshot, HarvestTimeTable};
use crate::fleet::Fleet;
use crate::grid::{CellSet, Grid, Position};
use crate::map::ResourceMap;
use crate::plan::{Deadline, TurnPlan};
use crate::scheduler::{plan_turn, TurnState};
use crate::snapshot::{GameSetup, TurnSnapshot};

/// The decision engine for one game.
///
/// Owns everything that survives between turns: the resource map, the fleet,
/// cached cost fields, the harvest-time table and a seeded RNG. Feeding the
/// same setup, configuration and snapshots always yields the same plans.
#[derive(Debug, Clone)]
pub struct Engine {
    constants: GameConstants,
    config: EngineConfig,
    grid: Grid,
    map: ResourceMap,
    fleet: Fleet,
    fields: FieldSet,
    harvest_time: HarvestTimeTable,
    enemy_structures: CellSet,
    rng: ChaCha8Rng,
    my_player: u32,
    turn: u32,
}

impl Engine {
    /// Set up an engine from the game's initialisation message.
    pub fn new(setup: &GameSetup, config: EngineConfig) -> Result<Self> {
        setup.constants.validate()?;
        config.validate()?;
        let constants = setup.constants;
        let grid = Grid::new(constants.width, constants.height);
        grid.check(setup.shipyard)?;
        let map = ResourceMap::try_new(grid.clone(), setup.initial_halite.clone())?;
        let harvest_time = HarvestTimeTable::new(&constants, &config);

        tracing::info!(
            width = constants.width,
            height = constants.height,
            player = setup.my_player,
            shipyard = %setup.shipyard,
            total_halite = map.total(),
            seed = config.seed,
            "Engine initialised"
        );

        Ok(Self {
            fields: FieldSet::new(&grid),
            fleet: Fleet::new(setup.shipyard),
            enemy_structures: CellSet::new(grid.cell_count()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            my_player: setup.my_player,
            turn: 0,
            constants,
            config,
            grid,
            map,
            harvest_time,
        })
    }

    /// Absorb a turn snapshot and plan every owned ship's move.
    ///
    /// Snapshot inconsistencies (unknown, vanished or misplaced ships) are
    /// fatal. Running out of time is not: remaining ships stay in place.
    pub fn play_turn(&mut self, snapshot: &TurnSnapshot, deadline: &Deadline) -> Result<TurnPlan> {
        if snapshot.turn < self.turn {
            return Err(EngineError::InvalidState(format!(
                "turn {} arrived after turn {}",
                snapshot.turn, self.turn
            )));
        }
        self.turn = snapshot.turn;
        self.map.apply_updates(&snapshot.halite_updates)?;
        self.map.replace_bonuses(&snapshot.bonus)?;
        self.fleet.sync(&self.grid, snapshot)?;

        self.enemy_structures.clear();
        for &pos in &snapshot.enemy_dropoffs {
            self.grid.check(pos)?;
            self.enemy_structures.insert(self.grid.index(pos));
        }
        let enemy_ships = snapshot
            .enemy_ships
            .iter()
            .map(|ship| self.grid.check(ship.position))
            .collect::<Result<Vec<Position>>>()?;
        let dropoffs = self.fleet.home_positions();
        self.fields.mark_stale();

        let mut state = TurnState {
            turn: self.turn,
            grid: &self.grid,
            constants: &self.constants,
            config: &self.config,
            harvest_time: &self.harvest_time,
            map: &mut self.map,
            fields: &mut self.fields,
            ships: self.fleet.ships_mut(),
            dropoffs: &dropoffs,
            bank: snapshot.bank,
            return_blocked: &self.enemy_structures,
            enemy_ships: &enemy_ships,
            rng: &mut self.rng,
        };
        plan_turn(&mut state, deadline)
    }

    /// Copy of the current cost fields for external visualisation.
    #[must_use]
    pub fn field_snapshot(&self) -> FieldSnapshot {
        self.fields.snapshot()
    }

    /// Grid geometry.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Current resource state.
    #[must_use]
    pub const fn map(&self) -> &ResourceMap {
        &self.map
    }

    /// Owned ships and bases.
    #[must_use]
    pub const fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Cached cost fields.
    #[must_use]
    pub const fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Game constants.
    #[must_use]
    pub const fn constants(&self) -> &GameConstants {
        &self.constants
    }

    /// Tuning constants.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Player id this engine plays for.
    #[must_use]
    pub const fn my_player(&self) -> u32 {
        self.my_player
    }

    /// Last turn played.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::plan::MoveAction;
    use crate::snapshot::ShipReport;

    fn setup() -> GameSetup {
        GameSetup {
            constants: GameConstants {
                width: 8,
                height: 8,
                ..GameConstants::default()
            },
            my_player: 0,
            shipyard: Position::new(0, 0),
            initial_halite: vec![50; 64],
        }
    }

    fn snapshot(turn: u32, ships: Vec<ShipReport>, spawned: Vec<u32>) -> TurnSnapshot {
        TurnSnapshot {
            turn,
            ships,
            spawned,
            dropoffs: vec![Position::new(0, 0)],
            ..TurnSnapshot::default()
        }
    }

    #[test]
    fn test_rejects_mismatched_halite() {
        let mut bad = setup();
        bad.initial_halite.pop();
        assert!(Engine::new(&bad, EngineConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_shipyard_off_grid() {
        let mut bad = setup();
        bad.shipyard = Position::new(9, 0);
        assert!(matches!(
            Engine::new(&bad, EngineConfig::default()).unwrap_err(),
            EngineError::OutOfBounds { .. }
        ));
    }

    #[test]
    fn test_plan_follows_into_next_turn() {
        let mut engine = Engine::new(&setup(), EngineConfig::default()).unwrap();
        let ship = ShipReport {
            id: 1,
            position: Position::new(0, 0),
            cargo: 0,
        };
        let plan = engine
            .play_turn(&snapshot(1, vec![ship], vec![1]), &Deadline::unbounded())
            .unwrap();
        assert_eq!(plan.moves.len(), 1);
        let m = plan.moves[0];

        // Reporting the ship where the plan put it is accepted.
        let next = ShipReport {
            position: m.to,
            ..ship
        };
        engine
            .play_turn(&snapshot(2, vec![next], vec![]), &Deadline::unbounded())
            .unwrap();

        // Reporting it anywhere else is fatal.
        let here = engine.fleet().ship(1).unwrap().position;
        let wrong = ShipReport {
            position: engine.grid().step(here, Direction::South),
            ..ship
        };
        let err = engine
            .play_turn(&snapshot(3, vec![wrong], vec![]), &Deadline::unbounded())
            .unwrap_err();
        assert!(matches!(err, EngineError::PositionMismatch { ship: 1, .. }));
        assert!(matches!(m.action, MoveAction::Stay | MoveAction::Move(_)));
    }

    #[test]
    fn test_turns_must_not_go_backwards() {
        let mut engine = Engine::new(&setup(), EngineConfig::default()).unwrap();
        engine
            .play_turn(&snapshot(5, vec![], vec![]), &Deadline::unbounded())
            .unwrap();
        assert!(engine
            .play_turn(&snapshot(4, vec![], vec![]), &Deadline::unbounded())
            .is_err());
    }

    #[test]
    fn test_rejects_oversized_cell_cap() {
        let config = EngineConfig {
            max_cell_value: 1e13,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(&setup(), config).unwrap_err(),
            EngineError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_snapshot_without_bases_keeps_shipyard() {
        let mut board = setup();
        board.constants.width = 4;
        board.constants.height = 4;
        board.initial_halite = vec![0; 16];
        let mut engine = Engine::new(&board, EngineConfig::default()).unwrap();
        let full = ShipReport {
            id: 1,
            position: Position::new(0, 1),
            cargo: 1000,
        };
        let bare = TurnSnapshot {
            dropoffs: Vec::new(),
            ..snapshot(1, vec![full], vec![1])
        };
        let plan = engine.play_turn(&bare, &Deadline::unbounded()).unwrap();
        assert_eq!(engine.fleet().home_positions(), vec![Position::new(0, 0)]);
        assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 0));
    }

    #[test]
    fn test_field_snapshot_after_turn() {
        let mut engine = Engine::new(&setup(), EngineConfig::default()).unwrap();
        engine
            .play_turn(&snapshot(1, vec![], vec![]), &Deadline::unbounded())
            .unwrap();
        let fields = engine.field_snapshot();
        assert_eq!(fields.returns.at(Position::new(0, 0)), 0.0);
        assert_eq!(fields.returns.values().len(), 64);
    }
}
