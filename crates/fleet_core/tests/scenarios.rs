//! End-to-end scenarios through the public engine API.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use fleet_core::config::EngineConfig;
use fleet_core::engine::Engine;
use fleet_core::grid::{Direction, Grid, Position};
use fleet_core::plan::{Deadline, MoveAction, TurnPlan};
use fleet_core::push::{find_push_path, PushLimits, PushOutcome, PushView};
use fleet_core::role::Role;
use fleet_core::ship::ShipId;
use fleet_core::snapshot::{Directive, DirectiveKind, TurnSnapshot};
use fleet_test_utils::fixtures::{patterned_setup, setup, ship, uniform_setup, Sandbox};
use fleet_test_utils::proptest::prelude::*;
use fleet_test_utils::strategies::{arb_config, arb_fleet, arb_halite};

fn assert_valid_plan(grid: &Grid, plan: &TurnPlan) {
    let targets: BTreeSet<_> = plan.moves.iter().map(|m| m.to).collect();
    assert_eq!(targets.len(), plan.moves.len(), "shared target in {plan:?}");
    for m in &plan.moves {
        assert!(grid.distance(m.from, m.to) <= 1, "ship {} jumped", m.ship);
    }
}

#[test]
fn test_empty_board_return_costs_are_zero() {
    let mut engine = Engine::new(&uniform_setup(4, 4, 0), EngineConfig::default()).unwrap();
    let snapshot = TurnSnapshot {
        turn: 1,
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    };
    engine.play_turn(&snapshot, &Deadline::unbounded()).unwrap();

    let fields = engine.field_snapshot();
    assert!(fields.returns.values().iter().all(|&cost| cost == 0.0));
    // The propagation key still grows one per step off the home.
    let returns = engine.fields().returns();
    assert_eq!(returns.key.at(Position::new(2, 2)), 4.0);
    assert_eq!(returns.steps_at(engine.grid(), Position::new(2, 2)), Some(4));
}

#[test]
fn test_full_ship_heads_straight_home() {
    let mut engine = Engine::new(&uniform_setup(4, 4, 0), EngineConfig::default()).unwrap();
    let snapshot = TurnSnapshot {
        turn: 1,
        ships: vec![ship(1, 0, 1, 1000)],
        spawned: vec![1],
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    };
    let plan = engine.play_turn(&snapshot, &Deadline::unbounded()).unwrap();

    let m = plan.move_of(1).unwrap();
    assert_eq!(m.role, Role::Inbound);
    assert_eq!(m.to, Position::new(0, 0));
    assert_eq!(m.action, MoveAction::Move(Direction::West));
}

#[test]
fn test_returning_ship_pushes_a_line_of_two_toward_home() {
    let mut engine = Engine::new(&uniform_setup(8, 1, 0), EngineConfig::default()).unwrap();
    let snapshot = TurnSnapshot {
        turn: 1,
        ships: vec![ship(0, 0, 3, 1000), ship(1, 0, 2, 0), ship(2, 0, 1, 0)],
        spawned: vec![0, 1, 2],
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    };
    let plan = engine.play_turn(&snapshot, &Deadline::unbounded()).unwrap();

    assert_eq!(plan.stats.pushes, 1);
    assert_eq!(plan.move_of(0).unwrap().to, Position::new(0, 2));
    assert_eq!(plan.move_of(1).unwrap().to, Position::new(0, 1));
    assert_eq!(plan.move_of(2).unwrap().to, Position::new(0, 0));
    assert_valid_plan(engine.grid(), &plan);
}

/// Ships on a one-row corridor, each wanting the next cell east.
struct Corridor {
    grid: Grid,
    ships: BTreeMap<ShipId, (Position, Role)>,
    wants: BTreeMap<ShipId, Position>,
    desirers: BTreeMap<Position, Vec<ShipId>>,
}

impl Corridor {
    fn new(length: usize, roles: &[Role]) -> Self {
        let grid = Grid::new(length, 1);
        let mut corridor = Self {
            grid,
            ships: BTreeMap::new(),
            wants: BTreeMap::new(),
            desirers: BTreeMap::new(),
        };
        for (col, &role) in roles.iter().enumerate() {
            let id = col as ShipId;
            let next = Position::new(0, col + 1);
            corridor.ships.insert(id, (Position::new(0, col), role));
            corridor.wants.insert(id, next);
            corridor.desirers.entry(next).or_default().push(id);
        }
        corridor
    }
}

impl PushView for Corridor {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn can_enter(&self, _pos: Position) -> bool {
        true
    }

    fn occupant(&self, pos: Position) -> Option<ShipId> {
        self.ships
            .iter()
            .find(|(_, (at, _))| *at == pos)
            .map(|(&id, _)| id)
    }

    fn role(&self, ship: ShipId) -> Role {
        self.ships[&ship].1
    }

    fn predicted_role(&self, ship: ShipId, _at: Position) -> Role {
        self.role(ship)
    }

    fn desired(&self, ship: ShipId) -> Option<Position> {
        self.wants.get(&ship).copied()
    }

    fn desirers(&self, pos: Position) -> &[ShipId] {
        self.desirers.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    fn preference(&self, _ship: ShipId, pos: Position) -> f64 {
        pos.col as f64
    }
}

#[test]
fn test_three_ships_in_a_line_push_as_one_chain() {
    let corridor = Corridor::new(6, &[Role::Inbound, Role::Outbound, Role::Outbound]);
    let limits = PushLimits {
        max_depth: 8,
        max_steps: 256,
    };
    let outcome = find_push_path(&corridor, 0, Position::new(0, 0), Position::new(0, 1), limits);
    let PushOutcome::Success(path) = outcome else {
        panic!("expected a push chain, got {outcome:?}");
    };
    assert_eq!(path.ships, vec![0, 1, 2]);
    assert_eq!(
        path.cells,
        (0..4).map(|col| Position::new(0, col)).collect::<Vec<_>>()
    );

    let mut at: BTreeMap<ShipId, Position> =
        corridor.ships.iter().map(|(&id, &(pos, _))| (id, pos)).collect();
    for (ship, from, to) in path.replay_order() {
        assert_eq!(at[&ship], from);
        assert!(at.values().all(|&p| p != to), "transient collision at {to}");
        at.insert(ship, to);
    }
    let finals: BTreeSet<_> = at.values().copied().collect();
    assert_eq!(finals.len(), 3);
}

#[test]
fn test_dropoff_builder_converts_on_target() {
    let setup = uniform_setup(8, 8, 0);
    let mut engine = Engine::new(&setup, EngineConfig::default()).unwrap();
    let mut sandbox = Sandbox::new(&setup);
    sandbox.add_ship(ship(0, 0, 0, 0));
    sandbox.set_directives(vec![Directive {
        ship: 0,
        kind: DirectiveKind::BuildDropoff,
        target: Position::new(2, 2),
    }]);

    let mut constructed = false;
    for _ in 0..6 {
        let plan = sandbox.step(&mut engine).unwrap();
        if plan.moves.iter().any(|m| m.action == MoveAction::Construct) {
            constructed = true;
            break;
        }
    }
    assert!(constructed);
    assert!(sandbox.dropoffs().contains(&Position::new(2, 2)));

    // The next snapshot drops the converted ship without a loss notice.
    sandbox.step(&mut engine).unwrap();
    assert!(engine.fleet().is_empty());
    assert_eq!(engine.fleet().dropoffs().len(), 2);
}

#[test]
fn test_expired_deadline_stays_everyone() {
    let setup = patterned_setup(12, 12, 5);
    let mut engine = Engine::new(&setup, EngineConfig::default()).unwrap();
    let snapshot = TurnSnapshot {
        turn: 1,
        ships: vec![ship(0, 0, 0, 0), ship(1, 3, 3, 900), ship(2, 6, 1, 50)],
        spawned: vec![0, 1, 2],
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    };
    let plan = engine
        .play_turn(&snapshot, &Deadline::after(Duration::ZERO))
        .unwrap();
    assert!(plan.timed_out);
    assert!(plan.moves.iter().all(|m| m.action == MoveAction::Stay));
}

#[test]
fn test_long_game_never_collides() {
    let setup = patterned_setup(24, 24, 17);
    let mut engine = Engine::new(&setup, EngineConfig::default()).unwrap();
    let mut sandbox = Sandbox::new(&setup);
    let grid = Grid::new(24, 24);
    for turn in 0..150 {
        if turn % 3 == 0 {
            sandbox.spawn();
        }
        let plan = sandbox.step(&mut engine).unwrap();
        assert_valid_plan(&grid, &plan);
        assert!(sandbox.pending_losses().is_empty(), "collision on turn {}", plan.turn);
    }
    assert!(sandbox.banked() > 0, "no halite was ever delivered");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_turns_are_collision_free(
        (width, height, halite, fleet) in (4usize..=10, 4usize..=10).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), arb_halite(w * h), arb_fleet(w, h, 12))
        }),
        config in arb_config(),
    ) {
        let setup = setup(width, height, halite);
        let grid = Grid::new(width, height);
        let mut engine = Engine::new(&setup, config).unwrap();
        let mut sandbox = Sandbox::new(&setup);
        for report in &fleet {
            sandbox.add_ship(*report);
        }
        for _ in 0..5 {
            let plan = sandbox.step(&mut engine).unwrap();
            prop_assert_eq!(plan.moves.len(), engine.fleet().len());
            let targets: BTreeSet<_> = plan.moves.iter().map(|m| m.to).collect();
            prop_assert_eq!(targets.len(), plan.moves.len());
            for m in &plan.moves {
                prop_assert!(grid.distance(m.from, m.to) <= 1);
            }
            prop_assert!(sandbox.pending_losses().is_empty());
        }
    }

    #[test]
    fn prop_return_key_is_shortest_biased_path(
        (width, height, halite) in (4usize..=12, 4usize..=12).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), arb_halite(w * h))
        }),
    ) {
        let setup = setup(width, height, halite.clone());
        let mut engine = Engine::new(&setup, EngineConfig::default()).unwrap();
        let snapshot = TurnSnapshot {
            turn: 1,
            dropoffs: vec![Position::new(0, 0)],
            ..TurnSnapshot::default()
        };
        engine.play_turn(&snapshot, &Deadline::unbounded()).unwrap();
        let grid = engine.grid().clone();
        let key = &engine.fields().returns().key;
        let costs = engine.field_snapshot().returns;

        prop_assert_eq!(key.at(Position::new(0, 0)), 0.0);
        for pos in grid.positions() {
            prop_assert!(costs.at(pos) >= 0.0);
            if pos == Position::new(0, 0) {
                continue;
            }
            let step = f64::from(halite[grid.index(pos)]) + 1.0;
            let best = grid
                .neighbors(pos)
                .into_iter()
                .map(|n| key.at(n) + step)
                .fold(f64::INFINITY, f64::min);
            prop_assert_eq!(key.at(pos), best);
            prop_assert!(key.at(pos) >= 1.0);
        }
    }
}
