//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical plans
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! A replayed game must reproduce every recorded plan. Sources of
//! non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Ships are always visited in identity order.
//!
//! - **Priority ties**: equal-cost cells must finalize in a fixed order.
//!   The queue breaks ties by insertion order.
//!
//! - **System randomness**: fugitive coin flips come from a `ChaCha8` stream
//!   seeded by the configuration.
//!
//! - **Wall-clock deadlines**: a turn cut short depends on timing, so the
//!   harness always plans with an unbounded deadline.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use fleet_core::config::EngineConfig;
use fleet_core::engine::Engine;
use fleet_core::replay::Replay;
use fleet_core::snapshot::GameSetup;

use crate::fixtures::Sandbox;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns played.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `turns` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// An engine paired with the sandbox it plays in.
#[derive(Debug)]
pub struct Session {
    /// The engine under test.
    pub engine: Engine,
    /// Its environment.
    pub sandbox: Sandbox,
    /// Spawn cadence, in turns.
    pub spawn_every: u32,
    /// Rolling hash over every plan so far.
    pub history: u64,
    turn: u32,
}

impl Session {
    /// Fresh session.
    ///
    /// # Panics
    ///
    /// Panics if the engine rejects the setup or config.
    #[must_use]
    pub fn new(setup: &GameSetup, config: EngineConfig, spawn_every: u32) -> Self {
        Self {
            engine: Engine::new(setup, config).expect("engine setup"),
            sandbox: Sandbox::new(setup),
            spawn_every,
            history: 0,
            turn: 0,
        }
    }

    /// Play one turn and fold its plan hash into the history.
    ///
    /// # Panics
    ///
    /// Panics on engine errors.
    pub fn advance(&mut self) -> u64 {
        if self.spawn_every > 0 && self.turn % self.spawn_every == 0 {
            self.sandbox.spawn();
        }
        self.turn += 1;
        let plan = self.sandbox.step(&mut self.engine).expect("turn planned");
        let hash = plan.plan_hash();
        self.history = compute_hash(&(self.history, hash));
        hash
    }
}

/// Play the same game twice and verify the plan histories match.
pub fn verify_engine_determinism<F>(setup_fn: F, turns: u32) -> DeterminismResult
where
    F: Fn() -> Session,
{
    verify_determinism(
        2,
        turns,
        &setup_fn,
        |session| {
            session.advance();
        },
        |session| session.history,
    )
}

/// Play N games on scoped threads and collect their plan histories.
///
/// Catches non-determinism that only shows up under different memory
/// layouts or thread placement.
pub fn run_parallel_sessions<F>(setup_fn: F, sessions: usize, turns: u32) -> DeterminismResult
where
    F: Fn() -> Session + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..sessions)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    for _ in 0..turns {
                        session.advance();
                    }
                    session.history
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("session thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        turns,
    }
}

/// Play two identical games turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the plans always match, `Some(turn)` for the first turn whose
/// plans differ.
pub fn find_first_divergence<F>(setup_fn: F, turns: u32) -> Option<u32>
where
    F: Fn() -> Session,
{
    let mut a = setup_fn();
    let mut b = setup_fn();
    (1..=turns).find(|_| a.advance() != b.advance())
}

/// Record a sandbox game into a replay.
///
/// # Panics
///
/// Panics on engine errors.
#[must_use]
pub fn record_replay(setup: &GameSetup, config: EngineConfig, turns: u32, spawn_every: u32) -> Replay {
    let mut engine = Engine::new(setup, config.clone()).expect("engine setup");
    let mut sandbox = Sandbox::new(setup);
    let mut replay = Replay::new(setup.clone(), config);
    for turn in 0..turns {
        if spawn_every > 0 && turn % spawn_every == 0 {
            sandbox.spawn();
        }
        let snapshot = sandbox.snapshot();
        let plan = engine
            .play_turn(&snapshot, &fleet_core::plan::Deadline::unbounded())
            .expect("turn planned");
        sandbox.apply(&plan);
        replay.record(snapshot, &plan);
    }
    replay
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine inputs.
///
/// These strategies generate random but reproducible boards and fleets for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;

    use fleet_core::config::EngineConfig;
    use fleet_core::grid::Position;
    use fleet_core::snapshot::ShipReport;

    /// Board dimensions, 4 to `max` on each side.
    pub fn arb_dimensions(max: usize) -> impl Strategy<Value = (usize, usize)> {
        (4..=max, 4..=max)
    }

    /// Per-cell halite with a mix of empty and rich cells.
    pub fn arb_halite(cells: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(
            prop_oneof![
                3 => 0u32..60,
                1 => 200u32..1000,
            ],
            cells,
        )
    }

    /// Cargo values (0 to capacity).
    pub fn arb_cargo() -> impl Strategy<Value = u32> {
        0u32..=1000
    }

    /// Up to `max` ships on distinct cells of a `width` x `height` board.
    pub fn arb_fleet(
        width: usize,
        height: usize,
        max: usize,
    ) -> impl Strategy<Value = Vec<ShipReport>> {
        let cells = width * height;
        proptest::sample::subsequence((0..cells).collect::<Vec<_>>(), 0..=max.min(cells))
            .prop_flat_map(|indices| {
                let count = indices.len();
                (Just(indices), proptest::collection::vec(arb_cargo(), count))
            })
            .prop_map(move |(indices, cargo)| {
                indices
                    .into_iter()
                    .zip(cargo)
                    .enumerate()
                    .map(|(id, (index, cargo))| ShipReport {
                        id: id as u32,
                        position: Position::new(index / width, index % width),
                        cargo,
                    })
                    .collect()
            })
    }

    /// Tuning constants varied where they change scheduling behaviour.
    pub fn arb_config() -> impl Strategy<Value = EngineConfig> {
        (any::<u64>(), any::<bool>(), 0.0f64..=1.0, 0u32..3, any::<bool>()).prop_map(
            |(seed, forced_swap, fugitive_probability, max_deferrals, avoid_enemy_adjacent)| {
                EngineConfig {
                    seed,
                    forced_swap,
                    fugitive_probability,
                    max_deferrals,
                    avoid_enemy_adjacent,
                    ..EngineConfig::default()
                }
            },
        )
    }
}
