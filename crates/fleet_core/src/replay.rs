//! Recording and re-checking games.
//!
//! A replay stores the initialisation message, the configuration and every
//! turn snapshot fed to the engine, together with the hash of each plan it
//! produced. Playing the snapshots through a fresh engine must reproduce the
//! same hashes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::plan::{Deadline, TurnPlan};
use crate::snapshot::{GameSetup, TurnSnapshot};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Initialisation message.
    pub setup: GameSetup,
    /// Engine configuration in effect.
    pub config: EngineConfig,
    /// Snapshots in turn order.
    pub snapshots: Vec<TurnSnapshot>,
    /// [`TurnPlan::plan_hash`] of each recorded turn.
    pub plan_hashes: Vec<u64>,
}

/// First turn where a re-played plan differed from the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    /// Turn number.
    pub turn: u32,
    /// Hash in the recording.
    pub recorded: u64,
    /// Hash produced now.
    pub replayed: u64,
}

/// Outcome of [`Replay::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Turns re-played.
    pub turns: usize,
    /// Turns whose plans differed.
    pub divergences: Vec<Divergence>,
}

impl VerifyReport {
    /// Whether every turn matched.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.divergences.is_empty()
    }
}

impl Replay {
    /// Start an empty recording.
    #[must_use]
    pub fn new(setup: GameSetup, config: EngineConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            setup,
            config,
            snapshots: Vec::new(),
            plan_hashes: Vec::new(),
        }
    }

    /// Record a snapshot and the plan produced for it.
    pub fn record(&mut self, snapshot: TurnSnapshot, plan: &TurnPlan) {
        self.snapshots.push(snapshot);
        self.plan_hashes.push(plan.plan_hash());
    }

    /// Number of recorded turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| EngineError::Replay(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| EngineError::Replay(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or if the
    /// file was written by an incompatible version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| EngineError::Replay(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Decode a replay from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| EngineError::Replay(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(EngineError::Replay(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }
        if replay.plan_hashes.len() != replay.snapshots.len() {
            return Err(EngineError::Replay(format!(
                "Replay has {} snapshots but {} plan hashes",
                replay.snapshots.len(),
                replay.plan_hashes.len()
            )));
        }
        Ok(replay)
    }

    /// Play every snapshot through a fresh engine without a time budget.
    ///
    /// Returns the plans in turn order.
    pub fn play(&self) -> Result<Vec<TurnPlan>> {
        let mut engine = Engine::new(&self.setup, self.config.clone())?;
        self.snapshots
            .iter()
            .map(|snapshot| engine.play_turn(snapshot, &Deadline::unbounded()))
            .collect()
    }

    /// Re-play the recording and compare every plan hash.
    pub fn verify(&self) -> Result<VerifyReport> {
        let plans = self.play()?;
        let divergences: Vec<Divergence> = plans
            .iter()
            .zip(&self.plan_hashes)
            .filter_map(|(plan, &recorded)| {
                let replayed = plan.plan_hash();
                (replayed != recorded).then_some(Divergence {
                    turn: plan.turn,
                    recorded,
                    replayed,
                })
            })
            .collect();
        if let Some(first) = divergences.first() {
            tracing::warn!(
                turn = first.turn,
                count = divergences.len(),
                "Replay diverged from recording"
            );
        }
        Ok(VerifyReport {
            turns: plans.len(),
            divergences,
        })
    }
}
