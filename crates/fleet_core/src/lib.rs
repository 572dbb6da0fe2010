//! # Fleet Core
//!
//! Deterministic per-turn decision engine for a fleet of harvesting ships on
//! a wrap-around grid.
//!
//! This crate contains **only** decision logic:
//! - No IO beyond loading config and replay files
//! - No system randomness (a seeded `ChaCha8` stream drives every coin flip)
//! - No wire protocol
//!
//! Each turn the caller hands the [`engine::Engine`] a
//! [`snapshot::TurnSnapshot`] and receives a [`plan::TurnPlan`] with exactly
//! one move per owned ship, no two ships sharing a destination.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Toroidal geometry and cell sets
//! - [`queue`] - Priority queue used by field propagation
//! - [`fields`] - Return, adjusted and outbound cost fields
//! - [`role`] - Ship role state machine
//! - [`navigate`] - Field descent and move preferences
//! - [`push`] - Displacement chains through occupied cells
//! - [`scheduler`] - Per-turn move assignment
//! - [`engine`] - Persistent game state and entry point
//! - [`replay`] - Recording and re-checking games

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod fleet;
pub mod grid;
pub mod map;
pub mod navigate;
pub mod occupancy;
pub mod plan;
pub mod push;
pub mod queue;
pub mod replay;
pub mod role;
pub mod scheduler;
pub mod ship;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{EngineConfig, GameConstants};
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, Result};
    pub use crate::fields::{CostField, FieldSet, FieldSnapshot, UNREACHABLE};
    pub use crate::fleet::{Dropoff, Fleet};
    pub use crate::grid::{CellSet, Direction, Grid, Position};
    pub use crate::map::{BonusCell, CellUpdate, ResourceMap};
    pub use crate::plan::{Deadline, MoveAction, ShipMove, TurnPlan, TurnStats};
    pub use crate::queue::IndexedPriorityQueue;
    pub use crate::replay::{Replay, VerifyReport, REPLAY_VERSION};
    pub use crate::role::Role;
    pub use crate::ship::{Ship, ShipId};
    pub use crate::snapshot::{Directive, DirectiveKind, GameSetup, ShipReport, TurnSnapshot};
}
