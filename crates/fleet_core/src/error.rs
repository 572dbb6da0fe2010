//! Error types for the decision engine.
//!
//! Only protocol and invariant violations are errors. Algorithmic dead ends
//! (no route, failed push, unreachable cells) are ordinary outcomes that
//! resolve to "stay in place" and never surface here.

use thiserror::Error;

use crate::grid::Position;
use crate::ship::ShipId;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the decision engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A message referenced a ship the fleet does not own.
    #[error("Unknown ship: {0}")]
    UnknownShip(ShipId),

    /// A known ship disappeared without a loss notification.
    #[error("Ship {0} vanished without a loss notification")]
    ShipVanished(ShipId),

    /// A ship appeared without a spawn confirmation.
    #[error("Ship {0} appeared without a spawn confirmation")]
    UnexpectedShip(ShipId),

    /// A spawn was confirmed but the ship is absent from the snapshot.
    #[error("Spawned ship {0} missing from snapshot")]
    MissingSpawn(ShipId),

    /// Reported position differs from the committed move target.
    #[error("Ship {ship} reported at {reported}, expected {expected}")]
    PositionMismatch {
        /// Ship whose position mismatched.
        ship: ShipId,
        /// Position committed on the previous turn.
        expected: Position,
        /// Position reported by the environment.
        reported: Position,
    },

    /// A position lies outside the grid.
    #[error("Position {position} outside {width}x{height} grid")]
    OutOfBounds {
        /// Offending position.
        position: Position,
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse a configuration file.
    #[error("Failed to load configuration '{path}': {message}")]
    ConfigLoad {
        /// Path to the file that failed to load.
        path: String,
        /// Error message.
        message: String,
    },

    /// Replay file could not be encoded, decoded or accessed.
    #[error("Replay error: {0}")]
    Replay(String),

    /// Invalid engine state.
    #[error("Invalid engine state: {0}")]
    InvalidState(String),
}
