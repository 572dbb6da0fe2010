//! Error types for the bot driver.

use thiserror::Error;

use fleet_core::error::EngineError;

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors that end a bot session.
#[derive(Debug, Error)]
pub enum BotError {
    /// The engine rejected a message or broke an invariant.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not valid protocol JSON.
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be written as RON.
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// Messages arrived in an order the protocol does not allow.
    #[error("Protocol violation: {0}")]
    Protocol(String),
}
