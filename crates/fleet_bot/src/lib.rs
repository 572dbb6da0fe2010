//! JSON-lines bot driver around `fleet_core`.
//!
//! The bot reads game state from stdin and answers each turn with one command
//! per ship on stdout. This enables:
//!
//! - **Live play**: a game environment pipes turns in and commands out
//! - **Replay verification**: recorded sessions re-played through a fresh
//!   engine must reproduce every plan
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: `init`, `turn` and `quit` messages
//! - **stdout**: `ready`, `commands`, `fields` and `error` messages
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the message format.
//!
//! # Example
//!
//! ```bash
//! # Play with a custom configuration and a 500ms turn budget
//! cargo run -p fleet_bot -- run --config tuning.ron --budget-ms 500
//!
//! # Record a session, then check it reproduces
//! cargo run -p fleet_bot -- run --record game.replay < turns.jsonl
//! cargo run -p fleet_bot -- replay game.replay --verify
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod protocol;
pub mod runner;

pub use error::{BotError, Result};
pub use protocol::{Input, Output};
pub use runner::{BotRunner, RunnerOptions, SessionSummary};
