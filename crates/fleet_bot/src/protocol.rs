//! JSON-lines protocol between the game environment and the bot.
//!
//! **Input (stdin):** one [`Input`] message per line
//! **Output (stdout):** one [`Output`] message per line
//!
//! # Protocol Flow
//!
//! 1. Bot starts, outputs `{"type":"ready","version":"1.0"}`
//! 2. Environment sends one `init` message with the game setup
//! 3. Each `turn` message is answered with one `commands` message (and a
//!    `fields` message when field output is enabled)
//! 4. `quit` or end of input ends the session
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0"}
//! -> {"type":"init","constants":{"width":32,"height":32,...},"my_player":0,"shipyard":{"row":8,"col":8},"initial_halite":[...]}
//! -> {"type":"turn","turn":1,"ships":[{"id":0,"position":{"row":8,"col":8},"cargo":0}],"spawned":[0],"dropoffs":[{"row":8,"col":8}]}
//! <- {"type":"commands","turn":1,"commands":[{"ship":0,"from":...,"to":...,"action":{"move":"e"},"role":"outbound"}],"timed_out":false,...}
//! -> {"type":"quit"}
//! ```

use serde::{Deserialize, Serialize};

use fleet_core::fields::FieldSnapshot;
use fleet_core::plan::{ShipMove, TurnPlan, TurnStats};
use fleet_core::snapshot::{GameSetup, TurnSnapshot};

/// Protocol version reported in the `ready` message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Messages (Environment -> Bot)
// ============================================================================

/// Messages the environment sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Input {
    /// Game setup, exactly once before the first turn.
    Init(GameSetup),
    /// State at the start of a turn.
    Turn(TurnSnapshot),
    /// End the session.
    Quit,
}

// ============================================================================
// Output Messages (Bot -> Environment)
// ============================================================================

/// Messages the bot sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Bot is ready for the `init` message.
    Ready { version: String },

    /// One command per owned ship.
    Commands {
        turn: u32,
        commands: Vec<ShipMove>,
        timed_out: bool,
        stats: TurnStats,
    },

    /// Cost fields after planning, for external visualisation.
    Fields {
        turn: u32,
        #[serde(flatten)]
        fields: FieldSnapshot,
    },

    /// Fatal error; the session ends after this line.
    Error { message: String },
}

impl Output {
    /// Create a ready message.
    #[must_use]
    pub fn ready() -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Commands message for a finished plan.
    #[must_use]
    pub fn commands(plan: TurnPlan) -> Self {
        Self::Commands {
            turn: plan.turn,
            commands: plan.moves,
            timed_out: plan.timed_out,
            stats: plan.stats,
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Input {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Message name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Turn(_) => "turn",
            Self::Quit => "quit",
        }
    }
}
