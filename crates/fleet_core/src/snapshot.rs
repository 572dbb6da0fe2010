//! Inputs received from the game environment.
//!
//! A [`GameSetup`] arrives once before the first turn; a [`TurnSnapshot`]
//! arrives every turn. Both are plain serde data so the runner can decode
//! them straight off the wire and replays can store them verbatim.

use serde::{Deserialize, Serialize};

use crate::config::GameConstants;
use crate::grid::Position;
use crate::map::{BonusCell, CellUpdate};
use crate::ship::ShipId;

/// One-time game initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Game-wide constants, fixed for the whole game.
    pub constants: GameConstants,
    /// Player id assigned to this bot.
    pub my_player: u32,
    /// The primary base.
    pub shipyard: Position,
    /// Row-major starting halite, `width * height` entries.
    pub initial_halite: Vec<u32>,
}

/// Identity, position and cargo of a single ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipReport {
    /// Ship identity.
    pub id: ShipId,
    /// Current cell.
    pub position: Position,
    /// Halite carried.
    pub cargo: u32,
}

/// What a strategic directive asks of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// Highest-priority special agent.
    Special,
    /// Infiltrator heading into contested territory.
    Infiltrate,
    /// Head to the target and convert into a dropoff there.
    BuildDropoff,
}

/// Externally chosen role and target for one ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Ship the directive applies to.
    pub ship: ShipId,
    /// Forced role.
    pub kind: DirectiveKind,
    /// Destination cell.
    pub target: Position,
}

/// Everything the environment reports at the start of a turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Turn number.
    pub turn: u32,
    /// Cells whose halite changed since the previous snapshot.
    #[serde(default)]
    pub halite_updates: Vec<CellUpdate>,
    /// Every owned ship.
    #[serde(default)]
    pub ships: Vec<ShipReport>,
    /// Every opposing ship.
    #[serde(default)]
    pub enemy_ships: Vec<ShipReport>,
    /// Ships spawned at the shipyard since the previous turn.
    #[serde(default)]
    pub spawned: Vec<ShipId>,
    /// Ships destroyed since the previous turn.
    #[serde(default)]
    pub lost: Vec<ShipId>,
    /// Owned bases, shipyard included. Unknown cells are added as new bases;
    /// known bases missing from the list are kept.
    #[serde(default)]
    pub dropoffs: Vec<Position>,
    /// Owned bases destroyed since the previous turn.
    #[serde(default)]
    pub lost_dropoffs: Vec<Position>,
    /// Every opposing base.
    #[serde(default)]
    pub enemy_dropoffs: Vec<Position>,
    /// Role directives from strategic modules.
    #[serde(default)]
    pub directives: Vec<Directive>,
    /// Territory-contestation multipliers for this turn.
    #[serde(default)]
    pub bonus: Vec<BonusCell>,
    /// Halite in the player's bank.
    #[serde(default)]
    pub bank: u32,
}
