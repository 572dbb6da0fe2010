//! Per-ship state carried across turns.

use serde::{Deserialize, Serialize};

use crate::grid::Position;
use crate::role::Role;
use crate::snapshot::Directive;

/// Stable ship identity assigned by the environment.
pub type ShipId = u32;

/// An owned ship.
///
/// `origin` is where the ship started this turn and `position` is its
/// committed cell: equal to `origin` until the scheduler finalizes a move,
/// then the move target. The next snapshot must report the ship at
/// `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Identity.
    pub id: ShipId,
    /// Committed cell.
    pub position: Position,
    /// Cell at the start of the current turn.
    pub origin: Position,
    /// Halite carried.
    pub cargo: u32,
    /// Current role.
    pub role: Role,
    /// Role at the start of the turn, the base for every reclassification.
    pub start_role: Role,
    /// Active strategic directive, if any.
    pub directive: Option<Directive>,
    /// Where the ship is heading.
    pub destination: Option<Position>,
    /// Steps to `destination`.
    pub distance: u32,
    /// Next cell the ship would like to occupy.
    pub desired: Option<Position>,
    /// Consecutive turns the ship wanted to move but stayed.
    pub blocked_turns: u32,
    /// Remaining turns of reversed field following.
    pub fugitive_turns: u32,
    /// Whether the ship's move for this turn is final.
    pub finalized: bool,
    /// Times the ship was deferred to a later scheduling pass this turn.
    pub deferrals: u32,
    /// Whether the committed action converts the ship into a dropoff.
    pub constructing: bool,
}

impl Ship {
    /// A newly spawned ship.
    #[must_use]
    pub fn new(id: ShipId, position: Position, cargo: u32) -> Self {
        Self {
            id,
            position,
            origin: position,
            cargo,
            role: Role::Outbound,
            start_role: Role::Outbound,
            directive: None,
            destination: None,
            distance: 0,
            desired: None,
            blocked_turns: 0,
            fugitive_turns: 0,
            finalized: false,
            deferrals: 0,
            constructing: false,
        }
    }

    /// Reset the per-turn scheduling state.
    pub fn begin_turn(&mut self) {
        self.origin = self.position;
        self.start_role = self.role;
        self.destination = None;
        self.distance = 0;
        self.desired = None;
        self.finalized = false;
        self.deferrals = 0;
        self.constructing = false;
    }

    /// Whether the ship is in the reversed field-following sub-state.
    #[must_use]
    pub const fn is_fugitive(&self) -> bool {
        self.fugitive_turns > 0
    }

    /// Whether the ship wants to leave its cell this turn.
    #[must_use]
    pub fn wants_to_move(&self) -> bool {
        self.desired.is_some_and(|d| d != self.origin)
    }

    /// Target of the active directive.
    #[must_use]
    pub fn directive_target(&self) -> Option<Position> {
        self.directive.map(|d| d.target)
    }
}
