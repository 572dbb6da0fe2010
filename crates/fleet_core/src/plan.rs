//! Per-turn output: one finalized move for every owned ship.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Position};
use crate::role::Role;
use crate::ship::ShipId;

/// Command issued to a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAction {
    /// Stay on the cell, harvesting whatever is there.
    Stay,
    /// Move one cell.
    Move(Direction),
    /// Convert into a dropoff on the current cell.
    Construct,
}

/// Finalized decision for one ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipMove {
    /// Ship identity.
    pub ship: ShipId,
    /// Cell at the start of the turn.
    pub from: Position,
    /// Cell at the end of the turn.
    pub to: Position,
    /// Command implementing the move.
    pub action: MoveAction,
    /// Role the ship acted under this turn.
    pub role: Role,
}

/// Counters describing how a turn was planned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStats {
    /// Ships planned.
    pub ships: usize,
    /// Ships that left their cell.
    pub moved: usize,
    /// Ships finalized in place because they could not pay the move cost.
    pub stuck: usize,
    /// Successful push chains.
    pub pushes: usize,
    /// Failed push searches.
    pub push_failures: usize,
    /// Forced swaps.
    pub swaps: usize,
    /// Deferrals to a later pass.
    pub deferrals: usize,
    /// Ships finalized in place by the iteration cap.
    pub forced: usize,
    /// Cost-field rebuilds.
    pub field_rebuilds: u32,
    /// Halite extracted by stationary ships.
    pub extracted: u64,
    /// Wall-clock planning time in microseconds.
    pub elapsed_us: u64,
}

/// Everything decided for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPlan {
    /// Turn number.
    pub turn: u32,
    /// One entry per owned ship, in identity order.
    pub moves: Vec<ShipMove>,
    /// Whether the deadline cut planning short.
    pub timed_out: bool,
    /// Planning counters.
    pub stats: TurnStats,
}

impl TurnPlan {
    /// Stable hash over the decisions, independent of timing.
    #[must_use]
    pub fn plan_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        for m in &self.moves {
            m.ship.hash(&mut hasher);
            m.to.hash(&mut hasher);
            m.action.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Move planned for a ship.
    #[must_use]
    pub fn move_of(&self, ship: ShipId) -> Option<&ShipMove> {
        self.moves.iter().find(|m| m.ship == ship)
    }
}

/// Wall-clock budget for a turn.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Expires `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget: Some(budget),
        }
    }

    /// Never expires.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            start: Instant::now(),
            budget: None,
        }
    }

    /// Whether the budget is used up.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.budget.is_some_and(|budget| self.start.elapsed() >= budget)
    }

    /// Time since the deadline was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(to: Position) -> TurnPlan {
        TurnPlan {
            turn: 3,
            moves: vec![ShipMove {
                ship: 1,
                from: Position::new(0, 0),
                to,
                action: MoveAction::Move(Direction::East),
                role: Role::Outbound,
            }],
            timed_out: false,
            stats: TurnStats::default(),
        }
    }

    #[test]
    fn test_plan_hash_ignores_stats() {
        let a = plan(Position::new(0, 1));
        let mut b = a.clone();
        b.stats.elapsed_us = 12_345;
        b.timed_out = true;
        assert_eq!(a.plan_hash(), b.plan_hash());
        assert_ne!(a.plan_hash(), plan(Position::new(1, 0)).plan_hash());
    }

    #[test]
    fn test_deadline_zero_budget_is_expired() {
        assert!(Deadline::after(Duration::ZERO).expired());
        assert!(!Deadline::unbounded().expired());
        assert!(!Deadline::after(Duration::from_secs(3600)).expired());
    }
}
