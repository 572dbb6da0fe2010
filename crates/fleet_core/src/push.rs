//! Conflict resolution by pushing blockers out of the way.
//!
//! When a ship's chosen cell holds another unfinalized ship, a depth-first
//! search looks for a chain of displacements ending on a free cell. The
//! search keeps its own stack of frames instead of recursing, and is bounded
//! both in depth and in total candidates examined.

use std::cmp::Ordering;

use crate::grid::{Grid, Position};
use crate::role::Role;
use crate::ship::ShipId;

/// What the push search needs to know about the board.
pub trait PushView {
    /// Grid geometry.
    fn grid(&self) -> &Grid;

    /// Whether a ship from elsewhere may enter the cell.
    fn can_enter(&self, pos: Position) -> bool;

    /// Unfinalized ship standing on the cell.
    fn occupant(&self, pos: Position) -> Option<ShipId>;

    /// Current role of a ship.
    fn role(&self, ship: ShipId) -> Role;

    /// Role the ship would hold next turn if it ended this turn on `at`.
    fn predicted_role(&self, ship: ShipId, at: Position) -> Role;

    /// Cell the ship wants to step into, if any.
    fn desired(&self, ship: ShipId) -> Option<Position>;

    /// Ships that want to step into the cell.
    fn desirers(&self, pos: Position) -> &[ShipId];

    /// How much the ship likes standing on `pos` (higher is better).
    fn preference(&self, ship: ShipId, pos: Position) -> f64;
}

/// Bounds on a single push search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushLimits {
    /// Maximum number of displaced ships.
    pub max_depth: usize,
    /// Maximum number of candidate cells examined.
    pub max_steps: usize,
}

/// A chain of displacements.
///
/// `ships[i]` moves from `cells[i]` to `cells[i + 1]`; `ships[0]` is the
/// pusher and the last cell was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPath {
    /// Visited cells, pusher origin first.
    pub cells: Vec<Position>,
    /// Ship leaving each cell but the last.
    pub ships: Vec<ShipId>,
}

impl PushPath {
    /// Number of ships displaced, the pusher excluded.
    #[must_use]
    pub fn displaced(&self) -> usize {
        self.ships.len() - 1
    }

    /// Moves in replay order: the most distant ship first, so every target
    /// has already been vacated when its mover arrives.
    pub fn replay_order(&self) -> impl Iterator<Item = (ShipId, Position, Position)> + '_ {
        (0..self.ships.len())
            .rev()
            .map(|i| (self.ships[i], self.cells[i], self.cells[i + 1]))
    }
}

/// Result of a push search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A chain ending on a free cell.
    Success(PushPath),
    /// No chain within the limits.
    Failed {
        /// Candidate cells examined.
        steps: usize,
    },
}

#[derive(Debug)]
struct Frame {
    candidates: Vec<Position>,
    next: usize,
}

#[derive(Debug, Clone, Copy)]
struct CandidateKey {
    desire_weight: u8,
    claimed: bool,
    preference: f64,
}

impl CandidateKey {
    fn cmp_best_first(&self, other: &Self) -> Ordering {
        other
            .desire_weight
            .cmp(&self.desire_weight)
            .then(self.claimed.cmp(&other.claimed))
            .then(other.preference.total_cmp(&self.preference))
    }
}

/// Search for a chain that lets `pusher` move from `from` into `target`.
///
/// `target` must hold an unfinalized blocker that `pusher` does not rank
/// strictly below. Candidate cells for each displaced ship are ordered by
/// whether the ship wants to go there anyway, whether a higher-priority ship
/// has claimed them, and the ship's own preference.
pub fn find_push_path<V: PushView>(
    view: &V,
    pusher: ShipId,
    from: Position,
    target: Position,
    limits: PushLimits,
) -> PushOutcome {
    let pusher_role = view.role(pusher);
    let Some(blocker) = view.occupant(target) else {
        return PushOutcome::Success(PushPath {
            cells: vec![from, target],
            ships: vec![pusher],
        });
    };
    if view.role(blocker).outranks(pusher_role) || limits.max_depth == 0 {
        return PushOutcome::Failed { steps: 0 };
    }

    let mut cells = vec![from, target];
    let mut ships = vec![pusher, blocker];
    let mut frames = vec![Frame {
        candidates: candidates(view, blocker, target, &cells, pusher, pusher_role),
        next: 0,
    }];
    let mut steps = 0;

    while let Some(frame) = frames.last_mut() {
        let Some(&candidate) = frame.candidates.get(frame.next) else {
            frames.pop();
            cells.pop();
            ships.pop();
            continue;
        };
        frame.next += 1;
        steps += 1;
        if steps > limits.max_steps {
            break;
        }
        if cells.contains(&candidate) {
            continue;
        }
        match view.occupant(candidate) {
            None => {
                cells.push(candidate);
                return PushOutcome::Success(PushPath { cells, ships });
            }
            Some(occupant) => {
                if frames.len() >= limits.max_depth {
                    continue;
                }
                cells.push(candidate);
                ships.push(occupant);
                let next = candidates(view, occupant, candidate, &cells, pusher, pusher_role);
                frames.push(Frame {
                    candidates: next,
                    next: 0,
                });
            }
        }
    }

    PushOutcome::Failed { steps }
}

/// Cells a displaced ship could move to, best first.
fn candidates<V: PushView>(
    view: &V,
    ship: ShipId,
    at: Position,
    path: &[Position],
    pusher: ShipId,
    pusher_role: Role,
) -> Vec<Position> {
    let current_role = view.role(ship);
    let desired = view.desired(ship);
    let mut keyed: Vec<(CandidateKey, Position)> = view
        .grid()
        .neighbors(at)
        .into_iter()
        .filter(|&cell| view.can_enter(cell) && !path.contains(&cell))
        .filter(|&cell| match view.occupant(cell) {
            Some(occupant) => {
                let predicted = view.predicted_role(occupant, view.desired(occupant).unwrap_or(cell));
                pusher_role.outranks(predicted)
            }
            None => true,
        })
        .map(|cell| {
            let desire_weight = if desired == Some(cell) {
                if view.predicted_role(ship, cell) == current_role {
                    2
                } else {
                    1
                }
            } else {
                0
            };
            let claimed = view
                .desirers(cell)
                .iter()
                .any(|&other| other != ship && other != pusher && view.role(other).outranks(pusher_role));
            let key = CandidateKey {
                desire_weight,
                claimed,
                preference: view.preference(ship, cell),
            };
            (key, cell)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp_best_first(&b.0));
    keyed.into_iter().map(|(_, cell)| cell).collect()
}
