//! Per-turn cell bookkeeping for the scheduler.
//!
//! Three views over the grid, all indexed by dense cell index:
//!
//! - [`Occupancy`] - which unfinalized ship still stands on each cell
//! - [`ForbiddenCells`] - cells already committed to a ship plus cells
//!   heuristically excluded this turn (enemy ships and their surroundings)
//! - [`DesireMap`] - which ships would like to step into each cell next

use std::collections::BTreeMap;

use crate::grid::{CellSet, Grid};
use crate::ship::ShipId;

/// Unfinalized ship standing on each cell.
#[derive(Debug, Clone)]
pub struct Occupancy {
    cells: Vec<Option<ShipId>>,
}

impl Occupancy {
    /// An empty grid.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells: vec![None; grid.cell_count()],
        }
    }

    /// Unfinalized occupant of a cell.
    #[inline]
    #[must_use]
    pub fn occupant(&self, index: usize) -> Option<ShipId> {
        self.cells[index]
    }

    /// Place a ship on a cell. Returns the ship previously recorded there.
    pub fn place(&mut self, index: usize, ship: ShipId) -> Option<ShipId> {
        self.cells[index].replace(ship)
    }

    /// Remove `ship` from a cell if it is the recorded occupant.
    pub fn vacate(&mut self, index: usize, ship: ShipId) {
        if self.cells[index] == Some(ship) {
            self.cells[index] = None;
        }
    }

    /// Clear every cell.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}

/// Cells no ship may enter this turn.
///
/// A committed cell is closed to everyone. An excluded cell is closed to
/// ships entering it but a ship already standing there may stay.
#[derive(Debug, Clone)]
pub struct ForbiddenCells {
    committed: CellSet,
    excluded: CellSet,
    union: CellSet,
}

impl ForbiddenCells {
    /// Nothing forbidden.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        let cells = grid.cell_count();
        Self {
            committed: CellSet::new(cells),
            excluded: CellSet::new(cells),
            union: CellSet::new(cells),
        }
    }

    /// Whether a ship from elsewhere may move into the cell.
    #[inline]
    #[must_use]
    pub fn can_enter(&self, index: usize) -> bool {
        !self.union.contains(index)
    }

    /// Whether the ship standing on the cell may stay there.
    #[inline]
    #[must_use]
    pub fn can_stay(&self, index: usize) -> bool {
        !self.committed.contains(index)
    }

    /// Whether the cell has been committed to a finalized ship.
    #[inline]
    #[must_use]
    pub fn is_committed(&self, index: usize) -> bool {
        self.committed.contains(index)
    }

    /// Reserve a cell for a finalized ship. Returns `false` if it already was.
    pub fn commit(&mut self, index: usize) -> bool {
        self.union.insert(index);
        self.committed.insert(index)
    }

    /// Close a cell to incoming ships.
    pub fn exclude(&mut self, index: usize) {
        self.excluded.insert(index);
        self.union.insert(index);
    }

    /// Committed and excluded cells together.
    #[must_use]
    pub const fn all(&self) -> &CellSet {
        &self.union
    }

    /// Number of committed cells.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.committed.count()
    }

    /// Forget every reservation and exclusion.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.excluded.clear();
        self.union.clear();
    }
}

/// Ships wishing to enter each cell.
#[derive(Debug, Clone)]
pub struct DesireMap {
    cells: Vec<Vec<ShipId>>,
    by_ship: BTreeMap<ShipId, usize>,
}

impl DesireMap {
    /// No desires.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells: vec![Vec::new(); grid.cell_count()],
            by_ship: BTreeMap::new(),
        }
    }

    /// Record that `ship` wants `index`, replacing any earlier desire.
    pub fn set(&mut self, ship: ShipId, index: usize) {
        self.remove(ship);
        self.cells[index].push(ship);
        self.by_ship.insert(ship, index);
    }

    /// Drop the desire of `ship`, if any.
    pub fn remove(&mut self, ship: ShipId) {
        if let Some(index) = self.by_ship.remove(&ship) {
            self.cells[index].retain(|&s| s != ship);
        }
    }

    /// Ships that want a cell, in the order they expressed it.
    #[must_use]
    pub fn desirers(&self, index: usize) -> &[ShipId] {
        &self.cells[index]
    }

    /// Cell a ship wants, if any.
    #[must_use]
    pub fn desire_of(&self, ship: ShipId) -> Option<usize> {
        self.by_ship.get(&ship).copied()
    }

    /// Forget every desire.
    pub fn clear(&mut self) {
        for index in self.by_ship.values() {
            self.cells[*index].clear();
        }
        self.by_ship.clear();
    }
}
