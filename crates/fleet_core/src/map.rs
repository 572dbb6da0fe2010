//! Shared per-cell resource state.
//!
//! The resource map is the only state the scheduler mutates mid-turn:
//! a stand-and-harvest finalization lowers a cell's halite, which in turn
//! marks every dependent cost field stale.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::grid::{Grid, Position};

/// A changed cell reported by the per-turn map delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Cell that changed.
    pub position: Position,
    /// New halite amount.
    pub halite: u32,
}

/// An externally supplied per-cell value multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusCell {
    /// Cell the bonus applies to.
    pub position: Position,
    /// Multiplier applied to the adjusted value (1.0 = neutral).
    pub multiplier: f64,
}

/// Halite amounts and bonus multipliers for every cell.
#[derive(Debug, Clone)]
pub struct ResourceMap {
    grid: Grid,
    halite: Vec<u32>,
    bonus: Vec<f64>,
    total: u64,
}

impl ResourceMap {
    /// Create a map from row-major halite amounts.
    ///
    /// # Panics
    ///
    /// Panics if `halite.len()` does not match the grid.
    #[must_use]
    pub fn new(grid: Grid, halite: Vec<u32>) -> Self {
        assert_eq!(
            halite.len(),
            grid.cell_count(),
            "halite length must match grid cell count"
        );
        let total = halite.iter().map(|&h| u64::from(h)).sum();
        let bonus = vec![1.0; grid.cell_count()];
        Self {
            grid,
            halite,
            bonus,
            total,
        }
    }

    /// Create a map from row-major halite, validating its length.
    pub fn try_new(grid: Grid, halite: Vec<u32>) -> Result<Self> {
        if halite.len() != grid.cell_count() {
            return Err(EngineError::InvalidState(format!(
                "initial halite has {} cells, grid has {}",
                halite.len(),
                grid.cell_count()
            )));
        }
        Ok(Self::new(grid, halite))
    }

    /// Grid geometry.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Halite at a position.
    #[inline]
    #[must_use]
    pub fn halite(&self, pos: Position) -> u32 {
        self.halite[self.grid.index(pos)]
    }

    /// Halite at a dense index.
    #[inline]
    #[must_use]
    pub fn halite_at_index(&self, index: usize) -> u32 {
        self.halite[index]
    }

    /// Total halite on the map.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Overwrite a cell's halite.
    pub fn set_halite(&mut self, pos: Position, amount: u32) {
        let index = self.grid.index(pos);
        self.total = self.total - u64::from(self.halite[index]) + u64::from(amount);
        self.halite[index] = amount;
    }

    /// Apply the per-turn map delta.
    pub fn apply_updates(&mut self, updates: &[CellUpdate]) -> Result<()> {
        for update in updates {
            self.grid.check(update.position)?;
            self.set_halite(update.position, update.halite);
        }
        Ok(())
    }

    /// Remove up to `amount` halite from a cell, returning what was taken.
    pub fn extract(&mut self, pos: Position, amount: u32) -> u32 {
        let available = self.halite(pos);
        let taken = amount.min(available);
        self.set_halite(pos, available - taken);
        taken
    }

    /// Bonus multiplier at a dense index.
    #[inline]
    #[must_use]
    pub fn bonus_at_index(&self, index: usize) -> f64 {
        self.bonus[index]
    }

    /// Set a single bonus multiplier.
    pub fn set_bonus(&mut self, pos: Position, multiplier: f64) {
        let index = self.grid.index(pos);
        self.bonus[index] = multiplier;
    }

    /// Reset every multiplier to neutral and apply this turn's bonuses.
    pub fn replace_bonuses(&mut self, cells: &[BonusCell]) -> Result<()> {
        self.bonus.fill(1.0);
        for cell in cells {
            self.grid.check(cell.position)?;
            if !cell.multiplier.is_finite() || cell.multiplier < 0.0 {
                return Err(EngineError::InvalidState(format!(
                    "bonus multiplier {} at {} is not a finite non-negative value",
                    cell.multiplier, cell.position
                )));
            }
            self.set_bonus(cell.position, cell.multiplier);
        }
        Ok(())
    }
}
