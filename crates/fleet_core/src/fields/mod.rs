//! Cost-field propagation engine.
//!
//! Three chained per-cell fields drive every movement decision:
//!
//! - [`ReturnField`] - cost to bring cargo home from each cell
//! - adjusted-value field - harvestable value net of the return cost
//! - outbound field - cost to reach a good harvest area from each cell
//!
//! Return and outbound fields share one multi-source label-correcting pass
//! ([`Propagator`]). The adjusted field is an elementwise transform.
//!
//! Fields are a cache over the resource map: any extraction marks the whole
//! set stale and the next read rebuilds it.

mod adjusted;
mod harvest_time;
mod outbound;
mod return_field;

pub use adjusted::build_adjusted;
pub use harvest_time::HarvestTimeTable;
pub use outbound::{build_outbound, build_smoothed};
pub use return_field::ReturnField;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, GameConstants};
use crate::grid::{CellSet, Grid, Position};
use crate::map::ResourceMap;
use crate::queue::IndexedPriorityQueue;

/// Sentinel cost for unreachable or forbidden cells.
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Dense per-cell `f64` values in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostField {
    width: usize,
    values: Vec<f64>,
}

impl CostField {
    /// A field with every cell unreachable.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self::filled(grid, UNREACHABLE)
    }

    /// A field with every cell set to `value`.
    #[must_use]
    pub fn filled(grid: &Grid, value: f64) -> Self {
        Self {
            width: grid.width(),
            values: vec![value; grid.cell_count()],
        }
    }

    /// Value at a position.
    #[inline]
    #[must_use]
    pub fn at(&self, pos: Position) -> f64 {
        self.values[pos.row * self.width + pos.col]
    }

    /// Value at a dense index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Overwrite a dense index.
    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    /// Whether a position holds a finite cost.
    #[inline]
    #[must_use]
    pub fn is_reachable(&self, pos: Position) -> bool {
        self.at(pos).is_finite()
    }

    /// Reset every cell to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Raw row-major values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of finite cells.
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }
}

/// Reusable scratch state for multi-source label-correcting propagation.
///
/// A dequeued entry is skipped when the cell is already finalized or when its
/// priority is worse than the field's current value (lazy deletion), so every
/// cell is finalized at most once.
#[derive(Debug, Clone)]
pub struct Propagator {
    queue: IndexedPriorityQueue<usize>,
    finalized: CellSet,
}

impl Propagator {
    /// Scratch sized for `grid`.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            queue: IndexedPriorityQueue::with_capacity(grid.cell_count()),
            finalized: CellSet::new(grid.cell_count()),
        }
    }

    /// Propagate from `sources` over `grid` into `field`.
    ///
    /// * `blocked(index)` - cells that stay unreachable and are never expanded.
    /// * `step(from, to, from_cost)` - cost of reaching `to` through `from`,
    ///   or `None` when the edge is not allowed.
    /// * `improved(from, to)` - called whenever `to` gets a strictly better
    ///   cost through `from`, so callers can carry per-path side data.
    ///
    /// Returns the number of finalized cells.
    pub fn run<S, B, E, I>(
        &mut self,
        grid: &Grid,
        field: &mut CostField,
        sources: S,
        blocked: B,
        mut step: E,
        mut improved: I,
    ) -> usize
    where
        S: IntoIterator<Item = (usize, f64)>,
        B: Fn(usize) -> bool,
        E: FnMut(usize, usize, f64) -> Option<f64>,
        I: FnMut(usize, usize),
    {
        field.fill(UNREACHABLE);
        self.queue.clear();
        self.finalized.clear();

        for (index, seed) in sources {
            if blocked(index) || !seed.is_finite() {
                continue;
            }
            if seed < field.get(index) {
                field.set(index, seed);
                self.queue.enqueue(seed, index);
            }
        }

        let mut finalized_count = 0;
        while let Some((cost, index)) = self.queue.dequeue() {
            if self.finalized.contains(index) || cost > field.get(index) {
                continue;
            }
            self.finalized.insert(index);
            finalized_count += 1;

            let here = grid.position(index);
            for neighbor in grid.neighbors(here) {
                let next = grid.index(neighbor);
                if self.finalized.contains(next) || blocked(next) {
                    continue;
                }
                let Some(candidate) = step(index, next, cost) else {
                    continue;
                };
                if candidate < field.get(next) {
                    field.set(next, candidate);
                    improved(index, next);
                    self.queue.enqueue(candidate, next);
                }
            }
        }
        finalized_count
    }
}

/// Everything a field rebuild reads.
#[derive(Debug, Clone, Copy)]
pub struct FieldInputs<'a> {
    /// Grid geometry.
    pub grid: &'a Grid,
    /// Current resource state.
    pub map: &'a ResourceMap,
    /// Return-field sources.
    pub dropoffs: &'a [Position],
    /// Cells the return field may not route through (enemy structures).
    pub return_blocked: &'a CellSet,
    /// Cells the outbound field treats as unreachable.
    pub forbidden: &'a CellSet,
    /// Game constants.
    pub constants: &'a GameConstants,
    /// Tuning constants.
    pub config: &'a EngineConfig,
    /// Precomputed harvest-time lookup.
    pub harvest_time: &'a HarvestTimeTable,
}

/// The cached return → adjusted → outbound chain with a single dirty flag.
#[derive(Debug, Clone)]
pub struct FieldSet {
    returns: ReturnField,
    adjusted: CostField,
    smoothed: CostField,
    outbound: CostField,
    propagator: Propagator,
    stale: bool,
    rebuilds: u32,
}

impl FieldSet {
    /// An empty, stale field set sized for `grid`.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            returns: ReturnField::new(grid),
            adjusted: CostField::filled(grid, 0.0),
            smoothed: CostField::filled(grid, 0.0),
            outbound: CostField::new(grid),
            propagator: Propagator::new(grid),
            stale: true,
            rebuilds: 0,
        }
    }

    /// Invalidate every field; the next [`FieldSet::refresh`] rebuilds them.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Whether the fields need a rebuild before the next read.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of full rebuilds performed so far.
    #[must_use]
    pub const fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    /// Rebuild the chain if stale. Returns `true` when a rebuild happened.
    pub fn refresh(&mut self, inputs: FieldInputs<'_>) -> bool {
        if !self.stale {
            return false;
        }
        self.rebuild(inputs);
        true
    }

    /// Unconditionally rebuild return, adjusted and outbound fields.
    pub fn rebuild(&mut self, inputs: FieldInputs<'_>) {
        self.returns.rebuild(
            &mut self.propagator,
            inputs.grid,
            inputs.map,
            inputs.dropoffs,
            inputs.return_blocked,
            inputs.config.penalty_multiplier,
        );
        build_adjusted(
            &mut self.adjusted,
            inputs.grid,
            inputs.map,
            &self.returns,
            inputs.dropoffs,
            inputs.constants,
            inputs.config,
        );
        build_smoothed(
            &mut self.smoothed,
            inputs.grid,
            &self.adjusted,
            inputs.config.smoothing_radius,
        );
        let reached = build_outbound(
            &mut self.outbound,
            &mut self.propagator,
            inputs.grid,
            &self.smoothed,
            &self.returns,
            inputs.forbidden,
            inputs.config,
            inputs.harvest_time,
        );
        self.stale = false;
        self.rebuilds += 1;
        tracing::debug!(
            rebuild = self.rebuilds,
            return_reachable = self.returns.cost.reachable_count(),
            outbound_reachable = reached,
            "Rebuilt cost fields"
        );
    }

    /// Return field.
    #[must_use]
    pub fn returns(&self) -> &ReturnField {
        &self.returns
    }

    /// Adjusted-value field (higher is better).
    #[must_use]
    pub fn adjusted(&self) -> &CostField {
        &self.adjusted
    }

    /// Smoothed local value feeding the outbound seeds.
    #[must_use]
    pub fn smoothed(&self) -> &CostField {
        &self.smoothed
    }

    /// Outbound field (lower is better).
    #[must_use]
    pub fn outbound(&self) -> &CostField {
        &self.outbound
    }

    /// Copy of the three fields for external diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            returns: self.returns.cost.clone(),
            adjusted: self.adjusted.clone(),
            outbound: self.outbound.clone(),
        }
    }
}

/// Diagnostic copy of the fields, serializable for external visualisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Detour-penalised return cost.
    pub returns: CostField,
    /// Adjusted harvest value.
    pub adjusted: CostField,
    /// Outbound cost.
    pub outbound: CostField,
}
