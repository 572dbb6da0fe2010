use crate::config::EngineConfig;
use crate::fields::return_field::NO_DISTANCE;
use crate::fields::{CostField, HarvestTimeTable, Propagator, ReturnField};
use crate::grid::{CellSet, Grid};

/// Blend each cell's adjusted value with the mean of its neighborhood disc.
pub fn build_smoothed(field: &mut CostField, grid: &Grid, adjusted: &CostField, radius: usize) {
    for index in 0..grid.cell_count() {
        let center = grid.position(index);
        let cells = grid.disc(center, radius);
        let count = cells.len() as f64;
        let sum: f64 = cells.map(|pos| adjusted.at(pos)).sum();
        field.set(index, 0.5 * (adjusted.get(index) + sum / count));
    }
}

/// Cost of heading out from each cell toward a profitable harvest area.
///
/// Every non-forbidden cell with a route home is a source seeded with
/// `harvest_time(smoothed) + return_steps`; each step adds
/// `config.step_penalty`. Within `dropoff_guard_radius` of a home, a cell may
/// only be reached from a neighbor that is at least as far from home, so a
/// ship following the field never heads back past a base.
///
/// Returns the number of reachable cells.
pub fn build_outbound(
    field: &mut CostField,
    propagator: &mut Propagator,
    grid: &Grid,
    smoothed: &CostField,
    returns: &ReturnField,
    forbidden: &CellSet,
    config: &EngineConfig,
    harvest_time: &HarvestTimeTable,
) -> usize {
    let guard = config.dropoff_guard_radius as u32;
    let step_penalty = config.step_penalty;
    let direct = &returns.direct;

    let sources = (0..grid.cell_count()).filter_map(|index| {
        let steps = returns.path_steps[index];
        (steps != NO_DISTANCE)
            .then(|| (index, harvest_time.turns(smoothed.get(index)) + f64::from(steps)))
    });

    propagator.run(
        grid,
        field,
        sources,
        |index| forbidden.contains(index),
        |from, to, cost| {
            let (near_from, near_to) = (direct[from], direct[to]);
            if (near_from <= guard || near_to <= guard) && near_to > near_from {
                return None;
            }
            Some(cost + step_penalty)
        },
        |_, _| {},
    )
}
