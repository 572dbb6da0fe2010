use crate::config::{EngineConfig, GameConstants};
use crate::fields::{CostField, ReturnField};
use crate::grid::{Grid, Position};
use crate::map::ResourceMap;

/// Harvestable value per cell after netting the fuel needed to bring it home.
///
/// `min(cap, max(0, raw - move_cost_fraction * return_halite_sum * loss) * bonus)`
///
/// Home cells and cells with no route home are worth nothing.
pub fn build_adjusted(
    field: &mut CostField,
    grid: &Grid,
    map: &ResourceMap,
    returns: &ReturnField,
    homes: &[Position],
    constants: &GameConstants,
    config: &EngineConfig,
) {
    let move_fraction = constants.move_cost_fraction();
    for index in 0..grid.cell_count() {
        let path_halite = returns.halite_sum[index];
        let value = if path_halite.is_finite() {
            let raw = f64::from(map.halite_at_index(index));
            let net = (raw - move_fraction * path_halite * config.loss_multiplier).max(0.0);
            (net * map.bonus_at_index(index)).min(config.max_cell_value)
        } else {
            0.0
        };
        field.set(index, value);
    }
    for &home in homes {
        field.set(grid.index(home), 0.0);
    }
}
