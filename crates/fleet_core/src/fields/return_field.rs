use std::collections::VecDeque;

use crate::fields::{CostField, Propagator, UNREACHABLE};
use crate::grid::{CellSet, Grid, Position};
use crate::map::ResourceMap;

/// Sentinel for cells the straight-line BFS never reached.
pub const NO_DISTANCE: u32 = u32::MAX;

/// Cost of bringing cargo home from every cell.
///
/// Propagation orders cells by a biased key, the running sum of
/// `halite + 1` along the path, so the key strictly increases away from every
/// home. The reported [`ReturnField::cost`] uses the unbiased halite sum,
/// scaled by a penalty for detours longer than the straight-line distance:
///
/// `halite_sum * ((path_steps / direct_distance - 1) * penalty + 1)`
#[derive(Debug, Clone)]
pub struct ReturnField {
    /// Detour-penalised return cost; zero on homes.
    pub cost: CostField,
    /// Biased propagation key, strictly increasing away from homes.
    pub key: CostField,
    /// Halite summed along the chosen path, the origin cell included and the
    /// home excluded.
    pub halite_sum: Vec<f64>,
    /// Steps along the chosen path.
    pub path_steps: Vec<u32>,
    /// Straight-line (multi-source BFS) distance to the nearest home.
    pub direct: Vec<u32>,
    direct_sources: Vec<Position>,
}

impl ReturnField {
    /// An empty field with every cell unreachable.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        let cells = grid.cell_count();
        Self {
            cost: CostField::new(grid),
            key: CostField::new(grid),
            halite_sum: vec![UNREACHABLE; cells],
            path_steps: vec![NO_DISTANCE; cells],
            direct: vec![NO_DISTANCE; cells],
            direct_sources: Vec::new(),
        }
    }

    /// Detour-penalised cost at a position.
    #[must_use]
    pub fn cost_at(&self, grid: &Grid, pos: Position) -> f64 {
        self.cost.get(grid.index(pos))
    }

    /// Path steps home from a position, `None` when unreachable.
    #[must_use]
    pub fn steps_at(&self, grid: &Grid, pos: Position) -> Option<u32> {
        let steps = self.path_steps[grid.index(pos)];
        (steps != NO_DISTANCE).then_some(steps)
    }

    /// Straight-line distance to the nearest home, `None` without homes.
    #[must_use]
    pub fn direct_at(&self, grid: &Grid, pos: Position) -> Option<u32> {
        let distance = self.direct[grid.index(pos)];
        (distance != NO_DISTANCE).then_some(distance)
    }

    pub(crate) fn rebuild(
        &mut self,
        propagator: &mut Propagator,
        grid: &Grid,
        map: &ResourceMap,
        homes: &[Position],
        blocked: &CellSet,
        penalty_multiplier: f64,
    ) {
        if self.direct_sources != homes {
            self.rebuild_direct(grid, homes);
        }

        self.halite_sum.fill(UNREACHABLE);
        self.path_steps.fill(NO_DISTANCE);
        for &home in homes {
            let index = grid.index(home);
            self.halite_sum[index] = 0.0;
            self.path_steps[index] = 0;
        }

        let halite_sum = &mut self.halite_sum;
        let path_steps = &mut self.path_steps;
        propagator.run(
            grid,
            &mut self.key,
            homes.iter().map(|&home| (grid.index(home), 0.0)),
            |index| blocked.contains(index),
            |_, to, key| Some(key + f64::from(map.halite_at_index(to)) + 1.0),
            |from, to| {
                halite_sum[to] = halite_sum[from] + f64::from(map.halite_at_index(to));
                path_steps[to] = path_steps[from] + 1;
            },
        );

        for index in 0..grid.cell_count() {
            let value = if self.key.get(index).is_finite() {
                detour_cost(
                    self.halite_sum[index],
                    self.path_steps[index],
                    self.direct[index],
                    penalty_multiplier,
                )
            } else {
                UNREACHABLE
            };
            self.cost.set(index, value);
        }
    }

    fn rebuild_direct(&mut self, grid: &Grid, homes: &[Position]) {
        self.direct.fill(NO_DISTANCE);
        let mut queue = VecDeque::with_capacity(grid.cell_count());
        for &home in homes {
            let index = grid.index(home);
            if self.direct[index] != 0 {
                self.direct[index] = 0;
                queue.push_back(home);
            }
        }
        while let Some(cell) = queue.pop_front() {
            let next_distance = self.direct[grid.index(cell)] + 1;
            for neighbor in grid.neighbors(cell) {
                let index = grid.index(neighbor);
                if self.direct[index] <= next_distance {
                    continue;
                }
                self.direct[index] = next_distance;
                queue.push_back(neighbor);
            }
        }
        self.direct_sources = homes.to_vec();
    }
}

fn detour_cost(halite_sum: f64, path_steps: u32, direct: u32, penalty_multiplier: f64) -> f64 {
    if direct == 0 || direct == NO_DISTANCE {
        return halite_sum.max(0.0);
    }
    let ratio = f64::from(path_steps) / f64::from(direct);
    halite_sum * ((ratio - 1.0) * penalty_multiplier + 1.0)
}
