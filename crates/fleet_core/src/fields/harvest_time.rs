use crate::config::{EngineConfig, GameConstants};

/// Longest stay on one cell considered when estimating harvest rates.
const MAX_STAY: u32 = 32;

/// Monotone lookup from a local cell value to the estimated turns needed to
/// fill a ship by harvesting cells of that value.
///
/// Standing `n` turns on a cell holding `h` collects `h * (1 - (1 - f)^n)`,
/// where `f` is the extraction fraction, and costs `n + 1` turns counting the
/// move onto the cell. The best rate over stays whose last turn still yields
/// at least `min_harvest_yield` gives `turns = capacity / rate`, capped at
/// `max_harvest_turns`. Built once per game.
#[derive(Debug, Clone)]
pub struct HarvestTimeTable {
    turns: Vec<f64>,
}

impl HarvestTimeTable {
    /// Build the table for every integer value up to `config.max_cell_value`.
    #[must_use]
    pub fn new(constants: &GameConstants, config: &EngineConfig) -> Self {
        let extract = constants.extract_fraction();
        let capacity = f64::from(constants.ship_capacity);
        let cap = config.max_harvest_turns;
        let len = config.max_cell_value.ceil() as usize + 1;

        let mut turns: Vec<f64> = (0..len)
            .map(|value| {
                let rate = best_rate(value as f64, extract, config.min_harvest_yield);
                if rate > 0.0 {
                    (capacity / rate).min(cap)
                } else {
                    cap
                }
            })
            .collect();

        // Enforce monotonicity against rounding at stay-length boundaries.
        for i in 1..turns.len() {
            if turns[i] > turns[i - 1] {
                turns[i] = turns[i - 1];
            }
        }
        Self { turns }
    }

    /// Estimated turns for a smoothed value; out-of-range values clamp.
    #[must_use]
    pub fn turns(&self, value: f64) -> f64 {
        let last = self.turns.len() - 1;
        let index = if value.is_nan() || value <= 0.0 {
            0
        } else {
            (value.floor() as usize).min(last)
        };
        self.turns[index]
    }

    /// Number of table entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the table is empty (never true for a built table).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

fn best_rate(value: f64, extract: f64, min_yield: f64) -> f64 {
    let mut best = 0.0_f64;
    let mut remaining = value;
    let mut collected = 0.0;
    for stay in 1..=MAX_STAY {
        let gain = remaining * extract;
        if gain < min_yield {
            break;
        }
        collected += gain;
        remaining -= gain;
        best = best.max(collected / f64::from(stay + 1));
    }
    best
}
