//! Game constants and engine tuning configuration.
//!
//! [`GameConstants`] arrive once at game start and never change.
//! [`EngineConfig`] holds every tuning constant of the engine and can be
//! loaded from a RON file; missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Largest accepted `max_cell_value`. The harvest-time table holds one entry
/// per integer value up to the cap.
pub const MAX_CELL_VALUE_LIMIT: f64 = 100_000.0;

/// Game-wide numeric constants fixed for the whole game.
///
/// Fields missing from the init message take the standard game values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConstants {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Leaving a cell costs `halite / move_cost_ratio` cargo.
    pub move_cost_ratio: u32,
    /// Staying on a cell extracts `ceil(halite / extract_ratio)`.
    pub extract_ratio: u32,
    /// Maximum cargo a ship can carry.
    pub ship_capacity: u32,
    /// Total turns in the game.
    pub max_turns: u32,
    /// Cost of building a ship.
    pub ship_cost: u32,
    /// Cost of converting a ship into a dropoff.
    pub dropoff_cost: u32,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            move_cost_ratio: 10,
            extract_ratio: 4,
            ship_capacity: 1000,
            max_turns: 400,
            ship_cost: 1000,
            dropoff_cost: 4000,
        }
    }
}

impl GameConstants {
    /// Cargo spent to leave a cell holding `halite`.
    #[inline]
    #[must_use]
    pub const fn move_cost(&self, halite: u32) -> u32 {
        halite / self.move_cost_ratio
    }

    /// Halite extracted by one turn of standing on a cell holding `halite`.
    #[inline]
    #[must_use]
    pub const fn extraction(&self, halite: u32) -> u32 {
        halite.div_ceil(self.extract_ratio)
    }

    /// Fraction of a cell's halite lost per step when leaving it.
    #[must_use]
    pub fn move_cost_fraction(&self) -> f64 {
        1.0 / f64::from(self.move_cost_ratio)
    }

    /// Fraction of a cell's halite extracted per harvest turn.
    #[must_use]
    pub fn extract_fraction(&self) -> f64 {
        1.0 / f64::from(self.extract_ratio)
    }

    /// Reject constants the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.move_cost_ratio == 0 || self.extract_ratio == 0 {
            return Err(EngineError::InvalidConfig(
                "move_cost_ratio and extract_ratio must be positive".into(),
            ));
        }
        if self.ship_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "ship_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning constants for fields, scheduling and push resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Return field ---
    /// Weight of the detour penalty `(path / direct - 1)`.
    pub penalty_multiplier: f64,

    // --- Adjusted-value field ---
    /// Scales the return fuel cost subtracted from raw halite.
    pub loss_multiplier: f64,
    /// Upper bound on any adjusted cell value.
    pub max_cell_value: f64,

    // --- Outbound field ---
    /// Radius of the disc averaged into the smoothed local value.
    pub smoothing_radius: usize,
    /// Constant cost added per propagation step.
    pub step_penalty: f64,
    /// Within this distance of a dropoff, outbound paths never approach it.
    pub dropoff_guard_radius: usize,
    /// Harvest is worth continuing while one turn extracts at least this much.
    pub min_harvest_yield: f64,
    /// Cap on the harvest-time estimate for barren cells, in turns.
    pub max_harvest_turns: f64,

    // --- Roles ---
    /// Outbound becomes harvester when local gain reaches this fraction of the
    /// gain at its destination net of the move cost.
    pub harvest_threshold: f64,
    /// Fraction of capacity at which a ship heads home.
    pub fill_threshold: f64,
    /// Minimum cargo fraction for a depleted harvester to return rather than
    /// seek a new cell.
    pub return_min_cargo: f64,
    /// Maximum gradient-following steps when deriving a destination.
    pub max_lookahead: usize,

    // --- Push protocol ---
    /// Maximum displacement chain length.
    pub max_push_depth: usize,
    /// Maximum candidate cells examined by one push search.
    pub max_push_steps: usize,
    /// Allow swapping with a strictly lower-priority blocker when push fails.
    pub forced_swap: bool,

    // --- Scheduler ---
    /// Times a unit may be deferred to a later pass before it must stay.
    pub max_deferrals: u32,
    /// Treat cells adjacent to enemy ships as forbidden.
    pub avoid_enemy_adjacent: bool,
    /// Default wall-clock budget per turn in milliseconds.
    pub turn_budget_ms: u64,

    // --- Fugitive sub-state ---
    /// Blocked turns before a ship may flee.
    pub blocked_threshold: u32,
    /// Probability of fleeing once the threshold is crossed.
    pub fugitive_probability: f64,
    /// Turns spent reversing field direction.
    pub fugitive_duration: u32,

    /// Seed for the engine's deterministic RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            penalty_multiplier: 1.0,
            loss_multiplier: 1.0,
            max_cell_value: 1500.0,
            smoothing_radius: 2,
            step_penalty: 1.0,
            dropoff_guard_radius: 3,
            min_harvest_yield: 12.0,
            max_harvest_turns: 1000.0,
            harvest_threshold: 0.8,
            fill_threshold: 0.9,
            return_min_cargo: 0.5,
            max_lookahead: 64,
            max_push_depth: 8,
            max_push_steps: 256,
            forced_swap: true,
            max_deferrals: 1,
            avoid_enemy_adjacent: false,
            turn_budget_ms: 1500,
            blocked_threshold: 3,
            fugitive_probability: 0.5,
            fugitive_duration: 2,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| EngineError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| EngineError::ConfigLoad {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break propagation or scheduling.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("penalty_multiplier", self.penalty_multiplier),
            ("loss_multiplier", self.loss_multiplier),
            ("max_cell_value", self.max_cell_value),
            ("step_penalty", self.step_penalty),
            ("min_harvest_yield", self.min_harvest_yield),
            ("max_harvest_turns", self.max_harvest_turns),
            ("harvest_threshold", self.harvest_threshold),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.max_cell_value > MAX_CELL_VALUE_LIMIT {
            return Err(EngineError::InvalidConfig(format!(
                "max_cell_value must not exceed {MAX_CELL_VALUE_LIMIT}, got {}",
                self.max_cell_value
            )));
        }
        if self.step_penalty <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "step_penalty must be positive".into(),
            ));
        }
        if self.min_harvest_yield <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "min_harvest_yield must be positive".into(),
            ));
        }
        let fractions = [
            ("fill_threshold", self.fill_threshold),
            ("return_min_cargo", self.return_min_cargo),
            ("fugitive_probability", self.fugitive_probability),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.max_push_depth == 0 || self.max_push_steps == 0 {
            return Err(EngineError::InvalidConfig(
                "push limits must be positive".into(),
            ));
        }
        Ok(())
    }
}
