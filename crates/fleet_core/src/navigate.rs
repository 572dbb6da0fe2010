//! Destination and next-step selection by following cost fields.

use crate::config::{EngineConfig, GameConstants};
use crate::fields::FieldSet;
use crate::grid::{CellSet, Grid, Position};
use crate::map::ResourceMap;
use crate::role::Role;
use crate::ship::Ship;

/// Read-only view of everything a routing decision looks at.
#[derive(Debug, Clone, Copy)]
pub struct Terrain<'a> {
    /// Grid geometry.
    pub grid: &'a Grid,
    /// Current resource state.
    pub map: &'a ResourceMap,
    /// Fresh cost fields.
    pub fields: &'a FieldSet,
    /// Owned bases as a cell set.
    pub homes: &'a CellSet,
    /// Game constants.
    pub constants: &'a GameConstants,
    /// Tuning constants.
    pub config: &'a EngineConfig,
}

impl Terrain<'_> {
    /// Whether a cell is an owned base.
    #[must_use]
    pub fn is_home(&self, pos: Position) -> bool {
        self.homes.contains(self.grid.index(pos))
    }

    /// Net halite one turn of harvesting at `pos` is worth.
    #[must_use]
    pub fn harvest_gain(&self, pos: Position) -> f64 {
        self.fields.adjusted().at(pos) * self.constants.extract_fraction()
    }
}

/// Where a ship is heading and its first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Final cell of the walk.
    pub destination: Position,
    /// First cell to step into; the start cell when staying.
    pub next: Position,
    /// Steps to `destination`.
    pub distance: u32,
}

impl Route {
    /// Stay where you are.
    #[must_use]
    pub const fn stay(at: Position) -> Self {
        Self {
            destination: at,
            next: at,
            distance: 0,
        }
    }
}

/// Walk strictly downhill on `value` for at most `max_steps`.
///
/// Each step takes the lowest allowed neighbor, the first in N, E, S, W order
/// on ties, and stops at a local minimum.
fn descend<V, A>(grid: &Grid, start: Position, max_steps: usize, value: V, allowed: A) -> Route
where
    V: Fn(Position) -> f64,
    A: Fn(Position, Position) -> bool,
{
    let mut current = start;
    let mut first = None;
    let mut steps = 0;
    while steps < max_steps {
        let here = value(current);
        let mut best: Option<(f64, Position)> = None;
        for neighbor in grid.neighbors(current) {
            if !allowed(current, neighbor) {
                continue;
            }
            let candidate = value(neighbor);
            if candidate < here && best.map_or(true, |(b, _)| candidate < b) {
                best = Some((candidate, neighbor));
            }
        }
        let Some((_, next)) = best else {
            break;
        };
        first.get_or_insert(next);
        current = next;
        steps += 1;
    }
    Route {
        destination: current,
        next: first.unwrap_or(start),
        distance: steps as u32,
    }
}

/// Follow the return field home.
#[must_use]
pub fn descend_returns(terrain: &Terrain<'_>, from: Position) -> Route {
    let key = &terrain.fields.returns().key;
    descend(
        terrain.grid,
        from,
        terrain.config.max_lookahead,
        |pos| key.at(pos),
        |_, _| true,
    )
}

/// Follow the outbound field to a harvest area.
///
/// Within the dropoff guard a step may never bring the ship closer to home,
/// mirroring the edge rule the field was built with.
#[must_use]
pub fn descend_outbound(terrain: &Terrain<'_>, from: Position) -> Route {
    let outbound = terrain.fields.outbound();
    let direct = &terrain.fields.returns().direct;
    let guard = terrain.config.dropoff_guard_radius as u32;
    let grid = terrain.grid;
    descend(
        grid,
        from,
        terrain.config.max_lookahead,
        |pos| outbound.at(pos),
        |a, b| {
            let (da, db) = (direct[grid.index(a)], direct[grid.index(b)]);
            !((da <= guard || db <= guard) && db < da)
        },
    )
}

/// Greedy step toward a fixed target, preferring the lower-halite neighbor
/// among equally close ones.
#[must_use]
pub fn approach(terrain: &Terrain<'_>, from: Position, target: Position) -> Route {
    let grid = terrain.grid;
    let distance = grid.distance(from, target);
    if distance == 0 {
        return Route::stay(from);
    }
    let next = grid
        .neighbors(from)
        .into_iter()
        .filter(|&n| grid.distance(n, target) < distance)
        .min_by_key(|&n| terrain.map.halite(n))
        .unwrap_or(from);
    Route {
        destination: target,
        next,
        distance: distance as u32,
    }
}

/// How much a ship in `role` likes standing on `pos` (higher is better).
///
/// Unreachable cells score negative infinity.
#[must_use]
pub fn preference(ship: &Ship, role: Role, pos: Position, terrain: &Terrain<'_>) -> f64 {
    let fields = terrain.fields;
    match role {
        Role::Inbound => -fields.returns().key.at(pos),
        Role::Harvester => fields.adjusted().at(pos),
        Role::Outbound | Role::Idle => -fields.outbound().at(pos),
        Role::SpecialAgent | Role::Infiltrator | Role::DropoffBuilder => ship
            .directive_target()
            .map_or(0.0, |target| -(terrain.grid.distance(pos, target) as f64)),
    }
}

/// One step against the field of `role`, away from where it normally heads.
#[must_use]
pub fn flee(ship: &Ship, role: Role, terrain: &Terrain<'_>) -> Route {
    let from = ship.origin;
    let mut best: Option<(f64, Position)> = None;
    for neighbor in terrain.grid.neighbors(from) {
        let score = preference(ship, role, neighbor, terrain);
        if !score.is_finite() {
            continue;
        }
        if best.map_or(true, |(b, _)| score < b) {
            best = Some((score, neighbor));
        }
    }
    match best {
        Some((_, next)) => Route {
            destination: next,
            next,
            distance: 1,
        },
        None => Route::stay(from),
    }
}

/// Destination and first step for a ship holding `role`.
#[must_use]
pub fn plan_route(ship: &Ship, role: Role, terrain: &Terrain<'_>) -> Route {
    let from = ship.origin;
    if ship.is_fugitive() && !role.is_directed() {
        return flee(ship, role, terrain);
    }
    match role {
        Role::Inbound => descend_returns(terrain, from),
        Role::Outbound => descend_outbound(terrain, from),
        Role::Harvester | Role::Idle => Route::stay(from),
        Role::SpecialAgent | Role::Infiltrator | Role::DropoffBuilder => ship
            .directive_target()
            .map_or_else(|| Route::stay(from), |target| approach(terrain, from, target)),
    }
}
