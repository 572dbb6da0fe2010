//! Ship roles and their transitions.
//!
//! Roles form a total priority order: a lower [`Role::priority`] is served
//! first by the scheduler and can never be pushed aside by a ship of a
//! higher one.
//!
//! ```text
//!              cargo >= fill                 reached home
//!  Outbound ─────────────────────▶ Inbound ────────────────▶ Outbound
//!     │  ▲                           ▲
//!     │  │ depleted, light cargo     │ depleted, heavy cargo
//!     ▼  │                           │  or cargo >= fill
//!  Harvester ────────────────────────┘
//! ```
//!
//! Directives override everything; ships whose directive lapses fall back to
//! `Outbound`. A ship with nowhere to go idles.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::grid::Position;
use crate::navigate::{self, Terrain};
use crate::ship::Ship;
use crate::snapshot::DirectiveKind;

/// What a ship is currently trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Directed special agent.
    SpecialAgent,
    /// Directed infiltrator.
    Infiltrator,
    /// Heading to a site to convert into a dropoff.
    DropoffBuilder,
    /// Returning cargo home.
    Inbound,
    /// Standing on a cell and gathering.
    Harvester,
    /// Seeking a profitable harvest area.
    Outbound,
    /// Nothing reachable to do.
    Idle,
}

impl Role {
    /// Every role in priority order.
    pub const ALL: [Self; 7] = [
        Self::SpecialAgent,
        Self::Infiltrator,
        Self::DropoffBuilder,
        Self::Inbound,
        Self::Harvester,
        Self::Outbound,
        Self::Idle,
    ];

    /// Scheduling priority; lower is served first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::SpecialAgent => 0,
            Self::Infiltrator => 1,
            Self::DropoffBuilder => 2,
            Self::Inbound => 3,
            Self::Harvester => 4,
            Self::Outbound => 5,
            Self::Idle => 6,
        }
    }

    /// Whether `self` is served strictly before `other`.
    #[must_use]
    pub const fn outranks(self, other: Self) -> bool {
        self.priority() < other.priority()
    }

    /// Role forced by a directive.
    #[must_use]
    pub const fn from_directive(kind: DirectiveKind) -> Self {
        match kind {
            DirectiveKind::Special => Self::SpecialAgent,
            DirectiveKind::Infiltrate => Self::Infiltrator,
            DirectiveKind::BuildDropoff => Self::DropoffBuilder,
        }
    }

    /// Whether the role only exists under a directive.
    #[must_use]
    pub const fn is_directed(self) -> bool {
        matches!(
            self,
            Self::SpecialAgent | Self::Infiltrator | Self::DropoffBuilder
        )
    }
}

/// Role for the rest of this turn, derived from the role the ship started the
/// turn with and the current fields.
#[must_use]
pub fn classify(ship: &Ship, terrain: &Terrain<'_>) -> Role {
    if let Some(directive) = ship.directive {
        return Role::from_directive(directive.kind);
    }
    let here = ship.origin;
    let capacity = f64::from(terrain.constants.ship_capacity);
    let cargo = f64::from(ship.cargo);
    let full = cargo >= terrain.config.fill_threshold * capacity;

    match ship.start_role {
        Role::Inbound if terrain.is_home(here) => seek(ship, terrain),
        Role::Inbound => Role::Inbound,
        _ if full && !terrain.is_home(here) => Role::Inbound,
        Role::Harvester => {
            let local_yield = f64::from(terrain.constants.extraction(terrain.map.halite(here)));
            if local_yield >= terrain.config.min_harvest_yield {
                Role::Harvester
            } else if cargo >= terrain.config.return_min_cargo * capacity {
                Role::Inbound
            } else {
                seek(ship, terrain)
            }
        }
        _ => seek(ship, terrain),
    }
}

/// Outbound, harvester on the spot, or idle when nothing is reachable.
fn seek(ship: &Ship, terrain: &Terrain<'_>) -> Role {
    let here = ship.origin;
    let outbound = terrain.fields.outbound();
    let reachable = outbound.is_reachable(here)
        || terrain
            .grid
            .neighbors(here)
            .into_iter()
            .any(|n| outbound.is_reachable(n));
    if !reachable {
        return Role::Idle;
    }
    if should_harvest(here, terrain) {
        Role::Harvester
    } else {
        Role::Outbound
    }
}

/// Whether harvesting `here` beats travelling on to the outbound destination.
#[must_use]
pub fn should_harvest(here: Position, terrain: &Terrain<'_>) -> bool {
    if terrain.is_home(here) {
        return false;
    }
    let gain_here = terrain.harvest_gain(here);
    if gain_here < terrain.config.min_harvest_yield {
        return false;
    }
    let route = navigate::descend_outbound(terrain, here);
    if route.destination == here {
        return true;
    }
    let travel = f64::from(terrain.constants.move_cost(terrain.map.halite(here)));
    let gain_there = terrain.harvest_gain(route.destination) - travel;
    gain_here >= terrain.config.harvest_threshold * gain_there
}

/// Role the ship would hold next turn if it ends this turn on `at`.
///
/// Used both to order push candidates and to update the role once a move is
/// committed.
#[must_use]
pub fn next_role(ship: &Ship, at: Position, terrain: &Terrain<'_>) -> Role {
    match ship.role {
        Role::Inbound if terrain.is_home(at) => Role::Outbound,
        Role::Harvester if at != ship.origin => Role::Outbound,
        Role::Outbound if at != ship.origin && Some(at) == ship.destination => Role::Harvester,
        role => role,
    }
}

/// Possibly flip a persistently blocked ship into the fugitive sub-state.
///
/// Returns `true` when the ship became fugitive.
pub fn roll_fugitive<R: Rng>(ship: &mut Ship, config: &EngineConfig, rng: &mut R) -> bool {
    if ship.is_fugitive()
        || ship.role.is_directed()
        || ship.blocked_turns < config.blocked_threshold
    {
        return false;
    }
    if !rng.gen_bool(config.fugitive_probability.clamp(0.0, 1.0)) {
        return false;
    }
    ship.fugitive_turns = config.fugitive_duration;
    ship.blocked_turns = 0;
    tracing::debug!(
        ship = ship.id,
        turns = ship.fugitive_turns,
        "Ship turned fugitive"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConstants;
    use crate::fields::{FieldInputs, FieldSet, HarvestTimeTable};
    use crate::grid::{CellSet, Grid};
    use crate::map::ResourceMap;
    use crate::snapshot::Directive;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct World {
        grid: Grid,
        map: ResourceMap,
        fields: FieldSet,
        homes: CellSet,
        constants: GameConstants,
        config: EngineConfig,
    }

    impl World {
        fn new(width: usize, height: usize, halite: Vec<u32>) -> Self {
            let grid = Grid::new(width, height);
            let map = ResourceMap::new(grid.clone(), halite);
            let constants = GameConstants {
                width,
                height,
                ..GameConstants::default()
            };
            let config = EngineConfig::default();
            let dropoffs = [Position::new(0, 0)];
            let mut homes = CellSet::new(grid.cell_count());
            homes.insert(0);
            let empty = CellSet::new(grid.cell_count());
            let table = HarvestTimeTable::new(&constants, &config);
            let mut fields = FieldSet::new(&grid);
            fields.rebuild(FieldInputs {
                grid: &grid,
                map: &map,
                dropoffs: &dropoffs,
                return_blocked: &empty,
                forbidden: &empty,
                constants: &constants,
                config: &config,
                harvest_time: &table,
            });
            Self {
                grid,
                map,
                fields,
                homes,
                constants,
                config,
            }
        }

        fn terrain(&self) -> Terrain<'_> {
            Terrain {
                grid: &self.grid,
                map: &self.map,
                fields: &self.fields,
                homes: &self.homes,
                constants: &self.constants,
                config: &self.config,
            }
        }
    }

    fn ship_at(row: usize, col: usize, cargo: u32, role: Role) -> Ship {
        let mut ship = Ship::new(1, Position::new(row, col), cargo);
        ship.role = role;
        ship.begin_turn();
        ship
    }

    #[test]
    fn test_priority_is_total_order() {
        for pair in Role::ALL.windows(2) {
            assert!(pair[0].outranks(pair[1]));
            assert!(!pair[1].outranks(pair[0]));
        }
        assert!(!Role::Inbound.outranks(Role::Inbound));
    }

    #[test]
    fn test_full_ship_turns_inbound() {
        let world = World::new(4, 4, vec![0; 16]);
        let ship = ship_at(0, 1, 1000, Role::Outbound);
        assert_eq!(classify(&ship, &world.terrain()), Role::Inbound);
    }

    #[test]
    fn test_inbound_at_home_heads_out() {
        let world = World::new(4, 4, vec![0; 16]);
        let ship = ship_at(0, 0, 0, Role::Inbound);
        assert_ne!(classify(&ship, &world.terrain()), Role::Inbound);
    }

    #[test]
    fn test_depleted_harvester_with_cargo_returns() {
        let world = World::new(4, 4, vec![0; 16]);
        let heavy = ship_at(2, 2, 600, Role::Harvester);
        assert_eq!(classify(&heavy, &world.terrain()), Role::Inbound);
        let light = ship_at(2, 2, 100, Role::Harvester);
        assert_ne!(classify(&light, &world.terrain()), Role::Inbound);
        assert_ne!(classify(&light, &world.terrain()), Role::Harvester);
    }

    #[test]
    fn test_rich_cell_keeps_harvester() {
        let mut halite = vec![0; 64];
        halite[3 * 8 + 3] = 800;
        let world = World::new(8, 8, halite);
        let ship = ship_at(3, 3, 0, Role::Harvester);
        assert_eq!(classify(&ship, &world.terrain()), Role::Harvester);
    }

    #[test]
    fn test_outbound_on_lone_rich_cell_starts_harvesting() {
        let mut halite = vec![0; 64];
        halite[3 * 8 + 3] = 800;
        let world = World::new(8, 8, halite);
        let ship = ship_at(3, 3, 0, Role::Outbound);
        assert_eq!(classify(&ship, &world.terrain()), Role::Harvester);
    }

    #[test]
    fn test_directive_overrides_role() {
        let world = World::new(4, 4, vec![0; 16]);
        let mut ship = ship_at(1, 1, 1000, Role::Inbound);
        ship.directive = Some(Directive {
            ship: 1,
            kind: DirectiveKind::Infiltrate,
            target: Position::new(3, 3),
        });
        assert_eq!(classify(&ship, &world.terrain()), Role::Infiltrator);
    }

    #[test]
    fn test_next_role_predictions() {
        let world = World::new(4, 4, vec![0; 16]);
        let terrain = world.terrain();

        let inbound = ship_at(0, 1, 900, Role::Inbound);
        assert_eq!(next_role(&inbound, Position::new(0, 0), &terrain), Role::Outbound);
        assert_eq!(next_role(&inbound, Position::new(1, 1), &terrain), Role::Inbound);

        let harvester = ship_at(2, 2, 0, Role::Harvester);
        assert_eq!(next_role(&harvester, Position::new(2, 2), &terrain), Role::Harvester);
        assert_eq!(next_role(&harvester, Position::new(2, 3), &terrain), Role::Outbound);

        let mut outbound = ship_at(2, 2, 0, Role::Outbound);
        outbound.destination = Some(Position::new(2, 3));
        assert_eq!(next_role(&outbound, Position::new(2, 3), &terrain), Role::Harvester);
        assert_eq!(next_role(&outbound, Position::new(1, 2), &terrain), Role::Outbound);
    }

    #[test]
    fn test_fugitive_requires_blocked_threshold() {
        let config = EngineConfig {
            fugitive_probability: 1.0,
            ..EngineConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = ship_at(0, 0, 0, Role::Outbound);
        ship.blocked_turns = config.blocked_threshold - 1;
        assert!(!roll_fugitive(&mut ship, &config, &mut rng));

        ship.blocked_turns = config.blocked_threshold;
        assert!(roll_fugitive(&mut ship, &config, &mut rng));
        assert_eq!(ship.fugitive_turns, config.fugitive_duration);
        assert_eq!(ship.blocked_turns, 0);
    }

    #[test]
    fn test_fugitive_never_with_zero_probability() {
        let config = EngineConfig {
            fugitive_probability: 0.0,
            ..EngineConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = ship_at(0, 0, 0, Role::Outbound);
        ship.blocked_turns = 100;
        for _ in 0..32 {
            assert!(!roll_fugitive(&mut ship, &config, &mut rng));
        }
    }
}
