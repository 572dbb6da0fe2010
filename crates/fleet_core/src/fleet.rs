//! Owned ships and bases, kept consistent with the environment's snapshots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::grid::{Grid, Position};
use crate::ship::{Ship, ShipId};
use crate::snapshot::TurnSnapshot;

/// A home cell acting as a return-field source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropoff {
    /// Cell of the base.
    pub position: Position,
    /// Turns since the base became active.
    pub age: u32,
    /// Whether this is the shipyard.
    pub is_primary: bool,
}

/// Counts of what a [`Fleet::sync`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Ships removed by loss notices.
    pub lost: usize,
    /// Ships added by spawn confirmations.
    pub spawned: usize,
    /// Ships removed after converting into a dropoff.
    pub converted: usize,
    /// Bases added this turn.
    pub dropoffs_added: usize,
    /// Bases removed this turn.
    pub dropoffs_removed: usize,
}

/// Every owned ship and base.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    ships: BTreeMap<ShipId, Ship>,
    dropoffs: Vec<Dropoff>,
}

impl Fleet {
    /// A fleet with the shipyard as its only base.
    #[must_use]
    pub fn new(shipyard: Position) -> Self {
        Self {
            ships: BTreeMap::new(),
            dropoffs: vec![Dropoff {
                position: shipyard,
                age: 0,
                is_primary: true,
            }],
        }
    }

    /// Ships in identity order.
    #[must_use]
    pub const fn ships(&self) -> &BTreeMap<ShipId, Ship> {
        &self.ships
    }

    /// Mutable ships in identity order.
    pub fn ships_mut(&mut self) -> &mut BTreeMap<ShipId, Ship> {
        &mut self.ships
    }

    /// A ship by identity.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Insert a ship directly, replacing any ship with the same identity.
    pub fn insert(&mut self, ship: Ship) {
        self.ships.insert(ship.id, ship);
    }

    /// Number of owned ships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Whether the fleet owns no ships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Owned bases.
    #[must_use]
    pub fn dropoffs(&self) -> &[Dropoff] {
        &self.dropoffs
    }

    /// Cells of every owned base, in activation order.
    #[must_use]
    pub fn home_positions(&self) -> Vec<Position> {
        self.dropoffs.iter().map(|d| d.position).collect()
    }

    /// Reconcile the fleet with a turn snapshot.
    ///
    /// Loss notices are applied first, then every remaining ship must be
    /// reported exactly where its last committed move put it. Ships may only
    /// appear with a spawn confirmation and may only disappear with a loss
    /// notice or after constructing a dropoff.
    pub fn sync(&mut self, grid: &Grid, snapshot: &TurnSnapshot) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for &id in &snapshot.lost {
            if self.ships.remove(&id).is_none() {
                return Err(EngineError::UnknownShip(id));
            }
            report.lost += 1;
        }

        let mut reported = BTreeMap::new();
        for ship in &snapshot.ships {
            grid.check(ship.position)?;
            if reported.insert(ship.id, ship).is_some() {
                return Err(EngineError::InvalidState(format!(
                    "ship {} reported twice",
                    ship.id
                )));
            }
        }

        let mut converted = Vec::new();
        for (&id, ship) in &mut self.ships {
            match reported.get(&id) {
                Some(seen) => {
                    if seen.position != ship.position {
                        return Err(EngineError::PositionMismatch {
                            ship: id,
                            expected: ship.position,
                            reported: seen.position,
                        });
                    }
                    ship.cargo = seen.cargo;
                }
                None if ship.constructing => converted.push(id),
                None => return Err(EngineError::ShipVanished(id)),
            }
        }
        for id in converted {
            self.ships.remove(&id);
            report.converted += 1;
        }

        let spawned: BTreeSet<ShipId> = snapshot.spawned.iter().copied().collect();
        for (&id, seen) in &reported {
            if self.ships.contains_key(&id) {
                continue;
            }
            if !spawned.contains(&id) {
                return Err(EngineError::UnexpectedShip(id));
            }
            self.ships.insert(id, Ship::new(id, seen.position, seen.cargo));
            report.spawned += 1;
        }
        if let Some(&missing) = spawned.iter().find(|id| !reported.contains_key(id)) {
            return Err(EngineError::MissingSpawn(missing));
        }

        for ship in self.ships.values_mut() {
            ship.directive = None;
        }
        for directive in &snapshot.directives {
            grid.check(directive.target)?;
            let ship = self
                .ships
                .get_mut(&directive.ship)
                .ok_or(EngineError::UnknownShip(directive.ship))?;
            ship.directive = Some(*directive);
        }

        self.sync_dropoffs(grid, &snapshot.dropoffs, &snapshot.lost_dropoffs, &mut report)?;

        if report.lost + report.spawned + report.converted > 0 {
            tracing::debug!(
                lost = report.lost,
                spawned = report.spawned,
                converted = report.converted,
                ships = self.ships.len(),
                "Fleet changed"
            );
        }
        Ok(report)
    }

    /// Bases only disappear through an explicit loss notice, so a snapshot
    /// that omits the list leaves every home in place.
    fn sync_dropoffs(
        &mut self,
        grid: &Grid,
        reported: &[Position],
        lost: &[Position],
        report: &mut SyncReport,
    ) -> Result<()> {
        for &position in reported.iter().chain(lost) {
            grid.check(position)?;
        }
        for &position in lost {
            let Some(at) = self.dropoffs.iter().position(|d| d.position == position) else {
                return Err(EngineError::InvalidState(format!(
                    "lost base at {position} was never owned"
                )));
            };
            self.dropoffs.remove(at);
            report.dropoffs_removed += 1;
        }

        for dropoff in &mut self.dropoffs {
            dropoff.age += 1;
        }
        for &position in reported {
            if self.dropoffs.iter().any(|d| d.position == position) {
                continue;
            }
            self.dropoffs.push(Dropoff {
                position,
                age: 0,
                is_primary: false,
            });
            report.dropoffs_added += 1;
        }
        if report.dropoffs_added + report.dropoffs_removed > 0 {
            tracing::debug!(
                added = report.dropoffs_added,
                removed = report.dropoffs_removed,
                bases = self.dropoffs.len(),
                "Bases changed"
            );
        }
        Ok(())
    }
}
