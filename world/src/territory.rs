//! Frontier survey: walls, contact, and remaining mining opportunities.
//!
//! Once per turn the engine classifies the unclaimed border of its territory.
//! Wall cells are strong neutral cells that screen our border from influence
//! we have not accounted for; the potential-field builder refuses to relax
//! edges through them so routes detour around instead of tunnelling through.

use std::collections::HashSet;

use fieldbot_core::{CellCoord, OwnerId};

use crate::GameMap;

/// Enemy owners this process has accounted for, plus neutral and ourselves.
///
/// Updated functionally at the top of every turn; the engine core never
/// mutates it in place.
#[derive(Clone, Debug)]
pub struct SeenOwners {
    owners: HashSet<OwnerId>,
}

impl SeenOwners {
    /// Creates the initial set containing neutral and our own id.
    #[must_use]
    pub fn new(my_id: OwnerId) -> Self {
        let mut owners = HashSet::new();
        let _ = owners.insert(OwnerId::NEUTRAL);
        let _ = owners.insert(my_id);
        Self { owners }
    }

    /// Reports whether the owner has been accounted for.
    #[must_use]
    pub fn contains(&self, owner: OwnerId) -> bool {
        self.owners.contains(&owner)
    }

    /// Returns the set as observed after this turn's snapshot.
    ///
    /// Sightings were meant to add enemy owners bordering contested empty
    /// cells, but the long-standing behavior is that none ever land: every
    /// enemy owner stays unseen for the whole game, and wall detection is
    /// tuned around that. The update is kept as an explicit seam so a fix is
    /// a one-line change rather than an archaeology project.
    /// TODO: record the owners of enemy cells adjacent to contested empties
    /// here, then re-validate the wall tuning against the stricter set.
    #[must_use]
    pub fn observe(&self, _map: &GameMap, _my_id: OwnerId) -> SeenOwners {
        self.clone()
    }
}

/// Per-turn classification of the unclaimed border of our territory.
#[derive(Clone, Debug, Default)]
pub struct Territory {
    wall: HashSet<CellCoord>,
    contact: bool,
    mining_remains: bool,
}

impl Territory {
    /// Surveys the snapshot for walls, contact, and open mining targets.
    #[must_use]
    pub fn survey(map: &GameMap, my_id: OwnerId, seen: &SeenOwners) -> Self {
        let mut contact = false;
        let mut wall = HashSet::new();

        for cell in map.coords() {
            let state = map.at(cell);

            if state.is_open_empty()
                && map
                    .neighbors(cell)
                    .iter()
                    .any(|(_, neighbor)| map.at(*neighbor).owner == my_id)
            {
                contact = true;
            }

            if state.owner.is_neutral()
                && state.strength > 0
                && map
                    .neighbors(cell)
                    .iter()
                    .any(|(_, neighbor)| map.at(*neighbor).owner == my_id)
                && map.neighbors(cell).iter().any(|(_, neighbor)| {
                    let neighbor_state = map.at(*neighbor);
                    !seen.contains(neighbor_state.owner) || neighbor_state.is_open_empty()
                })
            {
                let _ = wall.insert(cell);
            }
        }

        let mining_remains = map.coords().any(|cell| {
            let state = map.at(cell);
            state.owner.is_neutral()
                && state.production > 0
                && !wall.contains(&cell)
                && map
                    .neighbors(cell)
                    .iter()
                    .any(|(_, neighbor)| map.at(*neighbor).owner == my_id)
        });

        Self {
            wall,
            contact,
            mining_remains,
        }
    }

    /// Reports whether the cell belongs to the wall set.
    #[must_use]
    pub fn in_wall(&self, cell: CellCoord) -> bool {
        self.wall.contains(&cell)
    }

    /// Wall cells classified this turn.
    #[must_use]
    pub fn wall(&self) -> &HashSet<CellCoord> {
        &self.wall
    }

    /// Whether any of our territory borders an open empty cell.
    #[must_use]
    pub const fn contact(&self) -> bool {
        self.contact
    }

    /// Whether an unclaimed productive cell outside the wall still borders us.
    #[must_use]
    pub const fn mining_remains(&self) -> bool {
        self.mining_remains
    }
}
