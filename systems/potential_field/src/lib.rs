#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Multi-source potential-field builder.
//!
//! Every turn this system turns local per-cell economics into a single scalar
//! ranking reachable from everywhere on the grid. All non-owned cells seed a
//! lazy-deletion uniform-cost search; relaxation blends the parent's raw
//! potential with the neighbor's intrinsic payback ratio outside our
//! territory, and applies a convex friendly-distance penalty inside it. Wall
//! cells are never relaxed through, so routes detour around them.
//!
//! The edge weights are deliberately not shortest-path-safe: empty cells next
//! to enemies can seed negative potentials. First-finalization is therefore a
//! heuristic ranking, not an optimality guarantee, and that is fine: the
//! field only has to order candidate destinations.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fieldbot_core::{
    degrade_potential, CellCoord, OwnerId, PotentialEntry, PotentialField,
};
use fieldbot_world::{territory::Territory, GameMap};
use rand::Rng;

/// Seed multiplier that makes wall cells repellent without hiding them.
const WALL_SEED_MULTIPLIER: f64 = 100.0;

/// Tuning knobs for the potential-field builder.
#[derive(Clone, Copy, Debug)]
pub struct FieldTuning {
    /// Exponential smoothing factor blending parent potential with a
    /// neighbor's intrinsic payback when relaxing outside our territory.
    pub alpha: f64,
    /// Convex penalty applied per hop of friendly distance; larger values
    /// keep units closer to the frontier.
    pub degradation_step: f64,
    /// Potential contributed by each enemy cell adjacent to an empty seed;
    /// negative values turn contested empties into beachheads.
    pub enemy_roi: f64,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            alpha: 0.10,
            degradation_step: 0.2,
            enemy_roi: -0.5,
        }
    }
}

/// Heap entry for the frontier queue.
///
/// `rank` orders the queue; `value` is the raw potential the entry finalizes
/// (for owned cells the parent's undegraded potential). The random tiebreak
/// comes from an injected source so equal-rank pops carry no directional
/// bias and tests can reproduce a build exactly.
#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    rank: f64,
    tiebreak: f64,
    value: f64,
    friendly_distance: u16,
    cell: CellCoord,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest rank first.
        other
            .rank
            .total_cmp(&self.rank)
            .then_with(|| other.tiebreak.total_cmp(&self.tiebreak))
    }
}

/// Intrinsic potential a non-owned cell seeds the search with.
fn initial_potential(
    map: &GameMap,
    cell: CellCoord,
    my_id: OwnerId,
    territory: &Territory,
    tuning: &FieldTuning,
) -> f64 {
    let state = map.at(cell);
    if state.is_open_empty() {
        let enemy_neighbors = map
            .neighbors(cell)
            .iter()
            .filter(|(_, neighbor)| {
                let owner = map.at(*neighbor).owner;
                !owner.is_neutral() && owner != my_id
            })
            .count();
        tuning.enemy_roi * enemy_neighbors as f64
    } else if state.production == 0 || (!state.owner.is_neutral() && state.owner != my_id) {
        f64::INFINITY
    } else if territory.in_wall(cell) {
        WALL_SEED_MULTIPLIER * f64::from(state.strength) / f64::from(state.production)
    } else {
        f64::from(state.strength) / f64::from(state.production)
    }
}

/// Payback ratio used when blending a relaxation into a non-owned neighbor.
fn intrinsic_potential(map: &GameMap, cell: CellCoord) -> f64 {
    let state = map.at(cell);
    if state.production > 0 && state.owner.is_neutral() {
        f64::from(state.strength) / f64::from(state.production)
    } else {
        f64::INFINITY
    }
}

/// Builds the complete potential field for this turn's snapshot.
///
/// Every cell of the returned field has exactly one finalized entry. Should
/// a wall-enclosed pocket remain unreachable after the queue drains, its
/// cells are filled with infinite-value entries so the coverage invariant
/// holds and nothing is ever attracted toward them.
pub fn build_field<R: Rng>(
    map: &GameMap,
    my_id: OwnerId,
    territory: &Territory,
    tuning: &FieldTuning,
    rng: &mut R,
) -> PotentialField {
    let cell_count = map.cell_count();
    let mut entries: Vec<Option<PotentialEntry>> = vec![None; cell_count];
    let mut finalized = 0usize;

    let mut frontier = BinaryHeap::with_capacity(cell_count);
    for cell in map.coords() {
        if map.at(cell).owner == my_id {
            continue;
        }
        let potential = initial_potential(map, cell, my_id, territory, tuning);
        frontier.push(FrontierEntry {
            rank: potential,
            tiebreak: rng.gen(),
            value: potential,
            friendly_distance: 0,
            cell,
        });
    }

    while finalized < cell_count {
        let Some(entry) = frontier.pop() else {
            break;
        };
        let index =
            usize::from(entry.cell.y()) * usize::from(map.width()) + usize::from(entry.cell.x());
        if entries[index].is_some() {
            // Lazy deletion: the first pop already finalized this cell.
            continue;
        }
        entries[index] = Some(PotentialEntry {
            value: entry.value,
            friendly_distance: entry.friendly_distance,
        });
        finalized += 1;

        for (_, neighbor) in map.neighbors(entry.cell) {
            if territory.in_wall(neighbor) {
                continue;
            }
            if map.at(neighbor).owner != my_id {
                let intrinsic = intrinsic_potential(map, neighbor);
                let blended = if intrinsic.is_finite() {
                    (1.0 - tuning.alpha) * entry.value + tuning.alpha * intrinsic
                } else {
                    f64::INFINITY
                };
                frontier.push(FrontierEntry {
                    rank: blended,
                    tiebreak: rng.gen(),
                    value: blended,
                    friendly_distance: entry.friendly_distance,
                    cell: neighbor,
                });
            } else {
                let distance = entry.friendly_distance + 1;
                let degraded = degrade_potential(entry.value, distance, tuning.degradation_step);
                frontier.push(FrontierEntry {
                    rank: degraded,
                    tiebreak: rng.gen(),
                    value: entry.value,
                    friendly_distance: distance,
                    cell: neighbor,
                });
            }
        }
    }

    let entries = entries
        .into_iter()
        .map(|entry| {
            entry.unwrap_or(PotentialEntry {
                value: f64::INFINITY,
                friendly_distance: 0,
            })
        })
        .collect();
    PotentialField::from_entries(map.width(), map.height(), tuning.degradation_step, entries)
}
