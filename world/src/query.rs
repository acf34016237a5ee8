//! Read-only queries that combine the map snapshot with the potential field.

use fieldbot_core::{CellCoord, Direction, PotentialField};

use crate::GameMap;

/// Neighbor with the best (lowest) degraded potential.
///
/// Ties keep the earliest neighbor in canonical north/east/south/west order,
/// which makes the choice deterministic for a fixed field. This is the
/// forest-parent relation used by the attack-wave scheduler and the interior
/// classification used by move assignment.
#[must_use]
pub fn steepest_neighbor(
    map: &GameMap,
    field: &PotentialField,
    cell: CellCoord,
) -> (Direction, CellCoord) {
    let mut best: Option<(f64, Direction, CellCoord)> = None;
    for (direction, neighbor) in map.neighbors(cell) {
        let degraded = field.degraded(neighbor);
        let better = match best {
            None => true,
            Some((best_value, _, _)) => degraded.total_cmp(&best_value).is_lt(),
        };
        if better {
            best = Some((degraded, direction, neighbor));
        }
    }
    let (_, direction, neighbor) = best.expect("grid cells always have four neighbors");
    (direction, neighbor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_core::{CellState, OwnerId, PotentialEntry};

    fn field_from_values(width: u16, height: u16, values: &[f64]) -> PotentialField {
        let entries = values
            .iter()
            .map(|value| PotentialEntry {
                value: *value,
                friendly_distance: 0,
            })
            .collect();
        PotentialField::from_entries(width, height, 0.2, entries)
    }

    fn flat_map(width: u16, height: u16) -> GameMap {
        let cells = vec![
            CellState {
                owner: OwnerId::NEUTRAL,
                strength: 0,
                production: 1,
            };
            usize::from(width) * usize::from(height)
        ];
        GameMap::from_cells(width, height, cells)
    }

    #[test]
    fn picks_lowest_degraded_neighbor() {
        let map = flat_map(3, 3);
        let field = field_from_values(
            3,
            3,
            &[
                9.0, 9.0, 9.0, //
                9.0, 9.0, 1.0, //
                9.0, 9.0, 9.0,
            ],
        );

        let (direction, neighbor) = steepest_neighbor(&map, &field, CellCoord::new(1, 1));
        assert_eq!(direction, Direction::East);
        assert_eq!(neighbor, CellCoord::new(2, 1));
    }

    #[test]
    fn ties_keep_canonical_order() {
        let map = flat_map(3, 3);
        let field = field_from_values(3, 3, &[5.0; 9]);

        let (direction, _) = steepest_neighbor(&map, &field, CellCoord::new(1, 1));
        assert_eq!(direction, Direction::North);
    }
}
