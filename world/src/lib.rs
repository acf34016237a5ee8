#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable per-turn grid snapshot and torus topology queries.
//!
//! The world crate owns the [`GameMap`] that every decision system reads, the
//! wire-frame parsing that constructs it ([`frame`]), potential-field lookups
//! that need topology ([`query`]), and the frontier survey that classifies
//! walls and contact ([`territory`]). The map is never mutated during a turn;
//! systems consume it and respond with a move set.

pub mod frame;
pub mod query;
pub mod territory;

use fieldbot_core::{CellCoord, CellState, Direction};

/// Dense row-major snapshot of the grid for a single turn.
#[derive(Clone, Debug, PartialEq)]
pub struct GameMap {
    width: u16,
    height: u16,
    cells: Vec<CellState>,
}

impl GameMap {
    /// Creates a map from row-major cell states.
    ///
    /// The cell vector length must equal `width * height`; frame parsing
    /// guarantees this for maps built from the wire protocol.
    #[must_use]
    pub fn from_cells(width: u16, height: u16, cells: Vec<CellState>) -> Self {
        debug_assert_eq!(
            cells.len(),
            usize::from(width) * usize::from(height),
            "map must cover every cell"
        );
        Self {
            width,
            height,
            cells,
        }
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// State snapshot of the provided cell.
    ///
    /// Coordinates are taken modulo the grid dimensions, matching the torus
    /// topology of the game.
    #[must_use]
    pub fn at(&self, cell: CellCoord) -> CellState {
        let x = usize::from(cell.x() % self.width);
        let y = usize::from(cell.y() % self.height);
        self.cells[y * usize::from(self.width) + x]
    }

    /// Iterator over every cell coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| CellCoord::new(x, y)))
    }

    /// Cell reached by stepping one cell in the provided direction.
    #[must_use]
    pub fn step(&self, cell: CellCoord, direction: Direction) -> CellCoord {
        let x = cell.x();
        let y = cell.y();
        match direction {
            Direction::North => CellCoord::new(x, (y + self.height - 1) % self.height),
            Direction::East => CellCoord::new((x + 1) % self.width, y),
            Direction::South => CellCoord::new(x, (y + 1) % self.height),
            Direction::West => CellCoord::new((x + self.width - 1) % self.width, y),
            Direction::Still => cell,
        }
    }

    /// The four cardinal neighbors of a cell in canonical order.
    #[must_use]
    pub fn neighbors(&self, cell: CellCoord) -> [(Direction, CellCoord); 4] {
        [
            (Direction::North, self.step(cell, Direction::North)),
            (Direction::East, self.step(cell, Direction::East)),
            (Direction::South, self.step(cell, Direction::South)),
            (Direction::West, self.step(cell, Direction::West)),
        ]
    }

    /// The four cardinal neighbors followed by the cell itself.
    ///
    /// This is the five-option candidate list move assignment ranks when a
    /// unit may also stand still.
    #[must_use]
    pub fn options(&self, cell: CellCoord) -> [(Direction, CellCoord); 5] {
        [
            (Direction::North, self.step(cell, Direction::North)),
            (Direction::East, self.step(cell, Direction::East)),
            (Direction::South, self.step(cell, Direction::South)),
            (Direction::West, self.step(cell, Direction::West)),
            (Direction::Still, cell),
        ]
    }

    /// Cells within Manhattan radius `radius` of the provided cell.
    ///
    /// The origin cell is included only when `include_self` is set.
    #[must_use]
    pub fn neighbors_within(
        &self,
        cell: CellCoord,
        radius: u16,
        include_self: bool,
    ) -> Vec<CellCoord> {
        let radius = i32::from(radius);
        let width = i32::from(self.width);
        let height = i32::from(self.height);
        let mut cells = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() + dy.abs() > radius {
                    continue;
                }
                if dx == 0 && dy == 0 && !include_self {
                    continue;
                }
                let x = (i32::from(cell.x()) + dx).rem_euclid(width) as u16;
                let y = (i32::from(cell.y()) + dy).rem_euclid(height) as u16;
                cells.push(CellCoord::new(x, y));
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_core::OwnerId;

    fn uniform_map(width: u16, height: u16) -> GameMap {
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
    fn steps_wrap_around_every_edge() {
        let map = uniform_map(4, 3);
        assert_eq!(
            map.step(CellCoord::new(0, 0), Direction::North),
            CellCoord::new(0, 2)
        );
        assert_eq!(
            map.step(CellCoord::new(0, 0), Direction::West),
            CellCoord::new(3, 0)
        );
        assert_eq!(
            map.step(CellCoord::new(3, 2), Direction::East),
            CellCoord::new(0, 2)
        );
        assert_eq!(
            map.step(CellCoord::new(3, 2), Direction::South),
            CellCoord::new(3, 0)
        );
        assert_eq!(
            map.step(CellCoord::new(1, 1), Direction::Still),
            CellCoord::new(1, 1)
        );
    }

    #[test]
    fn neighbors_enumerate_in_canonical_order() {
        let map = uniform_map(5, 5);
        let neighbors = map.neighbors(CellCoord::new(2, 2));
        assert_eq!(neighbors[0], (Direction::North, CellCoord::new(2, 1)));
        assert_eq!(neighbors[1], (Direction::East, CellCoord::new(3, 2)));
        assert_eq!(neighbors[2], (Direction::South, CellCoord::new(2, 3)));
        assert_eq!(neighbors[3], (Direction::West, CellCoord::new(1, 2)));

        let options = map.options(CellCoord::new(2, 2));
        assert_eq!(options[4], (Direction::Still, CellCoord::new(2, 2)));
    }

    #[test]
    fn radius_two_neighborhood_has_twelve_cells() {
        let map = uniform_map(7, 7);
        let ring = map.neighbors_within(CellCoord::new(3, 3), 2, false);
        assert_eq!(ring.len(), 12);
        assert!(!ring.contains(&CellCoord::new(3, 3)));

        let with_self = map.neighbors_within(CellCoord::new(3, 3), 2, true);
        assert_eq!(with_self.len(), 13);
        assert!(with_self.contains(&CellCoord::new(3, 3)));
    }

    #[test]
    fn radius_one_neighborhood_matches_cardinals() {
        let map = uniform_map(4, 4);
        let ring = map.neighbors_within(CellCoord::new(0, 0), 1, false);
        assert_eq!(ring.len(), 4);
        for (_, neighbor) in map.neighbors(CellCoord::new(0, 0)) {
            assert!(ring.contains(&neighbor));
        }
    }
}
