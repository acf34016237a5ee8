#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Attack-wave scheduling over a potential-derived spanning forest.
//!
//! Every owned cell funnels toward its best-ranked neighbor. Inverting those
//! parent edges yields one tree per frontier root worth attacking (an
//! unclaimed cell with positive strength). Walking each tree outward from the
//! root, layers that cannot yet overcome the root are told to hold
//! (redlight) while their production accrues; the first layer whose strength
//! tips the accumulated total past the root is told to commit now
//! (greenlight), producing a synchronized breakthrough instead of a dribble
//! of losing attacks.

use std::collections::{HashMap, HashSet, VecDeque};

use fieldbot_core::{CellCoord, Direction, OwnerId, PotentialField, WaveSchedule};
use fieldbot_world::{query, GameMap};

#[derive(Clone, Debug)]
struct ForestNode {
    cell: CellCoord,
    toward_parent: Direction,
    depth: u16,
}

#[derive(Clone, Debug)]
struct Tree {
    root: CellCoord,
    /// Member node indices in breadth-first order; depth never decreases.
    members: Vec<usize>,
}

/// Spanning forest of owned cells rooted at attackable frontier cells.
///
/// Nodes live in an index arena and are traversed iteratively; the structure
/// is rebuilt from scratch every turn and holds no cross-turn state.
#[derive(Clone, Debug, Default)]
pub struct AttackForest {
    nodes: Vec<ForestNode>,
    trees: Vec<Tree>,
    lookup: HashMap<CellCoord, usize>,
}

impl AttackForest {
    /// Derives the forest from this turn's snapshot and potential field.
    ///
    /// Each owned cell's parent is its lowest-degraded-potential neighbor.
    /// Roots are parent cells that are not themselves owned, restricted to
    /// unclaimed cells with positive strength, the genuine attack targets.
    /// Owned cells funneling toward anything else stay out of the forest and
    /// keep their free choice in move assignment.
    #[must_use]
    pub fn build(map: &GameMap, field: &PotentialField, my_id: OwnerId) -> Self {
        let mut children_of: HashMap<CellCoord, Vec<(CellCoord, Direction)>> = HashMap::new();
        for cell in map.coords() {
            if map.at(cell).owner != my_id {
                continue;
            }
            let (direction, parent) = query::steepest_neighbor(map, field, cell);
            children_of.entry(parent).or_default().push((cell, direction));
        }

        let mut forest = AttackForest::default();
        for cell in map.coords() {
            let state = map.at(cell);
            if state.owner != my_id && state.owner.is_neutral() && state.strength > 0 {
                if let Some(first_layer) = children_of.get(&cell) {
                    forest.grow_tree(cell, first_layer, &children_of);
                }
            }
        }
        forest
    }

    fn grow_tree(
        &mut self,
        root: CellCoord,
        first_layer: &[(CellCoord, Direction)],
        children_of: &HashMap<CellCoord, Vec<(CellCoord, Direction)>>,
    ) {
        let mut members = Vec::new();
        let mut queue = VecDeque::new();
        for (cell, direction) in first_layer {
            queue.push_back((*cell, *direction, 1u16));
        }

        while let Some((cell, toward_parent, depth)) = queue.pop_front() {
            let index = self.nodes.len();
            self.nodes.push(ForestNode {
                cell,
                toward_parent,
                depth,
            });
            let _ = self.lookup.insert(cell, index);
            members.push(index);

            if let Some(children) = children_of.get(&cell) {
                for (child, direction) in children {
                    queue.push_back((*child, *direction, depth + 1));
                }
            }
        }

        self.trees.push(Tree { root, members });
    }

    /// Number of trees in the forest.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Iterator over the frontier roots, one per tree.
    pub fn roots(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.trees.iter().map(|tree| tree.root)
    }

    /// Total number of owned cells captured by the forest.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the cell within its tree (roots sit at depth zero).
    #[must_use]
    pub fn depth_of(&self, cell: CellCoord) -> Option<u16> {
        self.lookup.get(&cell).map(|index| self.nodes[*index].depth)
    }

    /// Direction from the cell toward its forest parent.
    #[must_use]
    pub fn parent_direction(&self, cell: CellCoord) -> Option<Direction> {
        self.lookup
            .get(&cell)
            .map(|index| self.nodes[*index].toward_parent)
    }
}

/// Walks every tree and tags layers as hold or commit.
///
/// Accumulation works outward from the root: a held layer contributes its
/// strength plus the production already accrued by closer layers. The first
/// layer whose strength tips the running total past the root's strength is
/// greenlit, trimmed smallest-first so no more strength commits than the
/// breakthrough needs. Layers beyond it stay untagged.
#[must_use]
pub fn schedule_waves(map: &GameMap, forest: &AttackForest) -> WaveSchedule {
    let mut redlight: HashSet<CellCoord> = HashSet::new();
    let mut greenlight: HashMap<CellCoord, Direction> = HashMap::new();

    for tree in &forest.trees {
        let root_strength = u32::from(map.at(tree.root).strength);
        let mut accum_strength = 0u32;
        let mut accum_production = 0u32;

        let mut cursor = 0usize;
        while cursor < tree.members.len() {
            let depth = forest.nodes[tree.members[cursor]].depth;
            let mut layer = Vec::new();
            while cursor < tree.members.len() {
                let node = &forest.nodes[tree.members[cursor]];
                if node.depth != depth {
                    break;
                }
                layer.push(node);
                cursor += 1;
            }

            let mut layer_strength: u32 = layer
                .iter()
                .map(|node| u32::from(map.at(node.cell).strength))
                .sum();
            let layer_production: u32 = layer
                .iter()
                .map(|node| u32::from(map.at(node.cell).production))
                .sum();

            if accum_strength + accum_production > root_strength {
                // Closer layers already muster enough; the rest stay free.
                break;
            } else if layer_strength + accum_strength + accum_production > root_strength {
                layer.sort_by(|a, b| {
                    map.at(b.cell).strength.cmp(&map.at(a.cell).strength)
                });
                while let Some(last) = layer.last() {
                    let last_strength = u32::from(map.at(last.cell).strength);
                    if layer_strength + accum_strength + accum_production - last_strength
                        > root_strength
                    {
                        layer_strength -= last_strength;
                        let _ = layer.pop();
                    } else {
                        break;
                    }
                }
                for node in layer {
                    let _ = greenlight.insert(node.cell, node.toward_parent);
                }
                break;
            } else {
                accum_strength += layer_strength + accum_production;
                accum_production += layer_production;
                for node in layer {
                    let _ = redlight.insert(node.cell);
                }
            }
        }
    }

    WaveSchedule::from_parts(redlight, greenlight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_core::{CellState, PotentialEntry};

    const ME: OwnerId = OwnerId::new(1);

    fn cell(owner: OwnerId, strength: u8, production: u8) -> CellState {
        CellState {
            owner,
            strength,
            production,
        }
    }

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

    /// Vertical chain: root at (0,0), our units below it in a 1-wide column
    /// would wrap, so use a 3-wide map with inert flanks instead.
    fn chain_map(root_strength: u8, unit_strengths: &[u8], production: u8) -> (GameMap, PotentialField) {
        let height = (unit_strengths.len() + 2) as u16;
        let width = 3u16;
        let mut cells = vec![cell(OwnerId::NEUTRAL, 0, 0); usize::from(width * height)];
        let column = 1usize;
        cells[column] = cell(OwnerId::NEUTRAL, root_strength, 1);
        for (offset, strength) in unit_strengths.iter().enumerate() {
            cells[column + (offset + 1) * usize::from(width)] = cell(ME, *strength, production);
        }
        let map = GameMap::from_cells(width, height, cells);

        // Potential rises with row index so every unit's best neighbor is the
        // cell directly north of it, chaining up to the root.
        let mut values = Vec::with_capacity(map.cell_count());
        for y in 0..height {
            for x in 0..width {
                let value = f64::from(y) + if x == 1 { 0.0 } else { 100.0 };
                values.push(value);
            }
        }
        (map, field_from_values(width, height, &values))
    }

    #[test]
    fn forest_nodes_have_one_parent_and_valid_roots() {
        let (map, field) = chain_map(60, &[20, 20, 20], 3);
        let forest = AttackForest::build(&map, &field, ME);

        assert_eq!(forest.tree_count(), 1);
        let root = forest.roots().next().expect("root");
        assert_eq!(root, CellCoord::new(1, 0));
        assert!(map.at(root).owner.is_neutral());
        assert!(map.at(root).strength > 0);
        assert_eq!(forest.member_count(), 3);
        assert_eq!(forest.depth_of(CellCoord::new(1, 1)), Some(1));
        assert_eq!(forest.depth_of(CellCoord::new(1, 2)), Some(2));
        assert_eq!(forest.depth_of(CellCoord::new(1, 3)), Some(3));
        for y in 1..=3 {
            assert_eq!(
                forest.parent_direction(CellCoord::new(1, y)),
                Some(Direction::North)
            );
        }
    }

    #[test]
    fn zero_strength_roots_grow_no_tree() {
        let (map, field) = chain_map(0, &[20, 20], 3);
        let forest = AttackForest::build(&map, &field, ME);

        assert_eq!(forest.tree_count(), 0);
        let schedule = schedule_waves(&map, &forest);
        assert!(schedule.is_empty());
    }

    #[test]
    fn layers_hold_until_one_can_tip_the_total() {
        // Root 60; layer strengths 20 / 50 / 20 with production 5.
        // Layer 1 alone cannot win (20 < 60) so it holds. Layer 2 tips the
        // running total to 50 + 20 + 5 = 75 > 60 and commits. Layer 3 is
        // beyond the breakthrough and stays untagged.
        let (map, field) = chain_map(60, &[20, 50, 20], 5);
        let forest = AttackForest::build(&map, &field, ME);
        let schedule = schedule_waves(&map, &forest);

        assert!(schedule.is_redlit(CellCoord::new(1, 1)));
        assert_eq!(
            schedule.greenlight_direction(CellCoord::new(1, 2)),
            Some(Direction::North)
        );
        assert!(!schedule.is_redlit(CellCoord::new(1, 3)));
        assert_eq!(schedule.greenlight_direction(CellCoord::new(1, 3)), None);
        assert_eq!(schedule.redlit_count(), 1);
        assert_eq!(schedule.greenlit_count(), 1);
    }

    #[test]
    fn satisfied_accumulation_frees_later_layers() {
        // Root 10; layer 1 strength 9, production 2. Held once, the running
        // total 9 + 2 exceeds the root, so layer 2 is neither red nor green.
        let (map, field) = chain_map(10, &[9, 30], 2);
        let forest = AttackForest::build(&map, &field, ME);
        let schedule = schedule_waves(&map, &forest);

        assert!(schedule.is_redlit(CellCoord::new(1, 1)));
        assert!(!schedule.is_redlit(CellCoord::new(1, 2)));
        assert_eq!(schedule.greenlight_direction(CellCoord::new(1, 2)), None);
    }

    #[test]
    fn greenlit_layer_sheds_unneeded_weak_cells() {
        // Root 100 at (1,0); a 60-strength trunk at (1,1) with a 90 and a 10
        // flanking it at depth 2. The depth-2 layer overshoots enough that
        // the 10-strength cell can be shed before the commit.
        let width = 3u16;
        let height = 3u16;
        let mut cells = vec![cell(OwnerId::NEUTRAL, 0, 0); 9];
        cells[1] = cell(OwnerId::NEUTRAL, 100, 1); // root at (1,0)
        cells[3] = cell(ME, 90, 1); // (0,1)
        cells[4] = cell(ME, 60, 1); // (1,1)
        cells[5] = cell(ME, 10, 1); // (2,1)
        let map = GameMap::from_cells(width, height, cells);
        // Gradient funnels both flanks into (1,1) and (1,1) into the root.
        let values = vec![
            50.0, 0.0, 50.0, //
            10.0, 5.0, 10.0, //
            90.0, 90.0, 90.0,
        ];
        let field = field_from_values(width, height, &values);
        let forest = AttackForest::build(&map, &field, ME);

        // (1,1) parents to (1,0) the root; (0,1) and (2,1) parent to (1,1).
        assert_eq!(forest.tree_count(), 1);
        assert_eq!(forest.depth_of(CellCoord::new(1, 1)), Some(1));
        assert_eq!(forest.depth_of(CellCoord::new(0, 1)), Some(2));
        assert_eq!(forest.depth_of(CellCoord::new(2, 1)), Some(2));

        let schedule = schedule_waves(&map, &forest);
        // Layer 1 holds (60 < 100, production 1 accrues). Layer 2 brings
        // 100 + 60 + 1 = 161 > 100; shedding the 10 still leaves 151 > 100,
        // shedding the 90 would not, so exactly the 90 commits.
        assert!(schedule.is_redlit(CellCoord::new(1, 1)));
        assert_eq!(
            schedule.greenlight_direction(CellCoord::new(0, 1)),
            Some(Direction::East)
        );
        assert_eq!(schedule.greenlight_direction(CellCoord::new(2, 1)), None);
        assert!(!schedule.is_redlit(CellCoord::new(2, 1)));
    }
}
