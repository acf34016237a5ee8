#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the fieldbot engine.
//!
//! This crate defines the turn-scoped value types that connect the world
//! snapshot, the pure decision systems, and the wire adapter: grid identity
//! and cell state, the potential field produced by the builder system, the
//! destination ledger threaded through move assignment, and the move set
//! submitted at the end of every turn. All of these are rebuilt from scratch
//! each turn; nothing in this crate carries state across turns.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Saturation cap on per-cell strength enforced by the game rules.
pub const STRENGTH_CAP: u32 = 255;

/// Identifier assigned to a player by the game engine.
///
/// Owner `0` is the neutral "map" player; unclaimed cells belong to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(u8);

impl OwnerId {
    /// Owner of every unclaimed cell.
    pub const NEUTRAL: OwnerId = OwnerId(0);

    /// Creates a new owner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Reports whether this is the neutral map owner.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.0 == 0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The grid is a torus; wraparound arithmetic lives in the world crate, which
/// knows the grid dimensions. Coordinates themselves are plain identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u16,
    y: u16,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u16 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }
}

/// Per-turn snapshot of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    /// Player that owns the cell; [`OwnerId::NEUTRAL`] when unclaimed.
    pub owner: OwnerId,
    /// Current strength of the cell, saturating at [`STRENGTH_CAP`].
    pub strength: u8,
    /// Strength gained per turn by the occupying player.
    pub production: u8,
}

impl CellState {
    /// Reports whether the cell is unclaimed with zero strength.
    #[must_use]
    pub const fn is_open_empty(&self) -> bool {
        self.owner.is_neutral() && self.strength == 0
    }
}

/// Directions a unit may take on its turn.
///
/// Cardinal ordering (north, east, south, west) matches the neighbor
/// enumeration order used throughout the engine; `Still` always ranks last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// No movement this turn.
    Still,
}

impl Direction {
    /// The four cardinal directions in canonical enumeration order.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Returns the direction pointing back at the origin of a move.
    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Still => Direction::Still,
        }
    }

    /// Numeric code used by the wire protocol when submitting moves.
    #[must_use]
    pub const fn wire_code(self) -> u8 {
        match self {
            Direction::Still => 0,
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 3,
            Direction::West => 4,
        }
    }
}

/// A single unit's decision for the turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Cell occupied by the deciding unit.
    pub cell: CellCoord,
    /// Direction the unit commits to this turn.
    pub direction: Direction,
}

impl Move {
    /// Creates a move for the provided unit cell.
    #[must_use]
    pub const fn new(cell: CellCoord, direction: Direction) -> Self {
        Self { cell, direction }
    }
}

/// Per-turn move collection keyed by unit identity.
///
/// Keying by cell enforces the at-most-one-move-per-unit invariant by
/// construction; assigning a second move for the same cell replaces the
/// first. Iteration order is deterministic (sorted by coordinate).
#[derive(Clone, Debug, Default)]
pub struct MoveSet {
    moves: BTreeMap<CellCoord, Direction>,
}

impl MoveSet {
    /// Creates an empty move set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the move for its unit, replacing any earlier decision.
    pub fn set(&mut self, decided: Move) {
        let _ = self.moves.insert(decided.cell, decided.direction);
    }

    /// Direction recorded for the provided unit, if any.
    #[must_use]
    pub fn direction_of(&self, cell: CellCoord) -> Option<Direction> {
        self.moves.get(&cell).copied()
    }

    /// Number of units with a recorded move.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Reports whether no moves have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Iterator over the recorded moves in deterministic coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.moves
            .iter()
            .map(|(cell, direction)| Move::new(*cell, *direction))
    }
}

/// Applies the convex friendly-distance penalty to a raw potential.
#[must_use]
pub fn degrade_potential(potential: f64, friendly_distance: u16, step: f64) -> f64 {
    potential + step * f64::from(friendly_distance).powi(2)
}

/// Potential and friendly distance finalized for a single cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PotentialEntry {
    /// Raw scalar potential of the cell; lower is better, may be infinite.
    pub value: f64,
    /// Hop count from the nearest non-owned territory into our own.
    pub friendly_distance: u16,
}

/// Dense per-turn potential field covering every cell of the grid.
///
/// The field owns the degradation step it was built with so consumers rank
/// cells by [`PotentialField::degraded`] without re-threading tuning.
#[derive(Clone, Debug)]
pub struct PotentialField {
    width: u16,
    height: u16,
    degradation_step: f64,
    entries: Vec<PotentialEntry>,
}

impl PotentialField {
    /// Assembles a field from finalized entries stored in row-major order.
    #[must_use]
    pub fn from_entries(
        width: u16,
        height: u16,
        degradation_step: f64,
        entries: Vec<PotentialEntry>,
    ) -> Self {
        debug_assert_eq!(
            entries.len(),
            usize::from(width) * usize::from(height),
            "potential field must cover every cell"
        );
        Self {
            width,
            height,
            degradation_step,
            entries,
        }
    }

    /// Width of the field in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height of the field in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Degradation step the field was built with.
    #[must_use]
    pub const fn degradation_step(&self) -> f64 {
        self.degradation_step
    }

    /// Entry finalized for the provided cell, if it lies within the field.
    #[must_use]
    pub fn entry(&self, cell: CellCoord) -> Option<&PotentialEntry> {
        self.index(cell).and_then(|index| self.entries.get(index))
    }

    /// Distance-degraded potential of the cell.
    ///
    /// Cells outside the field rank as infinitely poor so malformed lookups
    /// can never attract a unit.
    #[must_use]
    pub fn degraded(&self, cell: CellCoord) -> f64 {
        self.entry(cell).map_or(f64::INFINITY, |entry| {
            degrade_potential(entry.value, entry.friendly_distance, self.degradation_step)
        })
    }

    /// Friendly distance finalized for the cell; zero outside the field.
    #[must_use]
    pub fn friendly_distance(&self, cell: CellCoord) -> u16 {
        self.entry(cell).map_or(0, |entry| entry.friendly_distance)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.x() < self.width && cell.y() < self.height {
            Some(usize::from(cell.y()) * usize::from(self.width) + usize::from(cell.x()))
        } else {
            None
        }
    }
}

/// Per-turn hold/commit tags produced by the attack-wave scheduler.
///
/// The two sets partition (without necessarily covering) the owned cells
/// captured by the scheduler's forest: redlit cells must hold this turn,
/// greenlit cells must commit toward their forest parent, and untagged cells
/// keep their free choice in move assignment. The default value constrains
/// nothing, which is also how a disabled scheduler presents itself.
#[derive(Clone, Debug, Default)]
pub struct WaveSchedule {
    redlight: HashSet<CellCoord>,
    greenlight: HashMap<CellCoord, Direction>,
}

impl WaveSchedule {
    /// Assembles a schedule from the scheduler's hold and commit sets.
    #[must_use]
    pub fn from_parts(
        redlight: HashSet<CellCoord>,
        greenlight: HashMap<CellCoord, Direction>,
    ) -> Self {
        debug_assert!(
            greenlight.keys().all(|cell| !redlight.contains(cell)),
            "a cell cannot both hold and commit"
        );
        Self {
            redlight,
            greenlight,
        }
    }

    /// Reports whether the cell must hold this turn.
    #[must_use]
    pub fn is_redlit(&self, cell: CellCoord) -> bool {
        self.redlight.contains(&cell)
    }

    /// Commit direction for the cell, when it is greenlit.
    #[must_use]
    pub fn greenlight_direction(&self, cell: CellCoord) -> Option<Direction> {
        self.greenlight.get(&cell).copied()
    }

    /// Number of cells told to hold.
    #[must_use]
    pub fn redlit_count(&self) -> usize {
        self.redlight.len()
    }

    /// Number of cells told to commit.
    #[must_use]
    pub fn greenlit_count(&self) -> usize {
        self.greenlight.len()
    }

    /// Reports whether the schedule constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.redlight.is_empty() && self.greenlight.is_empty()
    }
}

/// Running per-target accumulation of strength pledged within the turn.
///
/// Incoming totals may provisionally exceed [`STRENGTH_CAP`]; overflow is a
/// ranking signal consumed by move assignment, never an error. Origins record
/// the reverse direction back toward each pledging unit.
#[derive(Clone, Debug, Default)]
pub struct DestinationLedger {
    incoming: HashMap<CellCoord, u32>,
    origins: HashMap<CellCoord, Vec<(Direction, CellCoord)>>,
}

impl DestinationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strength already pledged toward the provided target this turn.
    #[must_use]
    pub fn incoming(&self, target: CellCoord) -> u32 {
        self.incoming.get(&target).copied().unwrap_or(0)
    }

    /// Records a pledge of `amount` strength toward `target`.
    ///
    /// `reverse` is the direction from the target back toward the pledging
    /// `origin` unit.
    pub fn record(&mut self, target: CellCoord, amount: u32, reverse: Direction, origin: CellCoord) {
        *self.incoming.entry(target).or_insert(0) += amount;
        self.origins
            .entry(target)
            .or_default()
            .push((reverse, origin));
    }

    /// Units that pledged toward the target, with reverse directions.
    #[must_use]
    pub fn origins(&self, target: CellCoord) -> &[(Direction, CellCoord)] {
        self.origins.get(&target).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        degrade_potential, CellCoord, CellState, DestinationLedger, Direction, Move, MoveSet,
        OwnerId,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn owner_id_round_trips_through_bincode() {
        assert_round_trip(&OwnerId::new(3));
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(12, 47));
    }

    #[test]
    fn move_round_trips_through_bincode() {
        assert_round_trip(&Move::new(CellCoord::new(1, 2), Direction::West));
    }

    #[test]
    fn cell_state_round_trips_through_bincode() {
        assert_round_trip(&CellState {
            owner: OwnerId::new(2),
            strength: 128,
            production: 5,
        });
    }

    #[test]
    fn opposites_invert_every_direction() {
        for direction in Direction::CARDINALS {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
        assert_eq!(Direction::Still.opposite(), Direction::Still);
    }

    #[test]
    fn wire_codes_match_protocol_encoding() {
        assert_eq!(Direction::Still.wire_code(), 0);
        assert_eq!(Direction::North.wire_code(), 1);
        assert_eq!(Direction::East.wire_code(), 2);
        assert_eq!(Direction::South.wire_code(), 3);
        assert_eq!(Direction::West.wire_code(), 4);
    }

    #[test]
    fn move_set_keeps_one_move_per_unit() {
        let unit = CellCoord::new(4, 4);
        let mut moves = MoveSet::new();
        moves.set(Move::new(unit, Direction::North));
        moves.set(Move::new(unit, Direction::Still));

        assert_eq!(moves.len(), 1);
        assert_eq!(moves.direction_of(unit), Some(Direction::Still));
    }

    #[test]
    fn ledger_accumulates_incoming_strength() {
        let target = CellCoord::new(2, 3);
        let mut ledger = DestinationLedger::new();
        ledger.record(target, 200, Direction::South, CellCoord::new(2, 2));
        ledger.record(target, 90, Direction::West, CellCoord::new(3, 3));

        assert_eq!(ledger.incoming(target), 290);
        assert_eq!(ledger.incoming(CellCoord::new(0, 0)), 0);
        assert_eq!(ledger.origins(target).len(), 2);
        assert_eq!(ledger.origins(target)[0], (Direction::South, CellCoord::new(2, 2)));
        assert!(ledger.origins(CellCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn degradation_grows_quadratically_with_distance() {
        assert_eq!(degrade_potential(1.0, 0, 0.2), 1.0);
        assert_eq!(degrade_potential(1.0, 1, 0.2), 1.2);
        assert_eq!(degrade_potential(1.0, 3, 0.2), 1.0 + 0.2 * 9.0);
        assert!(degrade_potential(f64::INFINITY, 2, 0.2).is_infinite());
    }
}
