#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit move assignment over the potential field.
//!
//! Units are processed strongest first (ties go to the unit closest to the
//! frontier) in a single greedy pass. Each unit ranks its cardinal neighbors
//! by degraded potential plus congestion penalties, then runs a fixed cascade
//! of overrides: scheduler greenlights win unconditionally, safe melds and
//! redlights stay, danger near contested empties triggers a defensive
//! re-rank, unavoidable overflow falls back to a least-loss comparison, and
//! the remaining cases gate on capture viability or the interior strength
//! hurdle. Every decision feeds the destination ledger that later, weaker
//! units rank against.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use fieldbot_core::{
    CellCoord, DestinationLedger, Direction, Move, MoveSet, OwnerId, PotentialField, WaveSchedule,
    STRENGTH_CAP,
};
use fieldbot_world::{query, territory::Territory, GameMap};
use rand::Rng;

// Penalty weights are spaced so a higher tier always dominates a lower one.
const OVERFLOW_PENALTY: f64 = 10_000.0;
const DANGER_PENALTY: f64 = 5_000.0;
const WALL_ROUTE_PENALTY: f64 = 1e7;
const WEAK_CAPTURE_PENALTY: f64 = 100_000.0;
const LEAST_BAD_THRESHOLD: f64 = 9_000.0;
// Hold multiplier used while exploring uncontested ground.
const EXPLORATION_HOLD_UNTIL: u32 = 5;
// Grid area the interior percentile was calibrated against.
const REFERENCE_AREA: f64 = 2_500.0;

/// Tuning knobs for move assignment.
#[derive(Clone, Copy, Debug)]
pub struct AssignmentTuning {
    /// In combat, hold a cell still until strength reaches this multiple of
    /// its production.
    pub hold_until: u32,
    /// Keep `hold_until` fixed instead of dropping it while exploring.
    pub fixed_hold: bool,
    /// Maximum proportion of interior units allowed to move.
    pub interior_move_max: f64,
    /// Minimum proportion of interior units allowed to move.
    pub interior_move_min: f64,
    /// Hold cells that would otherwise over-extend between lurking enemies.
    pub strategic_stilling: bool,
}

impl Default for AssignmentTuning {
    fn default() -> Self {
        Self {
            hold_until: 7,
            fixed_hold: false,
            interior_move_max: 0.45,
            interior_move_min: 0.01,
            strategic_stilling: true,
        }
    }
}

impl AssignmentTuning {
    /// Hold multiplier in effect this turn.
    ///
    /// While no open empty cell borders our territory there is no combat to
    /// mass strength for, so the threshold relaxes to the exploration value
    /// unless pinned by `fixed_hold`.
    #[must_use]
    pub const fn effective_hold_until(&self, contact: bool) -> u32 {
        if self.fixed_hold || contact {
            self.hold_until
        } else {
            EXPLORATION_HOLD_UNTIL
        }
    }
}

/// One ranked destination option.
///
/// The random tiebreak comes from an injected source so equal costs carry no
/// directional bias and tests can reproduce a pass exactly.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    cost: f64,
    tiebreak: f64,
    direction: Direction,
    target: CellCoord,
}

impl Candidate {
    fn is_better_than(&self, other: &Candidate) -> bool {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.tiebreak.total_cmp(&other.tiebreak))
            == Ordering::Less
    }
}

/// Read-only inputs shared by every unit decided within one turn.
struct TurnContext<'a> {
    map: &'a GameMap,
    my_id: OwnerId,
    field: &'a PotentialField,
    schedule: &'a WaveSchedule,
    territory: &'a Territory,
    strategic_stilling: bool,
    hold_until: u32,
    strength_hurdle: u32,
}

/// Complete decision output for one turn.
#[derive(Clone, Debug)]
pub struct TurnPlan {
    moves: MoveSet,
    ledger: DestinationLedger,
    strength_hurdle: u32,
}

impl TurnPlan {
    /// Moves decided this turn, one per positive-strength owned cell.
    #[must_use]
    pub fn moves(&self) -> &MoveSet {
        &self.moves
    }

    /// Final destination ledger after every unit has pledged.
    #[must_use]
    pub fn ledger(&self) -> &DestinationLedger {
        &self.ledger
    }

    /// Interior strength hurdle applied this turn.
    #[must_use]
    pub const fn strength_hurdle(&self) -> u32 {
        self.strength_hurdle
    }
}

/// Percentile-derived strength below which interior units hold still.
///
/// Interior units are owned cells whose best-potential neighbor is also
/// owned. The cutoff slides with territory size: a small territory lets
/// nearly the maximum proportion move, a grid-filling one approaches the
/// minimum. No interior units at all means no hurdle.
#[must_use]
pub fn interior_strength_hurdle(
    map: &GameMap,
    field: &PotentialField,
    my_id: OwnerId,
    tuning: &AssignmentTuning,
) -> u32 {
    let mut interior: Vec<u8> = map
        .coords()
        .filter(|cell| map.at(*cell).owner == my_id)
        .filter(|cell| {
            let (_, toward) = query::steepest_neighbor(map, field, *cell);
            map.at(toward).owner == my_id
        })
        .map(|cell| map.at(cell).strength)
        .collect();
    if interior.is_empty() {
        return 0;
    }
    interior.sort_unstable_by(|a, b| b.cmp(a));

    let population = interior.len();
    let moving_fraction = (1.0 - population as f64 / REFERENCE_AREA)
        * (tuning.interior_move_max - tuning.interior_move_min)
        + tuning.interior_move_min;
    let index = ((population as f64 * moving_fraction) as usize).min(population - 1);
    u32::from(interior[index])
}

/// Decides every unit's move for the turn.
///
/// Units with zero strength receive no move. The ledger is threaded through
/// the pass so each decision sees the strength already pledged by stronger
/// units; staying pledges strength plus production to the unit's own cell.
pub fn plan_turn<R: Rng>(
    map: &GameMap,
    my_id: OwnerId,
    field: &PotentialField,
    schedule: &WaveSchedule,
    territory: &Territory,
    tuning: &AssignmentTuning,
    rng: &mut R,
) -> TurnPlan {
    let strength_hurdle = interior_strength_hurdle(map, field, my_id, tuning);
    let ctx = TurnContext {
        map,
        my_id,
        field,
        schedule,
        territory,
        strategic_stilling: tuning.strategic_stilling,
        hold_until: tuning.effective_hold_until(territory.contact()),
        strength_hurdle,
    };

    let mut units: Vec<CellCoord> = map
        .coords()
        .filter(|cell| {
            let state = map.at(*cell);
            state.owner == my_id && state.strength > 0
        })
        .collect();
    // Strongest first; equal strength moves the unit closest to the frontier
    // first. The sort is stable so remaining ties keep row-major order.
    units.sort_by(|a, b| {
        map.at(*b)
            .strength
            .cmp(&map.at(*a).strength)
            .then_with(|| field.friendly_distance(*a).cmp(&field.friendly_distance(*b)))
    });

    let mut moves = MoveSet::new();
    let mut ledger = DestinationLedger::new();
    for unit in units {
        let direction = assign_move(&ctx, unit, &ledger, rng);
        moves.set(Move::new(unit, direction));

        let target = map.step(unit, direction);
        let state = map.at(unit);
        let pledge = u32::from(state.strength)
            + if direction == Direction::Still {
                u32::from(state.production)
            } else {
                0
            };
        ledger.record(target, pledge, direction.opposite(), unit);
    }

    TurnPlan {
        moves,
        ledger,
        strength_hurdle,
    }
}

fn assign_move<R: Rng>(
    ctx: &TurnContext<'_>,
    unit: CellCoord,
    ledger: &DestinationLedger,
    rng: &mut R,
) -> Direction {
    if let Some(direction) = ctx.schedule.greenlight_direction(unit) {
        return direction;
    }

    let state = ctx.map.at(unit);
    let strength = u32::from(state.strength);
    let production = u32::from(state.production);

    let neighbors = ctx.map.neighbors(unit);
    let mut best = basic_candidate(ctx, ledger, strength, neighbors[0], rng);
    for option in neighbors.iter().skip(1) {
        let candidate = basic_candidate(ctx, ledger, strength, *option, rng);
        if candidate.is_better_than(&best) {
            best = candidate;
        }
    }

    let stay_loss = ((strength + production).min(STRENGTH_CAP) + ledger.incoming(unit))
        .saturating_sub(STRENGTH_CAP);
    if stay_loss == 0 && (ledger.incoming(unit) > 0 || ctx.schedule.is_redlit(unit)) {
        // Safely meld with everything already oncoming.
        return Direction::Still;
    }

    let dangers = dangerous_empties(ctx.map, ctx.my_id, unit, ledger);

    if ctx.strategic_stilling && stay_loss == 0 && dangers.is_empty() && overextension_lurks(ctx, unit)
    {
        return Direction::Still;
    }

    let target_zone_contested = ctx
        .map
        .options(best.target)
        .iter()
        .any(|(_, cell)| dangers.contains_key(cell));
    let holding_near_danger = strength < ctx.hold_until * production
        && ctx
            .map
            .neighbors(unit)
            .iter()
            .any(|(_, cell)| dangers.contains_key(cell));
    if target_zone_contested || holding_near_danger {
        let options = ctx.map.options(unit);
        let mut safest = guarded_candidate(ctx, ledger, strength, &dangers, options[0], rng);
        for option in options.iter().skip(1) {
            let candidate = guarded_candidate(ctx, ledger, strength, &dangers, *option, rng);
            if candidate.is_better_than(&safest) {
                safest = candidate;
            }
        }
        return safest.direction;
    }

    if stay_loss > 0 || best.cost > LEAST_BAD_THRESHOLD {
        // Overflow either way; keep whichever side saturates away less.
        let keep_if_stay = (strength + production + ledger.incoming(unit)).min(STRENGTH_CAP)
            + ledger.incoming(best.target).min(STRENGTH_CAP);
        let keep_if_move = ledger.incoming(unit).min(STRENGTH_CAP)
            + (ledger.incoming(best.target) + strength).min(STRENGTH_CAP);
        return if keep_if_stay > keep_if_move {
            Direction::Still
        } else {
            best.direction
        };
    }

    let target_state = ctx.map.at(best.target);
    if target_state.owner != ctx.my_id {
        let overtakes = strength == STRENGTH_CAP
            || strength + ledger.incoming(best.target) > u32::from(target_state.strength);
        if overtakes
            && strength >= 2 * production
            && (ledger.incoming(best.target) == 0 || strength >= ctx.hold_until * production)
        {
            return best.direction;
        }
    } else if strength >= ctx.strength_hurdle.max(ctx.hold_until * production) {
        return best.direction;
    }

    Direction::Still
}

/// Ranks one cardinal destination for the initial pass.
fn basic_candidate<R: Rng>(
    ctx: &TurnContext<'_>,
    ledger: &DestinationLedger,
    strength: u32,
    (direction, target): (Direction, CellCoord),
    rng: &mut R,
) -> Candidate {
    let overflow = (ledger.incoming(target) + strength).saturating_sub(STRENGTH_CAP);
    let mut cost = ctx.field.degraded(target) + OVERFLOW_PENALTY * f64::from(overflow);
    if ctx.territory.mining_remains() && ctx.territory.in_wall(target) {
        // Route around the wall only while there is still easier mining.
        cost += WALL_ROUTE_PENALTY;
    }
    Candidate {
        cost,
        tiebreak: rng.gen(),
        direction,
        target,
    }
}

/// Ranks one of the five options (stay included) under the defensive re-rank.
fn guarded_candidate<R: Rng>(
    ctx: &TurnContext<'_>,
    ledger: &DestinationLedger,
    strength: u32,
    dangers: &HashMap<CellCoord, u32>,
    (direction, target): (Direction, CellCoord),
    rng: &mut R,
) -> Candidate {
    let overflow = (ledger.incoming(target) + strength).saturating_sub(STRENGTH_CAP);
    let mut cost = ctx.field.degraded(target) + OVERFLOW_PENALTY * f64::from(overflow);
    if ledger.incoming(target) == 0 {
        // An unsupported destination pays for every dangerous empty it
        // touches; supported ones already have friendly strength arriving.
        let exposure: u32 = ctx
            .map
            .options(target)
            .iter()
            .map(|(_, cell)| dangers.get(cell).copied().unwrap_or(0))
            .sum();
        cost += DANGER_PENALTY * f64::from(exposure);
    }
    if ctx.territory.in_wall(target) {
        cost += WALL_ROUTE_PENALTY;
    }
    let target_state = ctx.map.at(target);
    if target_state.owner.is_neutral() && strength <= u32::from(target_state.strength) {
        cost += WEAK_CAPTURE_PENALTY;
    }
    Candidate {
        cost,
        tiebreak: rng.gen(),
        direction,
        target,
    }
}

/// Contested cells within two hops that the enemy could be handed.
///
/// A cell qualifies when it is open empty or enemy ground, a live enemy sits
/// in its five-cell zone, and friendly strength is already pledged into that
/// zone. The value is the capped enemy strength bearing on it.
fn dangerous_empties(
    map: &GameMap,
    my_id: OwnerId,
    unit: CellCoord,
    ledger: &DestinationLedger,
) -> HashMap<CellCoord, u32> {
    let mut dangers = HashMap::new();
    for cell in map.neighbors_within(unit, 2, false) {
        let state = map.at(cell);
        let enemy_ground = !state.owner.is_neutral() && state.owner != my_id;
        if !(state.is_open_empty() || enemy_ground) {
            continue;
        }
        let zone = map.options(cell);
        let threatened = zone.iter().any(|(_, nearby)| {
            let nearby_state = map.at(*nearby);
            !nearby_state.owner.is_neutral()
                && nearby_state.owner != my_id
                && nearby_state.strength > 0
        });
        let contested = zone.iter().any(|(_, nearby)| ledger.incoming(*nearby) > 0);
        if threatened && contested {
            let bearing: u32 = zone
                .iter()
                .filter(|(_, nearby)| {
                    let nearby_state = map.at(*nearby);
                    !nearby_state.owner.is_neutral() && nearby_state.owner != my_id
                })
                .map(|(_, nearby)| u32::from(map.at(*nearby).strength))
                .sum();
            let _ = dangers.insert(cell, bearing.min(STRENGTH_CAP));
        }
    }
    dangers
}

/// Whether stepping out would expose the unit between multiple lurking
/// enemies: more than one open empty neighbor, collectively adjacent to more
/// than one enemy cell already holding three turns of production.
fn overextension_lurks(ctx: &TurnContext<'_>, unit: CellCoord) -> bool {
    let open_neighbors: Vec<CellCoord> = ctx
        .map
        .neighbors(unit)
        .iter()
        .filter(|(_, neighbor)| ctx.map.at(*neighbor).is_open_empty())
        .map(|(_, neighbor)| *neighbor)
        .collect();
    if open_neighbors.len() < 2 {
        return false;
    }

    let mut lurkers: HashSet<CellCoord> = HashSet::new();
    for open in &open_neighbors {
        for (_, cell) in ctx.map.neighbors(*open) {
            let state = ctx.map.at(cell);
            if !state.owner.is_neutral()
                && state.owner != ctx.my_id
                && u32::from(state.strength) >= 3 * u32::from(state.production)
            {
                let _ = lurkers.insert(cell);
            }
        }
    }
    lurkers.len() > 1
}
