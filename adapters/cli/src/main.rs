#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line agent speaking the turn protocol on stdin/stdout.
//!
//! Stdout belongs to the game engine, so diagnostics go to a per-bot log
//! file via `tracing`. Each turn runs the full decision pipeline: survey the
//! territory, build the potential field, schedule attack waves, and assign
//! one move per unit.

use std::io::{self, BufReader};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use fieldbot_core::WaveSchedule;
use fieldbot_system_assignment::{plan_turn, AssignmentTuning};
use fieldbot_system_potential_field::{build_field, FieldTuning};
use fieldbot_system_wave_scheduler::{schedule_waves, AttackForest};
use fieldbot_world::territory::{SeenOwners, Territory};

mod protocol;

use protocol::GameConnection;

/// Turn-based grid agent driven by a potential field.
#[derive(Debug, Parser)]
#[command(name = "fieldbot")]
struct Args {
    /// Name announced to the game engine; also names the log file.
    #[arg(long, default_value = "fieldbot")]
    name: String,

    /// Smoothing factor blending payback into relaxed potentials.
    #[arg(long, default_value_t = 0.10)]
    alpha: f64,

    /// Convex per-hop penalty on potential inside our territory.
    #[arg(long, default_value_t = 0.2)]
    potential_degradation_step: f64,

    /// Potential contributed per enemy adjacent to an empty cell.
    #[arg(long, default_value_t = -0.5, allow_hyphen_values = true)]
    enemy_roi: f64,

    /// Keep the hold threshold fixed instead of relaxing while exploring.
    #[arg(long)]
    fixed_hold: bool,

    /// In combat, hold a cell until strength reaches this multiple of its
    /// production.
    #[arg(long, default_value_t = 7)]
    hold_until: u32,

    /// Max proportion of interior pieces allowed to move.
    #[arg(long, default_value_t = 0.45)]
    int_max: f64,

    /// Min proportion of interior pieces allowed to move.
    #[arg(long, default_value_t = 0.01)]
    int_min: f64,

    /// Disable strategic stilling.
    #[arg(long)]
    no_strategic_stilling: bool,

    /// Disable attack-wave scheduling.
    #[arg(long)]
    no_wave_scheduling: bool,

    /// Seed for the ranking tiebreak source; drawn from entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

/// Entry point for the fieldbot command-line agent.
fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = format!("{}.log", args.name);
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("creating log file {log_path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    debug!(?args, "starting");

    let field_tuning = FieldTuning {
        alpha: args.alpha,
        degradation_step: args.potential_degradation_step,
        enemy_roi: args.enemy_roi,
    };
    let assignment_tuning = AssignmentTuning {
        hold_until: args.hold_until,
        fixed_hold: args.fixed_hold,
        interior_move_max: args.int_max,
        interior_move_min: args.int_min,
        strategic_stilling: !args.no_strategic_stilling,
    };
    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut connection = GameConnection::new(BufReader::new(stdin.lock()), stdout.lock());

    let handshake = connection.handshake()?;
    connection.announce(&args.name)?;
    debug!(
        my_id = handshake.my_id.get(),
        width = handshake.width,
        height = handshake.height,
        "handshake complete"
    );

    let mut seen = SeenOwners::new(handshake.my_id);
    let mut turn = 0u32;
    while let Some(map) =
        connection.next_frame(handshake.width, handshake.height, &handshake.production)?
    {
        let started = Instant::now();

        seen = seen.observe(&map, handshake.my_id);
        let territory = Territory::survey(&map, handshake.my_id, &seen);
        let field = build_field(&map, handshake.my_id, &territory, &field_tuning, &mut rng);
        let schedule = if args.no_wave_scheduling {
            WaveSchedule::default()
        } else {
            let forest = AttackForest::build(&map, &field, handshake.my_id);
            schedule_waves(&map, &forest)
        };
        let plan = plan_turn(
            &map,
            handshake.my_id,
            &field,
            &schedule,
            &territory,
            &assignment_tuning,
            &mut rng,
        );
        connection.submit(plan.moves())?;

        debug!(
            turn,
            elapsed_ms = started.elapsed().as_millis() as u64,
            moves = plan.moves().len(),
            redlit = schedule.redlit_count(),
            greenlit = schedule.greenlit_count(),
            hurdle = plan.strength_hurdle(),
            "turn complete"
        );
        turn += 1;
    }

    debug!(turn, "engine hung up");
    Ok(())
}
