//! Headless reel machine simulator
//!
//! Usage:
//!   rf-reel-sim --rounds 100 --seed 42
//!   rf-reel-sim --config machine.yaml --profile turbo
//!   rf-reel-sim --test-mode --fps 30
//!
//! Set RUST_LOG=info to see per-round outcomes, RUST_LOG=debug for reel events.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use serde::Serialize;

use rf_reel_machine::{
    Machine, MachineConfig, NamedCatalog, RoundObserver, SessionStats, TimingProfile,
};

/// Ticks allowed per round before the run is declared stuck
const MAX_TICKS_PER_ROUND: u64 = 1_000_000;

#[derive(Parser)]
#[command(name = "rf-reel-sim", about = "Run spin rounds headlessly and report session stats")]
struct Cli {
    /// Machine config file (.json, .yaml or .yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rounds to play
    #[arg(short, long, default_value_t = 10)]
    rounds: u64,

    /// RNG seed (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Timing profile (overrides the config file)
    #[arg(short, long, value_enum)]
    profile: Option<ProfileArg>,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Force a win every round
    #[arg(long)]
    test_mode: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    Normal,
    Turbo,
    Studio,
}

impl From<ProfileArg> for TimingProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Normal => TimingProfile::Normal,
            ProfileArg::Turbo => TimingProfile::Turbo,
            ProfileArg::Studio => TimingProfile::Studio,
        }
    }
}

/// Logs win effects and round completion
#[derive(Default)]
struct LoggingObserver {
    effects: usize,
}

impl RoundObserver for LoggingObserver {
    fn play_win_effect(&mut self, reel: usize, row: usize) {
        self.effects += 1;
        debug!("[Sim] win effect on reel {} row {}", reel, row);
    }

    fn on_round_complete(&mut self, won: bool) {
        debug!("[Sim] round complete, won={}", won);
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    profile: TimingProfile,
    seed: Option<u64>,
    simulated_secs: f64,
    win_effects: usize,
    hit_rate: f64,
    stats: &'a SessionStats,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.fps.is_finite() || cli.fps <= 0.0 {
        bail!("--fps must be positive, got {}", cli.fps);
    }

    let mut config = match &cli.config {
        Some(path) => MachineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MachineConfig::default(),
    };
    if let Some(profile) = cli.profile {
        config = config.with_timing_profile(profile.into());
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let catalog = NamedCatalog::standard(config.catalog_size);
    let mut machine = Machine::new(config, catalog, LoggingObserver::default())
        .context("Failed to build machine")?;

    let dt = 1.0 / cli.fps;
    let mut simulated_secs = 0.0;

    for _ in 0..cli.rounds {
        machine.spin_round(cli.test_mode)?;
        let mut ticks = 0u64;
        let outcome = loop {
            ticks += 1;
            simulated_secs += dt;
            if let Some(outcome) = machine.tick(dt)? {
                break outcome;
            }
            if ticks >= MAX_TICKS_PER_ROUND {
                bail!("Round stuck in {:?} after {} ticks", machine.phase(), ticks);
            }
        };

        let symbols: Vec<String> = outcome
            .line
            .iter()
            .flat_map(|line| line.rows.iter().enumerate())
            .filter_map(|(reel, &row)| outcome.grid.symbol_at(reel, row))
            .filter_map(|symbol| machine.catalog().name(symbol).map(str::to_owned))
            .collect();

        info!(
            "[Sim] round {}: {} rows={:?} {}",
            outcome.round,
            if outcome.won { "WIN" } else { "no win" },
            outcome.winning_rows,
            symbols.join(" ")
        );
    }

    let summary = Summary {
        profile: machine.config().timing.profile,
        seed: machine.config().seed,
        simulated_secs,
        win_effects: machine.observer().effects,
        hit_rate: machine.stats().hit_rate(),
        stats: machine.stats(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );

    Ok(())
}
