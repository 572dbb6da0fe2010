//! Fleet bot binary.
//!
//! Plays a game over JSON lines on stdin/stdout, verifies recorded replays,
//! and prints the default tuning configuration.
//!
//! # Usage
//!
//! ```bash
//! # Play, reading turns from stdin
//! cargo run -p fleet_bot
//!
//! # Play with tuning from a RON file, recording the session
//! cargo run -p fleet_bot -- run --config tuning.ron --record game.replay
//!
//! # Check that a recording reproduces
//! cargo run -p fleet_bot -- replay game.replay --verify
//!
//! # Write the default configuration as a starting point
//! cargo run -p fleet_bot -- config --output tuning.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON messages, one per line
//! Output (stdout): JSON messages, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for the message format.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_bot::{BotRunner, Result, RunnerOptions};
use fleet_core::config::EngineConfig;
use fleet_core::replay::Replay;

#[derive(Parser)]
#[command(name = "fleet_bot")]
#[command(about = "Per-turn fleet decision engine over JSON lines")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game over stdin/stdout
    Run {
        /// RON file with engine tuning constants
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-turn time budget in milliseconds (overrides the config)
        #[arg(long)]
        budget_ms: Option<u64>,

        /// Output cost fields after every turn
        #[arg(long)]
        emit_fields: bool,

        /// Save a replay of the session to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Re-play a recorded game
    Replay {
        /// Replay file path
        file: PathBuf,

        /// Compare every re-played plan against the recording
        #[arg(long)]
        verify: bool,
    },

    /// Print the default engine configuration as RON
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            config,
            budget_ms,
            emit_fields,
            record,
        }) => cmd_run(config, budget_ms, emit_fields, record),
        Some(Commands::Replay { file, verify }) => cmd_replay(&file, verify),
        Some(Commands::Config { output }) => cmd_config(output),
        None => cmd_run(None, None, false, None),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Play a game over stdin/stdout
fn cmd_run(
    config: Option<PathBuf>,
    budget_ms: Option<u64>,
    emit_fields: bool,
    record: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = match config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    let mut options = RunnerOptions::with_config(config);
    if let Some(ms) = budget_ms {
        options.budget = Duration::from_millis(ms);
    }
    options.emit_fields = emit_fields;
    options.record = record;

    tracing::info!(budget_ms = options.budget.as_millis() as u64, "Starting session");
    let stdin = io::stdin();
    let stdout = io::stdout();
    BotRunner::new(stdin.lock(), stdout.lock(), options).run()?;
    Ok(ExitCode::SUCCESS)
}

/// Re-play a recorded game
fn cmd_replay(file: &Path, verify: bool) -> Result<ExitCode> {
    let replay = Replay::load(file)?;
    eprintln!("Loaded replay:");
    eprintln!("  Board: {}x{}", replay.setup.constants.width, replay.setup.constants.height);
    eprintln!("  Seed: {}", replay.config.seed);
    eprintln!("  Turns: {}", replay.turn_count());

    if !verify {
        let plans = replay.play()?;
        let moved: usize = plans.iter().map(|p| p.stats.moved).sum();
        let timed_out = plans.iter().filter(|p| p.timed_out).count();
        eprintln!("Re-played {} turns ({moved} moves, {timed_out} timed out)", plans.len());
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!("Verifying replay...");
    let report = replay.verify()?;
    if report.is_match() {
        eprintln!("PASS: all {} turns reproduced", report.turns);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "FAIL: {} of {} turns diverged",
            report.divergences.len(),
            report.turns
        );
        for d in &report.divergences {
            eprintln!(
                "  turn {}: expected {:016x}, got {:016x}",
                d.turn, d.recorded, d.replayed
            );
        }
        Ok(ExitCode::FAILURE)
    }
}

/// Print the default engine configuration as RON
fn cmd_config(output: Option<PathBuf>) -> Result<ExitCode> {
    let ron = ron::ser::to_string_pretty(&EngineConfig::default(), ron::ser::PrettyConfig::default())?;
    match output {
        Some(path) => {
            std::fs::write(&path, ron)?;
            tracing::info!(path = %path.display(), "Configuration written");
        }
        None => println!("{ron}"),
    }
    Ok(ExitCode::SUCCESS)
}
