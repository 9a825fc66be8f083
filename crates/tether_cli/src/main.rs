//! Tether CLI
//!
//! Replay scripted scroll sync sessions, list a page's scroll targets, and
//! print the default configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scenario;

use scenario::{Scenario, Session, StepOutcome};
use tether_sync::TetherConfig;

#[derive(Parser)]
#[command(name = "tether")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Page/canvas scroll sync engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./tether.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print positions after every step
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Print one JSON object per step
        #[arg(long)]
        json: bool,
    },

    /// List the scroll targets a scenario's page offers
    Targets {
        /// Scenario file
        scenario: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { scenario, json } => cmd_simulate(&scenario, &config, json),
        Commands::Targets { scenario, json } => cmd_targets(&scenario, &config, json),
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<TetherConfig> {
    match path {
        Some(path) => TetherConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => TetherConfig::load_from_dir(Path::new("."))
            .context("Failed to load ./tether.toml"),
    }
}

fn cmd_simulate(path: &Path, config: &TetherConfig, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut session = Session::start(&scenario, config)?;

    info!(
        "Replaying {} steps from {}",
        scenario.steps.len(),
        path.display()
    );

    let mut unsettled = 0;
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = session.run(index, step)?;
        if !outcome.report.settled {
            unsettled += 1;
        }

        if json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else {
            print_outcome(&outcome);
        }
    }

    let stats = session.harness().controller().stats();
    info!(
        "Done: {} page writes, {} canvas writes ({} corrections), {} echoes suppressed",
        stats.page_writes, stats.canvas_writes, stats.corrections, stats.echoes_suppressed
    );
    if unsettled > 0 {
        warn!("{} steps did not settle", unsettled);
    }

    Ok(())
}

fn print_outcome(outcome: &StepOutcome) {
    let report = &outcome.report;
    println!(
        "[{:>3}] {:<14} canvas=({:.1}, {:.1}) window=({:.1}, {:.1}) writes(page={}, canvas={}) {:?} target={}",
        outcome.index,
        outcome.action,
        report.canvas_scroll.x,
        report.canvas_scroll.y,
        report.window_scroll.x,
        report.window_scroll.y,
        report.page_writes,
        report.canvas_writes,
        report.state,
        report.active_target.as_deref().unwrap_or("-"),
    );

    if let Some(capture) = &outcome.capture {
        let rect = capture.placement.scene_rect();
        println!(
            "      placed {} ({}) at ({:.1}, {:.1}) size {:.1}x{:.1} in {}",
            capture.file.id,
            capture.file.mime_type,
            rect.left,
            rect.top,
            rect.width,
            rect.height,
            capture.placement.group_id,
        );
    }
}

fn cmd_targets(path: &Path, config: &TetherConfig, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let session = Session::start(&scenario, config)?;
    let entries = session.harness().catalog().entries();

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        info!("No scrollable targets on this page");
    }
    for entry in entries {
        println!("{:<40} {}", entry.id, entry.label);
    }
    Ok(())
}

fn cmd_config(config: &TetherConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
