//! Stars Ledger CLI
//!
//! Replays operation scripts against a simulated ledger and inspects saved
//! ledger state.

mod report;
mod script;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stars_core::{
    AuthorizationRegistry, Clock, InMemoryAuthRegistry, InMemoryReferralGraph, LedgerConfig,
    LedgerSnapshot, SystemClock,
};

use script::{load_script, ScriptRunner};

#[derive(Parser)]
#[command(name = "stars-cli")]
#[command(about = "Stars lockup ledger simulator", version)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON operation script
    Simulate {
        /// Ledger configuration (TOML); defaults apply when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Operation script (JSON array)
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// Simulation start time (unix seconds); defaults to now
        #[arg(long)]
        start: Option<u64>,

        /// Write the resulting state here
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Print the event trail
        #[arg(long)]
        events: bool,
    },

    /// Show balances and buckets from a saved state file
    Inspect {
        /// State file written by `simulate --snapshot`
        file: PathBuf,

        /// Only show this account
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Print the default ledger configuration
    DefaultConfig,
}

/// Ledger snapshot plus the collaborator state needed to interpret it
#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    ledger: LedgerSnapshot,
    registry: InMemoryAuthRegistry,
    referrals: InMemoryReferralGraph,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_config(path: Option<&Path>) -> Result<LedgerConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(LedgerConfig::load_from_file(path)?),
        None => Ok(LedgerConfig::default()),
    }
}

fn simulate(
    config: Option<&Path>,
    script_path: &Path,
    start: Option<u64>,
    snapshot: Option<&Path>,
    show_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let ops = load_script(script_path)?;
    let start = start.unwrap_or_else(|| SystemClock.now());

    println!("{}", "Stars Ledger Simulator".cyan().bold());
    println!(
        "lockup_time {}s, lockup_unit {}s, {} operations",
        config.lockup_time,
        config.lockup_unit,
        ops.len()
    );

    let mut runner = ScriptRunner::new(config, start)?;
    let summary = runner.run(&ops);

    report::print_header("Replay");
    println!("{} {}", "Applied:".green(), summary.applied);
    for failure in &summary.failures {
        println!(
            "{} step {} {:?}: {}",
            "✗".red(),
            failure.step,
            failure.op,
            failure.error
        );
    }

    let ledger = runner.ledger();
    let state = SavedState {
        ledger: ledger.snapshot(),
        registry: ledger.registry().clone(),
        referrals: ledger.referrals().clone(),
    };

    report::print_accounts(&state.ledger, None, &|id| runner.is_blocked(id));
    report::print_supply(&state.ledger.supply);
    if show_events {
        report::print_events(&state.ledger.events);
    }

    if let Some(path) = snapshot {
        fs::write(path, serde_json::to_string_pretty(&state)?)?;
        println!("\n{} {}", "✓ State written to".green(), path.display());
    }
    Ok(())
}

fn inspect(file: &Path, account: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)?;
    let state: SavedState = serde_json::from_str(&content)?;
    state.ledger.validate()?;

    println!(
        "{} taken at {}",
        "Ledger state".cyan().bold(),
        state.ledger.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    report::print_accounts(&state.ledger, account, &|id| state.registry.is_blocked(id));
    if account.is_none() {
        report::print_supply(&state.ledger.supply);
    }
    Ok(())
}

fn print_default_config() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", LedgerConfig::default().to_toml()?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Simulate {
            config,
            script,
            start,
            snapshot,
            events,
        } => simulate(
            config.as_deref(),
            &script,
            start,
            snapshot.as_deref(),
            events,
        ),
        Commands::Inspect { file, account } => inspect(&file, account.as_deref()),
        Commands::DefaultConfig => print_default_config(),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
