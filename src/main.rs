//! Main entry point for kicker-stats
//!
//! Loads configuration, wires the kicker core to an in-memory store and plays
//! a seeded series of matches, printing the resulting ratings table.

use anyhow::Result;
use clap::Parser;
use kicker_stats::config::AppConfig;
use kicker_stats::service::{AppState, SimulationReport};
use std::path::PathBuf;
use tracing::{error, info};

/// Kicker Stats - table football matches and team ELO ratings
#[derive(Parser)]
#[command(
    name = "kicker-stats",
    version,
    about = "Simulates table football matches and tracks team ELO ratings",
    long_about = "kicker-stats runs the match lifecycle (join, start, close) and the \
                 margin-sensitive team ELO rating engine against an in-memory store, \
                 playing a seeded series of matches and printing the ratings table."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Number of simulated matches
    #[arg(short, long, value_name = "N", help = "Override number of simulated matches")]
    matches: Option<usize>,

    /// Number of simulated players
    #[arg(short, long, value_name = "N", help = "Override size of the player pool")]
    players: Option<usize>,

    /// RNG seed
    #[arg(short, long, value_name = "SEED", help = "Override the simulation seed")]
    seed: Option<u64>,

    /// Print Prometheus metrics after the run
    #[arg(long, help = "Print collected metrics in Prometheus text format")]
    metrics: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without simulating")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("⚽ Kicker Stats");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Rating: initial {}, K {}, scale {}, margin base {}",
        config.rating.initial_rating,
        config.rating.k_factor,
        config.rating.scale,
        config.rating.margin_base
    );
    info!(
        "   Simulation: {} players, {} matches, seed {}",
        config.simulation.players, config.simulation.matches, config.simulation.seed
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    // Start with environment-based config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(matches) = args.matches {
        config.simulation.matches = matches;
    }

    if let Some(players) = args.players {
        config.simulation.players = players;
    }

    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    kicker_stats::config::validate_config(&config)?;
    Ok(config)
}

fn print_report(report: &SimulationReport) {
    println!(
        "Ratings after {} matches at table {}",
        report.matches_played, report.table_id
    );
    println!("{:>4}  {:<36}  {:>6}  {:>7}", "#", "player", "rating", "matches");
    for (rank, entry) in report.leaderboard.iter().enumerate() {
        println!(
            "{:>4}  {:<36}  {:>6}  {:>7}",
            rank + 1,
            entry.player_id,
            entry.rating,
            entry.matches_rated
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without simulating");
        return Ok(());
    }

    display_startup_banner(&config);

    let app_state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let report = app_state.run_simulation(&config.simulation).await?;
    print_report(&report);

    if args.metrics {
        println!();
        print!("{}", app_state.render_metrics()?);
    }

    info!("✅ Simulation complete");
    Ok(())
}
