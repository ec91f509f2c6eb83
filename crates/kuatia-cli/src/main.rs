//! # kuatia CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros for argument parsing; verbosity maps onto the
//! tracing filter.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kuatia_cli::config::AgentConfig;
use kuatia_cli::invalidate::{run_invalidate, InvalidateArgs};
use kuatia_cli::issue::{run_issue, IssueArgs};
use kuatia_cli::show::run_show;

/// Kuatia Stack CLI
///
/// Human-supervised issuing agent for SIFEN electronic invoicing: every
/// configuration change and every submission is confirmed on the
/// terminal before it happens.
#[derive(Parser, Debug)]
#[command(name = "kuatia", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the agent configuration file.
    #[arg(long, global = true, default_value = "agent.yaml")]
    config: PathBuf,

    /// Directory holding the persistent configuration cache.
    #[arg(long, global = true, default_value = ".kuatia")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue an invoice from a JSON request file.
    Issue(IssueArgs),

    /// Evict the cached issuer configuration, naming the trigger.
    Invalidate(InvalidateArgs),

    /// Print the locally cached issuer configuration.
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match AgentConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Issue(args) => run_issue(&args, &config, &cli.state_dir).await,
        Commands::Invalidate(args) => run_invalidate(&args, &config, &cli.state_dir),
        Commands::ShowConfig => run_show(&config, &cli.state_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
