//! # sarco CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sarco_cli::consent::{run_consent, ConsentArgs};
use sarco_cli::keys::{run_keys, KeysArgs};
use sarco_cli::params::run_params;
use sarco_cli::simulate::{run_simulate, SimulateArgs};

/// Sarcophagus protocol CLI
///
/// Custodian key management, consent signing, and offline replay of
/// protocol scenarios against an in-memory token ledger.
#[derive(Parser, Debug)]
#[command(name = "sarco", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML protocol configuration file (default: SARCO_* environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ed25519 identity and shard key generation.
    Keys(KeysArgs),

    /// Sign a custodian's consent to curse terms.
    Consent(ConsentArgs),

    /// Replay a YAML scenario and print events, balances and audit result.
    Simulate(SimulateArgs),

    /// Print the effective protocol configuration.
    Params,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("sarco CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Keys(args) => run_keys(&args),
        Commands::Consent(args) => run_consent(&args),
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Params => run_params(cli.config.as_deref()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
