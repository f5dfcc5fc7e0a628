//! # uds CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros; verbosity maps to tracing levels the usual
//! way (-v info, -vv debug, -vvv trace).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use uds_cli::audit::{run_audit, AuditArgs};
use uds_cli::notify::{run_notify, NotifyArgs};

/// Uniform Distribution Stack CLI
///
/// Operational tooling for the distribution workflow: dataset integrity
/// checks, gated repairs, and notification mapping validation.
#[derive(Parser, Debug)]
#[command(name = "uds", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dataset integrity checks and gated repairs.
    Audit(AuditArgs),

    /// Notification mapping validation.
    Notify(NotifyArgs),
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
        .init();

    let result = match cli.command {
        Commands::Audit(args) => run_audit(&args),
        Commands::Notify(args) => run_notify(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
