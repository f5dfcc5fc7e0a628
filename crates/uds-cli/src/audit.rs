//! # Audit Subcommand
//!
//! Runs the dataset integrity checker and the gated repairer against a
//! dataset dump. `audit check` is always read-only; `audit repair` plans by
//! default and only writes with `--live`, and only deletes with both
//! `--live` and `--confirm-delete`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use uds_audit::{IntegrityChecker, IntegrityReport, RepairPolicy, Repairer, RunLock, RunMode};

use crate::fixture::FixtureFile;

/// Arguments for the `uds audit` subcommand.
#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    command: AuditCommand,
}

#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Run the read-only integrity checks and print a report.
    Check(CheckArgs),
    /// Run the repair pass (dry-run unless --live).
    Repair(RepairArgs),
}

/// Arguments for `uds audit check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Dataset dump to check (JSON or YAML).
    #[arg(long, value_name = "FILE")]
    data: PathBuf,

    /// Write the JSON report here instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Sample cap per check section.
    #[arg(long, default_value_t = uds_audit::check::DEFAULT_SAMPLE_LIMIT)]
    samples: usize,
}

/// Arguments for `uds audit repair`.
#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Dataset dump to repair (JSON or YAML).
    #[arg(long, value_name = "FILE")]
    data: PathBuf,

    /// Apply repairs instead of planning them.
    #[arg(long)]
    live: bool,

    /// Permit destructive deletions (orphans, corrupt delivered PRs).
    /// Without this flag deletions are planned but never applied, even
    /// with --live.
    #[arg(long)]
    confirm_delete: bool,

    /// Write the JSON report here instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Lock file guarding against concurrent repair runs.
    #[arg(long, value_name = "FILE", default_value = "uds-repair.lock")]
    lock: PathBuf,

    /// Sample cap per check section.
    #[arg(long, default_value_t = uds_audit::check::DEFAULT_SAMPLE_LIMIT)]
    samples: usize,
}

/// Execute the audit subcommand.
///
/// Returns exit code: 0 when every check passed, 1 when any check failed,
/// 2 on operational error (surfaced as `Err`).
pub fn run_audit(args: &AuditArgs) -> Result<u8> {
    match &args.command {
        AuditCommand::Check(check) => run_check(check),
        AuditCommand::Repair(repair) => run_repair(repair),
    }
}

fn run_check(args: &CheckArgs) -> Result<u8> {
    let fixture = FixtureFile::from_path(&args.data)?;
    let (store, load) = fixture.into_store()?;
    tracing::info!(loaded = load.loaded, parked = load.parked.len(), "dataset loaded");

    let sections = IntegrityChecker::with_sample_limit(store, args.samples).run();
    let report = IntegrityReport::check_only(sections);
    emit_report(&report, args.out.as_deref())?;

    Ok(if report.has_failures() { 1 } else { 0 })
}

fn run_repair(args: &RepairArgs) -> Result<u8> {
    let fixture = FixtureFile::from_path(&args.data)?;
    let (store, load) = fixture.into_store()?;
    tracing::info!(loaded = load.loaded, parked = load.parked.len(), "dataset loaded");

    let mode = if args.live {
        RunMode::Live
    } else {
        RunMode::DryRun
    };
    let policy = RepairPolicy {
        destructive_deletes: args.confirm_delete,
        sample_limit: args.samples,
    };
    if args.confirm_delete && !args.live {
        tracing::warn!("--confirm-delete has no effect without --live");
    }

    // Live runs are single-instance per dataset.
    let _lock = if args.live {
        Some(RunLock::acquire(&args.lock).context("could not claim the repair run lock")?)
    } else {
        None
    };

    let report = Repairer::new(store, policy).run(mode)?;
    println!(
        "{} repair: {} action(s) planned, {} applied",
        report.mode,
        report.repairs.len(),
        report.total_changes
    );
    emit_report(&report, args.out.as_deref())?;

    Ok(if report.has_failures() { 1 } else { 0 })
}

fn emit_report(report: &IntegrityReport, out: Option<&std::path::Path>) -> Result<()> {
    match out {
        Some(path) => {
            report.write_to(path)?;
            println!("report written to {}", path.display());
        }
        None => println!("{}", report.to_json_pretty()?),
    }
    Ok(())
}
