//! # Notify Subcommand
//!
//! Validates notification mapping documents before deployment: parse
//! failures and lint findings both fail the command, so a bad mapping file
//! never reaches the live engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use uds_notify::MappingCatalog;

/// Arguments for the `uds notify` subcommand.
#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(subcommand)]
    command: NotifyCommand,
}

#[derive(Subcommand, Debug)]
enum NotifyCommand {
    /// Parse and lint a mapping document.
    Validate(ValidateArgs),
}

/// Arguments for `uds notify validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// The mapping document (.yaml or .json).
    #[arg(long, value_name = "FILE")]
    mappings: PathBuf,
}

/// Execute the notify subcommand.
///
/// Returns exit code: 0 when the document is clean, 1 on lint findings.
pub fn run_notify(args: &NotifyArgs) -> Result<u8> {
    match &args.command {
        NotifyCommand::Validate(validate) => run_validate(validate),
    }
}

fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let catalog = MappingCatalog::from_path(&args.mappings)
        .with_context(|| format!("failed to load {}", args.mappings.display()))?;

    let findings = catalog.lint();
    println!(
        "{}: {} mapping(s), {} finding(s)",
        args.mappings.display(),
        catalog.mappings.len(),
        findings.len()
    );
    for finding in &findings {
        println!("  WARN: {finding}");
    }

    Ok(if findings.is_empty() { 0 } else { 1 })
}
