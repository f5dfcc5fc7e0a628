//! # uds-cli — CLI Tool for the Uniform Distribution Stack
//!
//! Provides the `uds` command-line interface for the operational side of
//! the stack: dataset integrity checks, gated repair runs, and
//! notification mapping validation.
//!
//! ## Subcommands
//!
//! - `uds audit check` — read-only integrity sweep over a dataset dump.
//! - `uds audit repair` — gated repair pass (dry-run unless `--live`).
//! - `uds notify validate` — parse and lint a notification mapping file.
//!
//! ## Exit Codes
//!
//! Every subcommand uses the same convention: 0 clean, 1 findings or
//! failures, 2 operational error (bad paths, unreadable dumps, a held
//! repair lock).

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod fixture;
pub mod notify;
