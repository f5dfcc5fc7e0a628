//! # uds-audit
//!
//! Offline integrity tooling for the distribution workflow dataset: a
//! read-only checker that sweeps every cross-entity invariant, and a gated
//! repairer that corrects findings under an explicit operator policy.
//!
//! ## Design
//!
//! - The checker never writes; its output is a report of sections with
//!   counts, capped samples, and a PASS/WARN/FAIL status per check.
//! - The repairer defaults to dry-run. Live mode applies non-destructive
//!   corrections; deletions additionally require the destructive-delete
//!   policy flag.
//! - Every repair action carries a content digest over its before/after
//!   values so two runs over the same data produce comparable logs.
//! - A lock file keeps the repairer single-instance per dataset.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod check;
pub mod lock;
pub mod repair;
pub mod report;

pub use check::IntegrityChecker;
pub use lock::RunLock;
pub use repair::{RepairPolicy, Repairer};
pub use report::{CheckSection, CheckStatus, IntegrityReport, RepairAction, RunMode};

/// Errors from the audit tooling.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A record could not be serialized into the report.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A filesystem operation failed.
    #[error("io error on {path}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Another repair run holds the lock.
    #[error("another repair run is in progress (lock file {path})")]
    AlreadyRunning {
        /// The lock file path.
        path: String,
    },
}
