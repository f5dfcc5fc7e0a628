//! # Integrity Report Model
//!
//! The JSON document the checker and repairer produce for operator review:
//! one section per check with a count and a bounded sample set, plus the
//! repair action log when a repair pass ran. Written to a file or stdout by
//! the CLI; the report is the interface, not a log side effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AuditError;

/// Whether a pass was a read-only audit or applied repairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Report only; nothing is written to the store.
    #[serde(rename = "DRY_RUN")]
    DryRun,
    /// Repairs are applied (destructive ones only with the explicit gate).
    #[serde(rename = "LIVE")]
    Live,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DryRun => "DRY_RUN",
            Self::Live => "LIVE",
        })
    }
}

/// Outcome classification for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    /// No violations.
    Pass,
    /// Violations that degrade reporting but not referential integrity.
    Warn,
    /// Violations of a hard invariant.
    Fail,
}

/// One check's findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSection {
    /// The check's stable name, e.g. `orphanedShipments`.
    pub check: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Total violations found (samples are capped, the count is not).
    pub count: usize,
    /// Up to the configured sample limit of concrete offenders.
    pub samples: Vec<serde_json::Value>,
}

impl CheckSection {
    /// Build a section, deriving the status: zero violations pass, nonzero
    /// get the supplied severity.
    pub fn new(
        check: impl Into<String>,
        severity: CheckStatus,
        count: usize,
        samples: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            check: check.into(),
            status: if count == 0 { CheckStatus::Pass } else { severity },
            count,
            samples,
        }
    }
}

/// One logged repair action, applied or planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairAction {
    /// What was done, e.g. `delete`, `resetToDraft`, `recomputeUnified`.
    pub action: String,
    /// The entity kind acted on.
    pub entity_kind: String,
    /// The entity's identifier.
    pub entity_id: String,
    /// The record before the repair.
    pub before: serde_json::Value,
    /// The record after the repair; `None` for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    /// Whether the repair was applied (false in dry-run, and for gated
    /// destructive repairs without the operator flag).
    pub applied: bool,
    /// SHA-256 over the action content, for tamper-evident review trails.
    pub digest: String,
}

impl RepairAction {
    /// Build an action entry, computing its content digest.
    pub fn new(
        action: impl Into<String>,
        entity_kind: impl Into<String>,
        entity_id: impl Into<String>,
        before: serde_json::Value,
        after: Option<serde_json::Value>,
        applied: bool,
    ) -> Self {
        let action = action.into();
        let entity_kind = entity_kind.into();
        let entity_id = entity_id.into();
        let mut hasher = Sha256::new();
        hasher.update(action.as_bytes());
        hasher.update(entity_kind.as_bytes());
        hasher.update(entity_id.as_bytes());
        hasher.update(before.to_string().as_bytes());
        if let Some(after) = &after {
            hasher.update(after.to_string().as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());
        Self {
            action,
            entity_kind,
            entity_id,
            before,
            after,
            applied,
            digest,
        }
    }
}

/// The full check/repair report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Whether this run applied repairs.
    pub mode: RunMode,
    /// When the run happened.
    pub generated_at: DateTime<Utc>,
    /// One section per check.
    pub sections: Vec<CheckSection>,
    /// Total repairs actually applied.
    pub total_changes: usize,
    /// Every repair, applied or planned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repairs: Vec<RepairAction>,
}

impl IntegrityReport {
    /// A check-only report.
    pub fn check_only(sections: Vec<CheckSection>) -> Self {
        Self {
            mode: RunMode::DryRun,
            generated_at: Utc::now(),
            sections,
            total_changes: 0,
            repairs: Vec::new(),
        }
    }

    /// Whether any section reports a hard failure.
    pub fn has_failures(&self) -> bool {
        self.sections
            .iter()
            .any(|s| s.status == CheckStatus::Fail)
    }

    /// Pretty JSON for operator review.
    pub fn to_json_pretty(&self) -> Result<String, AuditError> {
        serde_json::to_string_pretty(self).map_err(AuditError::from)
    }

    /// Write the report to a file.
    pub fn write_to(&self, path: &std::path::Path) -> Result<(), AuditError> {
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| AuditError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}
