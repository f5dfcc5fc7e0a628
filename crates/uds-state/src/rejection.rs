//! # Rejection Reason Catalog
//!
//! Per-entity-type catalogs of rejection reason codes. A rejection must
//! carry a code from the catalog; codes with `requires_remarks` refuse
//! blank remarks. The catalog is deployment configuration — the built-in
//! default matches the standard platform setup and a per-deployment
//! catalog can be loaded over it (serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use uds_core::{Actor, ValidationError};

use crate::status::EntityKind;

/// One allowed rejection reason for an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionReason {
    /// Stable machine code (e.g. `BUDGET_EXCEEDED`).
    pub code: String,
    /// Human-readable label shown in approval screens.
    pub label: String,
    /// Whether a rejection with this code must carry non-empty remarks.
    pub requires_remarks: bool,
    /// Optional operator-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RejectionReason {
    fn new(code: &str, label: &str, requires_remarks: bool) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
            requires_remarks,
            description: None,
        }
    }
}

/// The rejection recorded on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionRecord {
    /// The catalog code.
    pub reason_code: String,
    /// The catalog label at the time of rejection.
    pub reason_label: String,
    /// Remarks, when supplied (mandatory for some codes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Who rejected.
    pub rejected_by: Actor,
    /// When.
    pub rejected_at: DateTime<Utc>,
}

/// The per-entity-type catalog of allowed rejection reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionCatalog {
    reasons: HashMap<EntityKind, Vec<RejectionReason>>,
}

impl RejectionCatalog {
    /// An empty catalog. Every rejection will fail validation.
    pub fn empty() -> Self {
        Self {
            reasons: HashMap::new(),
        }
    }

    /// Replace the reason list for one entity kind.
    pub fn set(&mut self, kind: EntityKind, reasons: Vec<RejectionReason>) {
        self.reasons.insert(kind, reasons);
    }

    /// The reasons configured for one entity kind.
    pub fn reasons_for(&self, kind: EntityKind) -> &[RejectionReason] {
        self.reasons.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a reason by code.
    pub fn reason(&self, kind: EntityKind, code: &str) -> Option<&RejectionReason> {
        self.reasons_for(kind).iter().find(|r| r.code == code)
    }

    /// Validate a rejection request: the code must exist for the entity
    /// kind, and remarks must be present and non-blank when the code
    /// requires them.
    pub fn validate(
        &self,
        kind: EntityKind,
        code: &str,
        remarks: Option<&str>,
    ) -> Result<&RejectionReason, ValidationError> {
        let reason = self
            .reason(kind, code)
            .ok_or_else(|| ValidationError::UnknownReasonCode {
                code: code.to_string(),
                entity_type: kind.to_string(),
            })?;
        if reason.requires_remarks && remarks.map_or(true, |r| r.trim().is_empty()) {
            return Err(ValidationError::RemarksRequired {
                code: code.to_string(),
            });
        }
        Ok(reason)
    }
}

impl Default for RejectionCatalog {
    /// The standard platform catalog.
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.set(
            EntityKind::Pr,
            vec![
                RejectionReason::new("BUDGET_EXCEEDED", "Budget exceeded", true),
                RejectionReason::new("DUPLICATE_REQUEST", "Duplicate request", false),
                RejectionReason::new("OUT_OF_POLICY", "Outside ordering policy", false),
                RejectionReason::new("VENDOR_UNAVAILABLE", "Vendor unavailable", false),
                RejectionReason::new("OTHER", "Other", true),
            ],
        );
        catalog.set(
            EntityKind::Grn,
            vec![
                RejectionReason::new("QUANTITY_MISMATCH", "Quantity mismatch", true),
                RejectionReason::new("DAMAGED_GOODS", "Goods damaged", true),
            ],
        );
        catalog.set(
            EntityKind::Invoice,
            vec![
                RejectionReason::new("AMOUNT_MISMATCH", "Amount mismatch", true),
                RejectionReason::new("MISSING_GRN", "No matching receipt", false),
            ],
        );
        catalog
    }
}
