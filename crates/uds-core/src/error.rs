//! # Error Hierarchy
//!
//! Structured error types for the workflow core, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! The taxonomy is behavioral, not cosmetic — a caller routes on the variant:
//!
//! - [`WorkflowError::Validation`] — fix the request, never retry.
//! - [`WorkflowError::Forbidden`] — fix the actor, never retry.
//! - [`WorkflowError::StaleState`] — refetch the entity, then retry.
//! - [`WorkflowError::PartialFailure`] — no partial state is visible; retry
//!   the whole operation.
//! - [`WorkflowError::Storage`] — persistence-boundary failure.
//!
//! Integrity violations are *report data* produced by the offline checker,
//! never errors thrown on the live transition path; they live in `uds-audit`.

use thiserror::Error;

/// Top-level error type for workflow transitions.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Malformed or missing input. Surfaced with a human-readable message;
    /// never retried automatically.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Actor's role is not in the stage's allowed-role set.
    #[error("forbidden: role {role} may not act at stage {stage}")]
    Forbidden {
        /// The acting user's role.
        role: String,
        /// The stage key the actor attempted to act at.
        stage: String,
    },

    /// Optimistic-concurrency conflict: the entity moved since the caller
    /// last read it. The caller should refetch and may retry.
    #[error("stale state on {entity}: expected {expected}, found {found}")]
    StaleState {
        /// The entity whose state moved.
        entity: String,
        /// The state the caller expected.
        expected: String,
        /// The state actually found.
        found: String,
    },

    /// A multi-step operation could not complete atomically. No partial
    /// state is visible; the caller should retry the whole operation.
    #[error("partial failure in {operation}: {reason}")]
    PartialFailure {
        /// The operation that aborted.
        operation: String,
        /// Why it aborted.
        reason: String,
    },

    /// Persistence-boundary failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Input-validation failures on workflow operations.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The PR→PO workflow is not enabled for this company.
    #[error("PR/PO workflow is not enabled for company {company_id}")]
    WorkflowDisabled {
        /// The company whose configuration disables the workflow.
        company_id: String,
    },

    /// Entity is not in a state the operation accepts.
    #[error("{entity} is in state {status}, which does not permit {operation}")]
    InvalidState {
        /// The entity being operated on.
        entity: String,
        /// The entity's current status.
        status: String,
        /// The operation that was attempted.
        operation: String,
    },

    /// The rejection reason code is not in the catalog for this entity type.
    #[error("unknown rejection reason code \"{code}\" for {entity_type}")]
    UnknownReasonCode {
        /// The unrecognized code.
        code: String,
        /// The entity type whose catalog was consulted.
        entity_type: String,
    },

    /// The rejection reason requires remarks and none were supplied.
    #[error("rejection reason \"{code}\" requires remarks")]
    RemarksRequired {
        /// The reason code that mandates remarks.
        code: String,
    },

    /// A legacy status string is outside the known vocabulary.
    #[error("unknown legacy status \"{status}\" for {entity_type}")]
    UnknownLegacyStatus {
        /// The unrecognized status value.
        status: String,
        /// The entity type whose vocabulary was consulted.
        entity_type: String,
    },

    /// Multiple PRs were supplied but the company permits one PR per PO.
    #[error("company configuration permits a single PR per PO (got {count})")]
    MultiPrNotAllowed {
        /// How many PRs were supplied.
        count: usize,
    },

    /// A PO creation was requested with no PRs.
    #[error("cannot create a PO from an empty PR set")]
    EmptyPrSet,

    /// The supplied PRs span more than one company or vendor.
    #[error("PRs in one PO must share a company and vendor: {detail}")]
    MixedPrSet {
        /// Which field diverged.
        detail: String,
    },

    /// A document number is already in use.
    #[error("{kind} number {number} already exists")]
    DuplicateNumber {
        /// The document kind.
        kind: String,
        /// The duplicate number.
        number: String,
    },

    /// A referenced document does not exist.
    #[error("{kind} {number} does not exist")]
    MissingReference {
        /// The document kind.
        kind: String,
        /// The missing number.
        number: String,
    },
}

/// Errors from the persistence boundary.
///
/// The workflow engine maps [`StorageError::VersionConflict`] to
/// [`WorkflowError::StaleState`]; everything else surfaces as
/// [`WorkflowError::Storage`] or, inside a multi-step commit, as
/// [`WorkflowError::PartialFailure`].
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested document does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// The document kind.
        kind: String,
        /// The document identifier.
        id: String,
    },

    /// A document with this identifier already exists.
    #[error("{kind} {id} already exists")]
    AlreadyExists {
        /// The document kind.
        kind: String,
        /// The document identifier.
        id: String,
    },

    /// Conditional update failed: the stored version is not the expected one.
    #[error("version conflict on {kind} {id}: expected v{expected}, found v{found}")]
    VersionConflict {
        /// The document kind.
        kind: String,
        /// The document identifier.
        id: String,
        /// The version the caller expected.
        expected: u64,
        /// The version actually stored.
        found: u64,
    },

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_wraps_into_workflow_error() {
        let err: WorkflowError = ValidationError::EmptyPrSet.into();
        assert!(format!("{err}").contains("empty PR set"));
    }

    #[test]
    fn forbidden_names_role_and_stage() {
        let err = WorkflowError::Forbidden {
            role: "employee".to_string(),
            stage: "SITE_ADMIN_APPROVAL".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("employee"));
        assert!(msg.contains("SITE_ADMIN_APPROVAL"));
    }

    #[test]
    fn stale_state_names_expected_and_found() {
        let err = WorkflowError::StaleState {
            entity: "PR-001".to_string(),
            expected: "SITE_ADMIN_APPROVAL".to_string(),
            found: "COMPANY_ADMIN_APPROVAL".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("PR-001"));
        assert!(msg.contains("expected SITE_ADMIN_APPROVAL"));
    }

    #[test]
    fn partial_failure_is_distinct_from_validation() {
        let err = WorkflowError::PartialFailure {
            operation: "create_po_from_prs".to_string(),
            reason: "backend write aborted".to_string(),
        };
        assert!(matches!(err, WorkflowError::PartialFailure { .. }));
        assert!(format!("{err}").contains("create_po_from_prs"));
    }

    #[test]
    fn version_conflict_display() {
        let err = StorageError::VersionConflict {
            kind: "pr".to_string(),
            id: "PR-001".to_string(),
            expected: 3,
            found: 4,
        };
        let msg = format!("{err}");
        assert!(msg.contains("expected v3"));
        assert!(msg.contains("found v4"));
    }

    #[test]
    fn remarks_required_display() {
        let err = ValidationError::RemarksRequired {
            code: "BUDGET_EXCEEDED".to_string(),
        };
        assert!(format!("{err}").contains("BUDGET_EXCEEDED"));
    }
}
