//! # Recipient Resolution
//!
//! Mapping rules name recipients by strategy, not by address. Resolution
//! turns a strategy plus the event into concrete recipients via a directory
//! the host application provides.

use serde::{Deserialize, Serialize};

use uds_core::{CompanyId, UserRole, VendorId};
use uds_events::WorkflowEvent;
use uds_state::ApprovalStage;

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// A concrete person (or endpoint) to deliver to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Delivery address. Deduplication compares this case-insensitively.
    pub email: String,
    /// Display name for templates.
    pub name: String,
}

impl Recipient {
    /// Build a recipient.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryProvider
// ---------------------------------------------------------------------------

/// The host application's user directory. The notification engine never
/// stores users itself; it asks.
pub trait DirectoryProvider: Send + Sync {
    /// Everyone in `company` holding `role`.
    fn users_with_role(&self, company: &CompanyId, role: UserRole) -> Vec<Recipient>;

    /// The notification contact for a vendor, if one is on file.
    fn vendor_contact(&self, vendor: &VendorId) -> Option<Recipient>;
}

// ---------------------------------------------------------------------------
// RecipientResolver
// ---------------------------------------------------------------------------

/// A named strategy for turning an event into recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RecipientResolver {
    /// The user who created the entity.
    Requestor,
    /// Holders of the role gating the stage the entity is now waiting at.
    CurrentStageRoleHolders,
    /// Holders of the role that gated the stage the action happened at.
    PreviousStageRoleHolders,
    /// Holders of the role gating the stage after the one acted at.
    NextStageRoleHolders,
    /// Everyone in the company holding a fixed role.
    CompanyRole {
        /// The role to look up.
        role: UserRole,
    },
    /// The vendor contact on the entity.
    VendorContact,
    /// A fixed list of addresses, e.g. a shared procurement inbox.
    StaticList {
        /// The addresses.
        emails: Vec<String>,
    },
}

/// The role that approves at a stage (the platform override role is not a
/// notification audience).
fn stage_role(stage: ApprovalStage) -> UserRole {
    match stage {
        ApprovalStage::SiteAdmin => UserRole::SiteAdmin,
        ApprovalStage::CompanyAdmin => UserRole::CompanyAdmin,
    }
}

fn stage_from(key: Option<&str>) -> Option<ApprovalStage> {
    key.and_then(ApprovalStage::from_key)
}

impl RecipientResolver {
    /// Resolve this strategy against `event`. Unknown stage keys and empty
    /// directory lookups resolve to nobody, never to an error — routing
    /// problems must not fail the workflow side.
    pub fn resolve(
        &self,
        event: &WorkflowEvent,
        directory: &dyn DirectoryProvider,
    ) -> Vec<Recipient> {
        match self {
            Self::Requestor => {
                let snapshot = &event.entity_snapshot;
                match &snapshot.created_by_email {
                    Some(email) => {
                        vec![Recipient::new(email, snapshot.created_by_name.clone())]
                    }
                    None => {
                        tracing::debug!(
                            entity = %event.entity_id,
                            "requestor has no email on the snapshot"
                        );
                        Vec::new()
                    }
                }
            }
            Self::CurrentStageRoleHolders => stage_from(event.current_stage.as_deref())
                .map(|stage| directory.users_with_role(&event.company_id, stage_role(stage)))
                .unwrap_or_default(),
            Self::PreviousStageRoleHolders => stage_from(event.previous_stage.as_deref())
                .map(|stage| directory.users_with_role(&event.company_id, stage_role(stage)))
                .unwrap_or_default(),
            Self::NextStageRoleHolders => stage_from(event.previous_stage.as_deref())
                .and_then(|stage| stage.successor())
                .map(|next| directory.users_with_role(&event.company_id, stage_role(next)))
                .unwrap_or_default(),
            Self::CompanyRole { role } => directory.users_with_role(&event.company_id, *role),
            Self::VendorContact => directory
                .vendor_contact(&event.entity_snapshot.vendor_id)
                .into_iter()
                .collect(),
            Self::StaticList { emails } => emails
                .iter()
                .map(|email| Recipient::new(email.clone(), email.clone()))
                .collect(),
        }
    }
}
