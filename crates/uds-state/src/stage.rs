//! # Approval Stages
//!
//! The named checkpoints a PR passes through on its way to approval. Which
//! stages exist for a given company is decided by its workflow
//! configuration (see `uds-workflow`); the stages themselves, their role
//! gates, and the legacy statuses they correspond to are fixed here.

use serde::{Deserialize, Serialize};

use uds_core::UserRole;

use crate::status::LegacyPrStatus;

/// A named approval checkpoint in the PR workflow.
///
/// Serialized as its stage key (`SITE_ADMIN_APPROVAL`,
/// `COMPANY_ADMIN_APPROVAL`) — the form events and mapping rules use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStage {
    /// The site-admin gate (platform-side review).
    #[serde(rename = "SITE_ADMIN_APPROVAL")]
    SiteAdmin,
    /// The company-admin gate (customer-side authorization).
    #[serde(rename = "COMPANY_ADMIN_APPROVAL")]
    CompanyAdmin,
}

impl ApprovalStage {
    /// The stage key used in events and notification mapping rules.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SiteAdmin => "SITE_ADMIN_APPROVAL",
            Self::CompanyAdmin => "COMPANY_ADMIN_APPROVAL",
        }
    }

    /// Parse a stage key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "SITE_ADMIN_APPROVAL" => Some(Self::SiteAdmin),
            "COMPANY_ADMIN_APPROVAL" => Some(Self::CompanyAdmin),
            _ => None,
        }
    }

    /// The roles allowed to act at this stage. Super-admins may act at
    /// either gate as the platform override.
    pub fn allowed_roles(&self) -> &'static [UserRole] {
        match self {
            Self::SiteAdmin => &[UserRole::SiteAdmin, UserRole::SuperAdmin],
            Self::CompanyAdmin => &[UserRole::CompanyAdmin, UserRole::SuperAdmin],
        }
    }

    /// Whether `role` may approve or reject at this stage.
    pub fn permits(&self, role: UserRole) -> bool {
        self.allowed_roles().contains(&role)
    }

    /// The legacy status of a PR that is waiting at this stage.
    pub fn entry_status(&self) -> LegacyPrStatus {
        match self {
            Self::SiteAdmin => LegacyPrStatus::Submitted,
            Self::CompanyAdmin => LegacyPrStatus::SiteAdminApproved,
        }
    }

    /// The legacy status of a PR approved at this stage.
    pub fn approved_status(&self) -> LegacyPrStatus {
        match self {
            Self::SiteAdmin => LegacyPrStatus::SiteAdminApproved,
            Self::CompanyAdmin => LegacyPrStatus::CompanyAdminApproved,
        }
    }

    /// The legacy status of a PR rejected at this stage.
    pub fn rejected_status(&self) -> LegacyPrStatus {
        match self {
            Self::SiteAdmin => LegacyPrStatus::RejectedBySiteAdmin,
            Self::CompanyAdmin => LegacyPrStatus::RejectedByCompanyAdmin,
        }
    }

    /// The stage that follows this one in the full chain, independent of
    /// any company's configuration.
    pub fn successor(&self) -> Option<ApprovalStage> {
        match self {
            Self::SiteAdmin => Some(Self::CompanyAdmin),
            Self::CompanyAdmin => None,
        }
    }
}

impl std::fmt::Display for ApprovalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keys_round_trip() {
        assert_eq!(
            ApprovalStage::from_key(ApprovalStage::SiteAdmin.key()),
            Some(ApprovalStage::SiteAdmin)
        );
        assert_eq!(
            ApprovalStage::from_key(ApprovalStage::CompanyAdmin.key()),
            Some(ApprovalStage::CompanyAdmin)
        );
        assert_eq!(ApprovalStage::from_key("FINANCE_APPROVAL"), None);
    }

    #[test]
    fn role_gates() {
        assert!(ApprovalStage::SiteAdmin.permits(UserRole::SiteAdmin));
        assert!(ApprovalStage::SiteAdmin.permits(UserRole::SuperAdmin));
        assert!(!ApprovalStage::SiteAdmin.permits(UserRole::CompanyAdmin));
        assert!(!ApprovalStage::SiteAdmin.permits(UserRole::Employee));
        assert!(ApprovalStage::CompanyAdmin.permits(UserRole::CompanyAdmin));
        assert!(!ApprovalStage::CompanyAdmin.permits(UserRole::SiteAdmin));
    }

    #[test]
    fn stage_status_correspondence() {
        assert_eq!(
            ApprovalStage::SiteAdmin.entry_status(),
            LegacyPrStatus::Submitted
        );
        assert_eq!(
            ApprovalStage::SiteAdmin.approved_status(),
            LegacyPrStatus::SiteAdminApproved
        );
        assert_eq!(
            ApprovalStage::CompanyAdmin.rejected_status(),
            LegacyPrStatus::RejectedByCompanyAdmin
        );
    }

    #[test]
    fn serde_uses_stage_keys() {
        assert_eq!(
            serde_json::to_string(&ApprovalStage::SiteAdmin).unwrap(),
            "\"SITE_ADMIN_APPROVAL\""
        );
    }

    #[test]
    fn successor_chain_terminates() {
        assert_eq!(
            ApprovalStage::SiteAdmin.successor(),
            Some(ApprovalStage::CompanyAdmin)
        );
        assert_eq!(ApprovalStage::CompanyAdmin.successor(), None);
    }
}
