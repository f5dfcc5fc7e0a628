//! # Company Workflow Configuration
//!
//! The per-company toggles that decide which approval stages exist and
//! whether multiple PRs may be grouped into one PO. The configuration is an
//! explicit value passed into every engine call — never a global lookup —
//! so stage decisions are testable without a live database and a config
//! read races with nothing.

use serde::{Deserialize, Serialize};

use uds_state::ApprovalStage;

/// Per-company workflow toggles.
///
/// Field names match the company-settings document this is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyWorkflowConfig {
    /// Whether the PR→PO procurement workflow is enabled at all.
    pub enable_pr_po_workflow: bool,
    /// Whether PRs pass a site-admin gate before company approval.
    pub enable_site_admin_pr_approval: bool,
    /// Whether PRs require company-admin approval before PO creation.
    pub require_company_admin_po_approval: bool,
    /// Whether one PO may be created from multiple PRs.
    pub allow_multi_pr_po: bool,
}

impl CompanyWorkflowConfig {
    /// The ordered approval stages this company's PRs pass through.
    pub fn stage_chain(&self) -> Vec<ApprovalStage> {
        let mut chain = Vec::with_capacity(2);
        if self.enable_site_admin_pr_approval {
            chain.push(ApprovalStage::SiteAdmin);
        }
        if self.require_company_admin_po_approval {
            chain.push(ApprovalStage::CompanyAdmin);
        }
        chain
    }

    /// The first stage a submitted PR waits at, if any.
    pub fn first_stage(&self) -> Option<ApprovalStage> {
        self.stage_chain().into_iter().next()
    }

    /// The stage after `stage` in this company's chain, if any.
    pub fn next_stage(&self, stage: ApprovalStage) -> Option<ApprovalStage> {
        let chain = self.stage_chain();
        let pos = chain.iter().position(|s| *s == stage)?;
        chain.get(pos + 1).copied()
    }

    /// Whether this company's chain includes `stage`.
    pub fn has_stage(&self, stage: ApprovalStage) -> bool {
        self.stage_chain().contains(&stage)
    }
}
