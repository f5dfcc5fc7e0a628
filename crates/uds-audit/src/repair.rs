//! # Gated Repair Pass
//!
//! Turns check findings into corrections. Two gates stand between a finding
//! and a write: the run mode (dry-run never writes) and, for deletions, the
//! destructive-delete policy flag an operator must set explicitly. Every
//! action is logged with before/after values whether or not it was applied.
//!
//! ## Ordering
//!
//! Rules run in a fixed order against the evolving store, so one rule's
//! deletions are visible to the next rule's scan within the same run. That
//! ordering is what makes a second LIVE run a no-op: corrupt PRs go first,
//! then the orphan sweeps (GRN deletions can orphan invoices, so invoices
//! are swept after GRNs), then the unified recompute over whatever
//! survived.

use std::sync::Arc;

use uds_state::{DeliveryStatus, DispatchStatus, LegacyPrStatus, LegacyShipmentStatus};
use uds_workflow::WorkflowStore;

use crate::check::{shipment_evidence, IntegrityChecker};
use crate::report::{IntegrityReport, RepairAction, RunMode};
use crate::AuditError;

/// Operator policy for a repair run.
#[derive(Debug, Clone, Copy)]
pub struct RepairPolicy {
    /// Allow deletion of business records (orphans and corrupt
    /// delivered-without-shipment PRs). Off by default: deleting documents
    /// is irreversible and must be confirmed per environment.
    pub destructive_deletes: bool,
    /// Sample cap for the check sections embedded in the report.
    pub sample_limit: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            destructive_deletes: false,
            sample_limit: crate::check::DEFAULT_SAMPLE_LIMIT,
        }
    }
}

/// The repair pass.
pub struct Repairer {
    store: Arc<dyn WorkflowStore>,
    policy: RepairPolicy,
}

impl Repairer {
    /// Build a repairer.
    pub fn new(store: Arc<dyn WorkflowStore>, policy: RepairPolicy) -> Self {
        Self { store, policy }
    }

    /// Run checks, then the repair rules, honoring the mode and policy
    /// gates. The report's sections reflect the state before repairs.
    pub fn run(&self, mode: RunMode) -> Result<IntegrityReport, AuditError> {
        let sections =
            IntegrityChecker::with_sample_limit(self.store.clone(), self.policy.sample_limit)
                .run();

        let mut repairs: Vec<RepairAction> = Vec::new();
        self.delete_corrupt_delivered_prs(mode, &mut repairs)?;
        self.reset_unevidenced_flag_prs(mode, &mut repairs)?;
        self.reconcile_delivered_shipments(mode, &mut repairs)?;
        self.delete_orphaned_shipments(mode, &mut repairs)?;
        self.delete_unlinked_pos(mode, &mut repairs)?;
        self.delete_orphaned_grns(mode, &mut repairs)?;
        self.delete_orphaned_invoices(mode, &mut repairs)?;
        self.recompute_unified(mode, &mut repairs)?;

        let total_changes = repairs.iter().filter(|r| r.applied).count();
        tracing::info!(
            mode = %mode,
            planned = repairs.len(),
            applied = total_changes,
            "repair pass finished"
        );
        Ok(IntegrityReport {
            mode,
            generated_at: chrono::Utc::now(),
            sections,
            total_changes,
            repairs,
        })
    }

    fn may_delete(&self, mode: RunMode) -> bool {
        mode == RunMode::Live && self.policy.destructive_deletes
    }

    /// PRs claiming terminal delivery with no shipment at all are treated
    /// as corrupt and deleted, never patched. Deletion is double-gated.
    fn delete_corrupt_delivered_prs(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        let evidence = shipment_evidence(self.store.as_ref());
        for pr in self.store.prs().list() {
            let pr = &pr.record;
            let claims_terminal = pr.legacy_status == LegacyPrStatus::FullyDelivered
                || pr.delivery_status == DeliveryStatus::Delivered;
            if !claims_terminal || evidence.contains_key(pr.pr_number.as_str()) {
                continue;
            }
            let apply = self.may_delete(mode);
            if apply {
                self.store.prs().remove(pr.pr_number.as_str());
            }
            repairs.push(RepairAction::new(
                "delete",
                "pr",
                pr.pr_number.as_str(),
                serde_json::to_value(pr)?,
                None,
                apply,
            ));
        }
        Ok(())
    }

    /// PRs with intermediate dispatch/delivery flags but no shipment make a
    /// weaker claim; they are reset to the draft-equivalent starting state
    /// rather than deleted.
    fn reset_unevidenced_flag_prs(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        let evidence = shipment_evidence(self.store.as_ref());
        for pr in self.store.prs().list() {
            let record = &pr.record;
            let has_shipment = evidence.contains_key(record.pr_number.as_str());
            let claims_terminal = record.legacy_status == LegacyPrStatus::FullyDelivered
                || record.delivery_status == DeliveryStatus::Delivered;
            let claims_movement = record.dispatch_status.claims_dispatch()
                || record.delivery_status.claims_delivery();
            if has_shipment || claims_terminal || !claims_movement {
                continue;
            }
            let mut after = record.clone();
            after.set_legacy_status(LegacyPrStatus::Draft);
            after.dispatch_status = DispatchStatus::NotDispatched;
            after.delivery_status = DeliveryStatus::NotDelivered;
            after.current_stage = None;
            after.po_number = None;

            let apply = mode == RunMode::Live;
            if apply {
                let reset = after.clone();
                self.store.prs().update(record.pr_number.as_str(), |pr| {
                    *pr = reset;
                });
            }
            repairs.push(RepairAction::new(
                "resetToDraft",
                "pr",
                record.pr_number.as_str(),
                serde_json::to_value(record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        Ok(())
    }

    /// A delivered shipment the PR does not reflect is a crash gap on the
    /// live cascade path; the shipment is the evidence, so the PR is
    /// brought up to match it.
    fn reconcile_delivered_shipments(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        let evidence = shipment_evidence(self.store.as_ref());
        for pr in self.store.prs().list() {
            let record = &pr.record;
            if evidence.get(record.pr_number.as_str()) != Some(&LegacyShipmentStatus::Delivered)
                || record.legacy_status == LegacyPrStatus::FullyDelivered
            {
                continue;
            }
            let mut after = record.clone();
            after.set_legacy_status(LegacyPrStatus::FullyDelivered);
            after.dispatch_status = DispatchStatus::Dispatched;
            after.delivery_status = DeliveryStatus::Delivered;

            let apply = mode == RunMode::Live;
            if apply {
                let patched = after.clone();
                self.store.prs().update(record.pr_number.as_str(), |pr| {
                    *pr = patched;
                });
            }
            repairs.push(RepairAction::new(
                "reconcileFromShipment",
                "pr",
                record.pr_number.as_str(),
                serde_json::to_value(record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        Ok(())
    }

    fn delete_orphaned_shipments(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        for shipment in self.store.shipments().list() {
            let record = &shipment.record;
            if self.store.prs().contains(record.pr_number.as_str()) {
                continue;
            }
            let apply = self.may_delete(mode);
            if apply {
                self.store.shipments().remove(record.shipment_id.as_str());
            }
            repairs.push(RepairAction::new(
                "delete",
                "shipment",
                record.shipment_id.as_str(),
                serde_json::to_value(record)?,
                None,
                apply,
            ));
        }
        Ok(())
    }

    /// A PO only ever gains PR references at creation time, so a PO with
    /// zero linked PRs cannot be recovered by re-linking. It is deleted
    /// ahead of the GRN sweep so its GRNs fall out in the same pass.
    fn delete_unlinked_pos(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        for po in self.store.pos().list() {
            let record = &po.record;
            if !record.linked_prs.is_empty() {
                continue;
            }
            let apply = self.may_delete(mode);
            if apply {
                self.store.pos().remove(record.po_number.as_str());
            }
            repairs.push(RepairAction::new(
                "delete",
                "po",
                record.po_number.as_str(),
                serde_json::to_value(record)?,
                None,
                apply,
            ));
        }
        Ok(())
    }

    fn delete_orphaned_grns(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        for grn in self.store.grns().list() {
            let record = &grn.record;
            if self.store.pos().contains(record.po_number.as_str()) {
                continue;
            }
            let apply = self.may_delete(mode);
            if apply {
                self.store.grns().remove(record.grn_number.as_str());
            }
            repairs.push(RepairAction::new(
                "delete",
                "grn",
                record.grn_number.as_str(),
                serde_json::to_value(record)?,
                None,
                apply,
            ));
        }
        Ok(())
    }

    fn delete_orphaned_invoices(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        for invoice in self.store.invoices().list() {
            let record = &invoice.record;
            if self.store.grns().contains(record.grn_number.as_str()) {
                continue;
            }
            let apply = self.may_delete(mode);
            if apply {
                self.store.invoices().remove(record.invoice_number.as_str());
            }
            repairs.push(RepairAction::new(
                "delete",
                "invoice",
                record.invoice_number.as_str(),
                serde_json::to_value(record)?,
                None,
                apply,
            ));
        }
        Ok(())
    }

    /// Recompute every drifted unified field from the legacy status — the
    /// mapping is the authority, never the stored unified value.
    fn recompute_unified(
        &self,
        mode: RunMode,
        repairs: &mut Vec<RepairAction>,
    ) -> Result<(), AuditError> {
        let apply = mode == RunMode::Live;
        for pr in self.store.prs().list() {
            if pr.record.unified_consistent() {
                continue;
            }
            let mut after = pr.record.clone();
            after.refresh_unified();
            if apply {
                self.store.prs().update(pr.record.pr_number.as_str(), |r| {
                    r.refresh_unified();
                });
            }
            repairs.push(RepairAction::new(
                "recomputeUnified",
                "pr",
                pr.record.pr_number.as_str(),
                serde_json::to_value(&pr.record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        for po in self.store.pos().list() {
            if po.record.unified_consistent() {
                continue;
            }
            let mut after = po.record.clone();
            after.refresh_unified();
            if apply {
                self.store.pos().update(po.record.po_number.as_str(), |r| {
                    r.refresh_unified();
                });
            }
            repairs.push(RepairAction::new(
                "recomputeUnified",
                "po",
                po.record.po_number.as_str(),
                serde_json::to_value(&po.record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        for shipment in self.store.shipments().list() {
            if shipment.record.unified_consistent() {
                continue;
            }
            let mut after = shipment.record.clone();
            after.refresh_unified();
            if apply {
                self.store
                    .shipments()
                    .update(shipment.record.shipment_id.as_str(), |r| {
                        r.refresh_unified();
                    });
            }
            repairs.push(RepairAction::new(
                "recomputeUnified",
                "shipment",
                shipment.record.shipment_id.as_str(),
                serde_json::to_value(&shipment.record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        for grn in self.store.grns().list() {
            if grn.record.unified_consistent() {
                continue;
            }
            let mut after = grn.record.clone();
            after.refresh_unified();
            if apply {
                self.store
                    .grns()
                    .update(grn.record.grn_number.as_str(), |r| {
                        r.refresh_unified();
                    });
            }
            repairs.push(RepairAction::new(
                "recomputeUnified",
                "grn",
                grn.record.grn_number.as_str(),
                serde_json::to_value(&grn.record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        for invoice in self.store.invoices().list() {
            if invoice.record.unified_consistent() {
                continue;
            }
            let mut after = invoice.record.clone();
            after.refresh_unified();
            if apply {
                self.store
                    .invoices()
                    .update(invoice.record.invoice_number.as_str(), |r| {
                        r.refresh_unified();
                    });
            }
            repairs.push(RepairAction::new(
                "recomputeUnified",
                "invoice",
                invoice.record.invoice_number.as_str(),
                serde_json::to_value(&invoice.record)?,
                Some(serde_json::to_value(&after)?),
                apply,
            ));
        }
        Ok(())
    }
}
