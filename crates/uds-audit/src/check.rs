//! # Integrity Checks
//!
//! Read-only invariant sweeps over the document store. Each check yields a
//! count plus a bounded sample set; violations are report data for the
//! operator, never errors thrown at live request handling.
//!
//! Severity: referential breaks (orphans, dangling links, cascade
//! contradictions) are failures; reporting-layer drift (unified mismatch,
//! review-parked records, non-canonical reference formats) is a warning.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use uds_state::{
    cascade, LegacyPrStatus, LegacyShipmentStatus, UnifiedStatus,
};
use uds_workflow::WorkflowStore;

use crate::report::{CheckSection, CheckStatus};

/// Default cap on samples carried per section.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// The read-only invariant sweeper.
pub struct IntegrityChecker {
    store: Arc<dyn WorkflowStore>,
    sample_limit: usize,
}

/// The strongest shipment status per PR, for evidence checks.
pub(crate) fn shipment_evidence(
    store: &dyn WorkflowStore,
) -> HashMap<String, LegacyShipmentStatus> {
    let mut map: HashMap<String, LegacyShipmentStatus> = HashMap::new();
    for shipment in store.shipments().list() {
        let key = shipment.record.pr_number.as_str().to_string();
        let status = shipment.record.legacy_status;
        map.entry(key)
            .and_modify(|existing| {
                if status == LegacyShipmentStatus::Delivered {
                    *existing = status;
                }
            })
            .or_insert(status);
    }
    map
}

impl IntegrityChecker {
    /// Build a checker with the default sample cap.
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_sample_limit(store, DEFAULT_SAMPLE_LIMIT)
    }

    /// Build a checker with an explicit sample cap.
    pub fn with_sample_limit(store: Arc<dyn WorkflowStore>, sample_limit: usize) -> Self {
        Self {
            store,
            sample_limit,
        }
    }

    /// Run every check, in report order.
    pub fn run(&self) -> Vec<CheckSection> {
        vec![
            self.unified_coverage(),
            self.status_mismatches(),
            self.cascade_consistency(),
            self.orphaned_shipments(),
            self.orphaned_grns(),
            self.orphaned_invoices(),
            self.dangling_po_links(),
            self.reference_integrity(),
        ]
    }

    fn section(
        &self,
        check: &str,
        severity: CheckStatus,
        violations: Vec<serde_json::Value>,
    ) -> CheckSection {
        let count = violations.len();
        let samples = violations.into_iter().take(self.sample_limit).collect();
        CheckSection::new(check, severity, count, samples)
    }

    /// Records parked at NEEDS_REVIEW: mapped from outside the known
    /// vocabulary at load time and awaiting operator attention.
    fn unified_coverage(&self) -> CheckSection {
        let mut violations = Vec::new();
        for pr in self.store.prs().list() {
            if pr.record.unified_status == UnifiedStatus::NeedsReview {
                violations.push(json!({
                    "entity": "pr",
                    "id": pr.record.pr_number.as_str(),
                    "legacyStatus": pr.record.legacy_status,
                }));
            }
        }
        for po in self.store.pos().list() {
            if po.record.unified_status == UnifiedStatus::NeedsReview {
                violations.push(json!({
                    "entity": "po",
                    "id": po.record.po_number.as_str(),
                    "legacyStatus": po.record.legacy_status,
                }));
            }
        }
        self.section("unifiedCoverage", CheckStatus::Warn, violations)
    }

    /// Stored unified values that are not the image of the legacy status.
    fn status_mismatches(&self) -> CheckSection {
        let mut violations = Vec::new();
        for pr in self.store.prs().list() {
            if !pr.record.unified_consistent() {
                violations.push(json!({
                    "entity": "pr",
                    "id": pr.record.pr_number.as_str(),
                    "legacyStatus": pr.record.legacy_status,
                    "storedUnified": pr.record.unified_status,
                    "expectedUnified": pr.record.legacy_status.unified(),
                }));
            }
        }
        for po in self.store.pos().list() {
            if !po.record.unified_consistent() {
                violations.push(json!({
                    "entity": "po",
                    "id": po.record.po_number.as_str(),
                    "legacyStatus": po.record.legacy_status,
                    "storedUnified": po.record.unified_status,
                    "expectedUnified": po.record.legacy_status.unified(),
                }));
            }
        }
        for shipment in self.store.shipments().list() {
            if !shipment.record.unified_consistent() {
                violations.push(json!({
                    "entity": "shipment",
                    "id": shipment.record.shipment_id.as_str(),
                    "legacyStatus": shipment.record.legacy_status,
                    "storedUnified": shipment.record.unified_status,
                    "expectedUnified": shipment.record.legacy_status.unified(),
                }));
            }
        }
        for grn in self.store.grns().list() {
            if !grn.record.unified_consistent() {
                violations.push(json!({
                    "entity": "grn",
                    "id": grn.record.grn_number.as_str(),
                }));
            }
        }
        for invoice in self.store.invoices().list() {
            if !invoice.record.unified_consistent() {
                violations.push(json!({
                    "entity": "invoice",
                    "id": invoice.record.invoice_number.as_str(),
                }));
            }
        }
        self.section("statusMismatches", CheckStatus::Warn, violations)
    }

    /// Parent/child claims that contradict each other: flags or terminal
    /// statuses without shipment evidence, and delivered shipments the PR
    /// does not reflect.
    fn cascade_consistency(&self) -> CheckSection {
        let evidence = shipment_evidence(self.store.as_ref());
        let mut violations = Vec::new();
        for pr in self.store.prs().list() {
            let pr = &pr.record;
            let shipment = evidence.get(pr.pr_number.as_str()).copied();
            if !cascade::dispatch_claim_supported(pr.dispatch_status, shipment.is_some()) {
                violations.push(json!({
                    "prNumber": pr.pr_number.as_str(),
                    "issue": "dispatch flag without any shipment",
                    "dispatchStatus": pr.dispatch_status,
                }));
            }
            if !cascade::delivery_claim_supported(pr.delivery_status, shipment) {
                violations.push(json!({
                    "prNumber": pr.pr_number.as_str(),
                    "issue": "delivery flag without supporting shipment",
                    "deliveryStatus": pr.delivery_status,
                }));
            }
            if pr.legacy_status == LegacyPrStatus::FullyDelivered
                && shipment != Some(LegacyShipmentStatus::Delivered)
            {
                violations.push(json!({
                    "prNumber": pr.pr_number.as_str(),
                    "issue": "terminal delivery status without a delivered shipment",
                }));
            }
            if shipment == Some(LegacyShipmentStatus::Delivered)
                && pr.legacy_status != LegacyPrStatus::FullyDelivered
            {
                violations.push(json!({
                    "prNumber": pr.pr_number.as_str(),
                    "issue": "delivered shipment not reflected on the PR",
                    "legacyStatus": pr.legacy_status,
                }));
            }
            if let Some(shipment) = shipment {
                if !cascade::terminal_delivery_consistent(pr.delivery_status, shipment) {
                    violations.push(json!({
                        "prNumber": pr.pr_number.as_str(),
                        "issue": "delivery flag and shipment disagree on terminal delivery",
                        "deliveryStatus": pr.delivery_status,
                        "shipmentStatus": shipment,
                    }));
                }
            }
        }
        self.section("cascadeConsistency", CheckStatus::Fail, violations)
    }

    /// Shipments whose PR does not exist.
    fn orphaned_shipments(&self) -> CheckSection {
        let mut violations = Vec::new();
        for shipment in self.store.shipments().list() {
            if !self
                .store
                .prs()
                .contains(shipment.record.pr_number.as_str())
            {
                violations.push(json!({
                    "shipmentId": shipment.record.shipment_id.as_str(),
                    "prNumber": shipment.record.pr_number.as_str(),
                }));
            }
        }
        self.section("orphanedShipments", CheckStatus::Fail, violations)
    }

    /// GRNs whose PO does not exist.
    fn orphaned_grns(&self) -> CheckSection {
        let mut violations = Vec::new();
        for grn in self.store.grns().list() {
            if !self.store.pos().contains(grn.record.po_number.as_str()) {
                violations.push(json!({
                    "grnNumber": grn.record.grn_number.as_str(),
                    "poNumber": grn.record.po_number.as_str(),
                }));
            }
        }
        self.section("orphanedGrns", CheckStatus::Fail, violations)
    }

    /// Invoices whose GRN does not exist.
    fn orphaned_invoices(&self) -> CheckSection {
        let mut violations = Vec::new();
        for invoice in self.store.invoices().list() {
            if !self
                .store
                .grns()
                .contains(invoice.record.grn_number.as_str())
            {
                violations.push(json!({
                    "invoiceNumber": invoice.record.invoice_number.as_str(),
                    "grnNumber": invoice.record.grn_number.as_str(),
                }));
            }
        }
        self.section("orphanedInvoices", CheckStatus::Fail, violations)
    }

    /// POs with an empty PR set or links to PRs that do not exist.
    fn dangling_po_links(&self) -> CheckSection {
        let mut violations = Vec::new();
        for po in self.store.pos().list() {
            if po.record.linked_prs.is_empty() {
                violations.push(json!({
                    "poNumber": po.record.po_number.as_str(),
                    "issue": "no linked PRs",
                }));
                continue;
            }
            for pr_number in &po.record.linked_prs {
                if !self.store.prs().contains(pr_number.as_str()) {
                    violations.push(json!({
                        "poNumber": po.record.po_number.as_str(),
                        "issue": "linked PR does not exist",
                        "prNumber": pr_number.as_str(),
                    }));
                }
            }
        }
        self.section("danglingPoLinks", CheckStatus::Fail, violations)
    }

    /// Identifiers and references outside the tenant's canonical scheme.
    fn reference_integrity(&self) -> CheckSection {
        let mut violations = Vec::new();
        for pr in self.store.prs().list() {
            if !pr.record.pr_number.is_canonical() {
                violations.push(json!({
                    "entity": "pr",
                    "id": pr.record.pr_number.as_str(),
                }));
            }
            if let Some(po) = &pr.record.po_number {
                if !po.is_canonical() {
                    violations.push(json!({
                        "entity": "pr",
                        "id": pr.record.pr_number.as_str(),
                        "reference": po.as_str(),
                    }));
                }
            }
        }
        for po in self.store.pos().list() {
            if !po.record.po_number.is_canonical() {
                violations.push(json!({
                    "entity": "po",
                    "id": po.record.po_number.as_str(),
                }));
            }
        }
        for shipment in self.store.shipments().list() {
            if !shipment.record.shipment_id.is_canonical() {
                violations.push(json!({
                    "entity": "shipment",
                    "id": shipment.record.shipment_id.as_str(),
                }));
            }
        }
        for grn in self.store.grns().list() {
            if !grn.record.grn_number.is_canonical() {
                violations.push(json!({
                    "entity": "grn",
                    "id": grn.record.grn_number.as_str(),
                }));
            }
        }
        for invoice in self.store.invoices().list() {
            if !invoice.record.invoice_number.is_canonical() {
                violations.push(json!({
                    "entity": "invoice",
                    "id": invoice.record.invoice_number.as_str(),
                }));
            }
        }
        self.section("referenceIntegrity", CheckStatus::Warn, violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uds_core::{Actor, Amount, CompanyId, PrNumber, ShipmentId, UserId, UserRole, VendorId};
    use uds_state::{PrRecord, ShipmentRecord};
    use uds_workflow::InMemoryWorkflowStore;

    fn store_with_orphan_shipment() -> Arc<InMemoryWorkflowStore> {
        let store = Arc::new(InMemoryWorkflowStore::new());
        store
            .shipments()
            .insert_new(
                "SHP-77",
                ShipmentRecord::dispatched(
                    ShipmentId::new("SHP-77"),
                    CompanyId::new("acme"),
                    PrNumber::new("PR-999"),
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn orphan_shipment_is_detected_with_its_sample() {
        let store = store_with_orphan_shipment();
        let checker = IntegrityChecker::new(store);
        let sections = checker.run();
        let orphans = sections
            .iter()
            .find(|s| s.check == "orphanedShipments")
            .unwrap();
        assert_eq!(orphans.count, 1);
        assert_eq!(orphans.status, CheckStatus::Fail);
        assert_eq!(orphans.samples[0]["prNumber"], "PR-999");
        assert_eq!(orphans.samples[0]["shipmentId"], "SHP-77");
    }

    #[test]
    fn clean_store_passes_every_check() {
        let store: Arc<InMemoryWorkflowStore> = Arc::new(InMemoryWorkflowStore::new());
        let checker = IntegrityChecker::new(store);
        for section in checker.run() {
            assert_eq!(section.status, CheckStatus::Pass, "{}", section.check);
            assert_eq!(section.count, 0);
        }
    }

    #[test]
    fn unified_drift_is_a_warning_not_a_failure() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let mut pr = PrRecord::draft(
            PrNumber::new("PR-001"),
            CompanyId::new("acme"),
            VendorId::new("v-1"),
            Actor::new(UserId::new("u-1"), "Asha", UserRole::Employee),
            Amount::from_minor_units(1_000),
            1,
        );
        pr.unified_status = UnifiedStatus::Delivered;
        store.prs().insert_new("PR-001", pr).unwrap();

        let sections = IntegrityChecker::new(store).run();
        let mismatches = sections
            .iter()
            .find(|s| s.check == "statusMismatches")
            .unwrap();
        assert_eq!(mismatches.count, 1);
        assert_eq!(mismatches.status, CheckStatus::Warn);
        assert_eq!(mismatches.samples[0]["expectedUnified"], "DRAFT");
    }

    #[test]
    fn delivery_claim_without_shipment_fails_cascade_check() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let mut pr = PrRecord::draft(
            PrNumber::new("PR-001"),
            CompanyId::new("acme"),
            VendorId::new("v-1"),
            Actor::new(UserId::new("u-1"), "Asha", UserRole::Employee),
            Amount::from_minor_units(1_000),
            1,
        );
        pr.set_legacy_status(LegacyPrStatus::FullyDelivered);
        pr.delivery_status = uds_state::DeliveryStatus::Delivered;
        store.prs().insert_new("PR-001", pr).unwrap();

        let sections = IntegrityChecker::new(store).run();
        let cascade = sections
            .iter()
            .find(|s| s.check == "cascadeConsistency")
            .unwrap();
        assert_eq!(cascade.status, CheckStatus::Fail);
        assert!(cascade.count >= 2); // flag and terminal status both unsupported
    }

    #[test]
    fn non_canonical_reference_is_flagged() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let pr = PrRecord::draft(
            PrNumber::new("ORD_17"),
            CompanyId::new("acme"),
            VendorId::new("v-1"),
            Actor::new(UserId::new("u-1"), "Asha", UserRole::Employee),
            Amount::from_minor_units(1_000),
            1,
        );
        store.prs().insert_new("ORD_17", pr).unwrap();

        let sections = IntegrityChecker::new(store).run();
        let refs = sections
            .iter()
            .find(|s| s.check == "referenceIntegrity")
            .unwrap();
        assert_eq!(refs.count, 1);
        assert_eq!(refs.status, CheckStatus::Warn);
    }

    #[test]
    fn sample_cap_bounds_samples_but_not_count() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        for i in 0..25 {
            let id = format!("SHP-{i}");
            store
                .shipments()
                .insert_new(
                    id.clone(),
                    ShipmentRecord::dispatched(
                        ShipmentId::new(id),
                        CompanyId::new("acme"),
                        PrNumber::new(format!("PR-{i}")),
                    ),
                )
                .unwrap();
        }
        let sections = IntegrityChecker::with_sample_limit(store, 5).run();
        let orphans = sections
            .iter()
            .find(|s| s.check == "orphanedShipments")
            .unwrap();
        assert_eq!(orphans.count, 25);
        assert_eq!(orphans.samples.len(), 5);
    }
}
