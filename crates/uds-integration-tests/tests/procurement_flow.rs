//! End-to-end procurement lifecycle: PR submission through both approval
//! gates, PO creation, dispatch, shipment progression, and the delivery
//! cascade, with the authorization and stale-state guards along the way.

use std::sync::Arc;

use chrono::NaiveDate;

use uds_core::{
    Actor, Amount, CompanyId, GrnNumber, InvoiceNumber, PoNumber, PrNumber, ShipmentId, UserId,
    UserRole, VendorId, ValidationError, WorkflowError,
};
use uds_events::EventBus;
use uds_state::{
    ApprovalStage, DeliveryStatus, DispatchStatus, LegacyPoStatus, LegacyPrStatus,
    LegacyShipmentStatus, PrRecord, UnifiedStatus,
};
use uds_workflow::{CompanyWorkflowConfig, InMemoryWorkflowStore, WorkflowEngine, WorkflowStore};

fn full_config() -> CompanyWorkflowConfig {
    CompanyWorkflowConfig {
        enable_pr_po_workflow: true,
        enable_site_admin_pr_approval: true,
        require_company_admin_po_approval: true,
        allow_multi_pr_po: true,
    }
}

fn employee() -> Actor {
    Actor::new(UserId::new("u-emp"), "Asha", UserRole::Employee).with_email("asha@acme.test")
}

fn site_admin() -> Actor {
    Actor::new(UserId::new("u-site"), "Sam", UserRole::SiteAdmin)
}

fn company_admin() -> Actor {
    Actor::new(UserId::new("u-comp"), "Dana", UserRole::CompanyAdmin)
}

fn vendor() -> Actor {
    Actor::new(UserId::new("u-ven"), "Vik", UserRole::Vendor)
}

fn engine() -> (WorkflowEngine, Arc<InMemoryWorkflowStore>) {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let engine = WorkflowEngine::new(store.clone(), EventBus::new());
    (engine, store)
}

fn seed_draft(store: &InMemoryWorkflowStore, number: &str) {
    let record = PrRecord::draft(
        PrNumber::new(number),
        CompanyId::new("acme"),
        VendorId::new("v-1"),
        employee(),
        Amount::from_minor_units(120_000),
        3,
    );
    store.prs().insert_new(number, record).unwrap();
}

#[test]
fn full_lifecycle_draft_to_delivered() {
    let (engine, store) = engine();
    let config = full_config();
    seed_draft(&store, "PR-001");
    let pr = PrNumber::new("PR-001");

    // Submission lands at the site-admin gate.
    let submitted = engine.submit_pr(&config, &pr, &employee()).unwrap();
    assert_eq!(submitted.legacy_status, LegacyPrStatus::Submitted);
    assert_eq!(submitted.current_stage, Some(ApprovalStage::SiteAdmin));

    // Two approvals reach terminal approval.
    let at_company = engine
        .approve_pr(&config, &pr, ApprovalStage::SiteAdmin, &site_admin())
        .unwrap();
    assert_eq!(at_company.current_stage, Some(ApprovalStage::CompanyAdmin));
    let approved = engine
        .approve_pr(&config, &pr, ApprovalStage::CompanyAdmin, &company_admin())
        .unwrap();
    assert_eq!(approved.legacy_status, LegacyPrStatus::CompanyAdminApproved);
    assert_eq!(approved.current_stage, None);
    assert_eq!(approved.unified_status, UnifiedStatus::Approved);

    // PO creation links the PR and flips it to PO-Created.
    let po_number = PoNumber::new("PO-001");
    let po = engine
        .create_po_from_prs(
            &config,
            po_number.clone(),
            NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            std::slice::from_ref(&pr),
            &company_admin(),
        )
        .unwrap();
    assert_eq!(po.linked_prs, vec![pr.clone()]);
    let linked = store.prs().get("PR-001").unwrap().record;
    assert_eq!(linked.legacy_status, LegacyPrStatus::PoCreated);
    assert_eq!(linked.po_number, Some(po_number.clone()));

    // Vendor acknowledges, dispatches, and walks the shipment forward.
    engine.acknowledge_po(&po_number, &vendor()).unwrap();
    let shipment_id = ShipmentId::new("SHP-1");
    engine
        .record_dispatch(shipment_id.clone(), &pr, &vendor())
        .unwrap();
    assert_eq!(
        store.pos().get("PO-001").unwrap().record.legacy_status,
        LegacyPoStatus::Dispatched
    );
    engine
        .advance_shipment(&shipment_id, LegacyShipmentStatus::InTransit, &vendor())
        .unwrap();
    engine
        .advance_shipment(&shipment_id, LegacyShipmentStatus::Delivered, &vendor())
        .unwrap();

    // Delivery cascaded to the PR and the PO.
    let delivered = store.prs().get("PR-001").unwrap().record;
    assert_eq!(delivered.legacy_status, LegacyPrStatus::FullyDelivered);
    assert_eq!(delivered.dispatch_status, DispatchStatus::Dispatched);
    assert_eq!(delivered.delivery_status, DeliveryStatus::Delivered);
    assert_eq!(
        store.pos().get("PO-001").unwrap().record.legacy_status,
        LegacyPoStatus::FullyDelivered
    );

    // Receipt and invoicing close out the paper trail.
    let grn = GrnNumber::new("GRN-1");
    engine
        .create_grn(grn.clone(), &po_number, &company_admin())
        .unwrap();
    engine
        .create_invoice(InvoiceNumber::new("INV-1"), &grn, &vendor())
        .unwrap();
    engine.close_po(&po_number, &company_admin()).unwrap();
    assert_eq!(
        store.pos().get("PO-001").unwrap().record.legacy_status,
        LegacyPoStatus::Closed
    );
}

#[test]
fn disabled_site_admin_gate_is_auto_passed() {
    let (engine, store) = engine();
    let config = CompanyWorkflowConfig {
        enable_site_admin_pr_approval: false,
        ..full_config()
    };
    seed_draft(&store, "PR-001");
    let pr = PrNumber::new("PR-001");

    let submitted = engine.submit_pr(&config, &pr, &employee()).unwrap();
    assert_eq!(submitted.current_stage, Some(ApprovalStage::CompanyAdmin));

    // The site-admin gate does not exist for this company: approving there
    // is an invalid operation, not a forbidden one.
    let err = engine
        .approve_pr(&config, &pr, ApprovalStage::SiteAdmin, &site_admin())
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::InvalidState { .. })
    ));

    let approved = engine
        .approve_pr(&config, &pr, ApprovalStage::CompanyAdmin, &company_admin())
        .unwrap();
    assert_eq!(approved.legacy_status, LegacyPrStatus::CompanyAdminApproved);
}

#[test]
fn rejection_with_mandatory_remarks_is_enforced() {
    let (engine, store) = engine();
    let config = full_config();
    seed_draft(&store, "PR-001");
    let pr = PrNumber::new("PR-001");
    engine.submit_pr(&config, &pr, &employee()).unwrap();

    // BUDGET_EXCEEDED requires remarks; blank ones do not count.
    let err = engine
        .reject_pr(
            &config,
            &pr,
            ApprovalStage::SiteAdmin,
            &site_admin(),
            "BUDGET_EXCEEDED",
            Some("   "),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::RemarksRequired { .. })
    ));
    // The refusal left the PR untouched.
    assert_eq!(
        store.prs().get("PR-001").unwrap().record.legacy_status,
        LegacyPrStatus::Submitted
    );

    let rejected = engine
        .reject_pr(
            &config,
            &pr,
            ApprovalStage::SiteAdmin,
            &site_admin(),
            "BUDGET_EXCEEDED",
            Some("Q4 budget exhausted"),
        )
        .unwrap();
    assert_eq!(
        rejected.legacy_status,
        LegacyPrStatus::RejectedBySiteAdmin
    );
    let rejection = rejected.rejection.expect("rejection record");
    assert_eq!(rejection.reason_code, "BUDGET_EXCEEDED");
    assert_eq!(rejection.remarks.as_deref(), Some("Q4 budget exhausted"));

    // Resubmission clears the rejection record.
    let resubmitted = engine.submit_pr(&config, &pr, &employee()).unwrap();
    assert!(resubmitted.rejection.is_none());
    assert_eq!(resubmitted.legacy_status, LegacyPrStatus::Submitted);
}

#[test]
fn role_gates_hold_across_the_flow() {
    let (engine, store) = engine();
    let config = full_config();
    seed_draft(&store, "PR-001");
    let pr = PrNumber::new("PR-001");
    engine.submit_pr(&config, &pr, &employee()).unwrap();

    // An employee cannot approve; a vendor cannot create a PO; a vendor
    // cannot record a GRN.
    assert!(matches!(
        engine
            .approve_pr(&config, &pr, ApprovalStage::SiteAdmin, &employee())
            .unwrap_err(),
        WorkflowError::Forbidden { .. }
    ));
    assert!(matches!(
        engine
            .create_po_from_prs(
                &config,
                PoNumber::new("PO-001"),
                NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
                std::slice::from_ref(&pr),
                &vendor(),
            )
            .unwrap_err(),
        WorkflowError::Forbidden { .. }
    ));
    assert!(matches!(
        engine
            .create_grn(GrnNumber::new("GRN-1"), &PoNumber::new("PO-001"), &vendor())
            .unwrap_err(),
        WorkflowError::Forbidden { .. }
    ));
}

#[test]
fn multi_pr_po_is_atomic_under_a_version_conflict() {
    let (engine, store) = engine();
    let config = full_config();
    for number in ["PR-001", "PR-002"] {
        seed_draft(&store, number);
        let pr = PrNumber::new(number);
        engine.submit_pr(&config, &pr, &employee()).unwrap();
        engine
            .approve_pr(&config, &pr, ApprovalStage::SiteAdmin, &site_admin())
            .unwrap();
        engine
            .approve_pr(&config, &pr, ApprovalStage::CompanyAdmin, &company_admin())
            .unwrap();
    }

    // A competing PO claims PR-002 first.
    engine
        .create_po_from_prs(
            &config,
            PoNumber::new("PO-FIRST"),
            NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            &[PrNumber::new("PR-002")],
            &company_admin(),
        )
        .unwrap();

    let err = engine
        .create_po_from_prs(
            &config,
            PoNumber::new("PO-SECOND"),
            NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            &[PrNumber::new("PR-001"), PrNumber::new("PR-002")],
            &company_admin(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::InvalidState { .. })
            | WorkflowError::StaleState { .. }
    ));

    // Nothing from the failed PO exists: PR-001 is still linkable and the
    // second PO was never written.
    let pr1 = store.prs().get("PR-001").unwrap().record;
    assert_eq!(pr1.legacy_status, LegacyPrStatus::CompanyAdminApproved);
    assert_eq!(pr1.po_number, None);
    assert!(!store.pos().contains("PO-SECOND"));
}

#[test]
fn shipment_progression_is_forward_only() {
    let (engine, store) = engine();
    let config = full_config();
    seed_draft(&store, "PR-001");
    let pr = PrNumber::new("PR-001");
    engine.submit_pr(&config, &pr, &employee()).unwrap();
    engine
        .approve_pr(&config, &pr, ApprovalStage::SiteAdmin, &site_admin())
        .unwrap();
    engine
        .approve_pr(&config, &pr, ApprovalStage::CompanyAdmin, &company_admin())
        .unwrap();
    engine
        .create_po_from_prs(
            &config,
            PoNumber::new("PO-001"),
            NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            std::slice::from_ref(&pr),
            &company_admin(),
        )
        .unwrap();

    let shipment_id = ShipmentId::new("SHP-1");
    engine
        .record_dispatch(shipment_id.clone(), &pr, &vendor())
        .unwrap();
    engine
        .advance_shipment(&shipment_id, LegacyShipmentStatus::OutForDelivery, &vendor())
        .unwrap();

    // Neither a step back nor a repeat is accepted.
    for attempt in [
        LegacyShipmentStatus::InTransit,
        LegacyShipmentStatus::OutForDelivery,
    ] {
        let err = engine
            .advance_shipment(&shipment_id, attempt, &vendor())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::StaleState { .. }));
    }
    assert_eq!(
        store.shipments().get("SHP-1").unwrap().record.legacy_status,
        LegacyShipmentStatus::OutForDelivery
    );
}

#[test]
fn workflow_disabled_blocks_submission() {
    let (engine, store) = engine();
    let config = CompanyWorkflowConfig {
        enable_pr_po_workflow: false,
        ..full_config()
    };
    seed_draft(&store, "PR-001");

    let err = engine
        .submit_pr(&config, &PrNumber::new("PR-001"), &employee())
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::WorkflowDisabled { .. })
    ));
}
