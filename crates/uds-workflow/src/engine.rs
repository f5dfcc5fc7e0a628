//! # Workflow Engine
//!
//! The transition authority for procurement documents. Every mutation goes
//! through here: role gates are checked against the acting user, the stage
//! chain comes from the company's configuration, statuses move through the
//! legacy vocabulary with the unified field kept in lockstep, and an event
//! is emitted only after the store has committed the transition.
//!
//! ## Concurrency
//!
//! Transitions are fenced on the version the engine read. A losing racer
//! gets [`WorkflowError::StaleState`] and must refetch; nothing is
//! half-written. PO creation from multiple PRs commits through the store's
//! single atomic linking primitive.
//!
//! ## Events
//!
//! Emission is fire-and-forget: a full notification pipeline or a panicking
//! subscriber never rolls back or delays a committed transition.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use uds_core::{
    Actor, CompanyId, EventId, GrnNumber, InvoiceNumber, PoNumber, PrNumber, ShipmentId,
    StorageError, UserRole, ValidationError, WorkflowError,
};
use uds_events::{EntitySnapshot, EventBus, EventRejection, WorkflowEvent, WorkflowEventType};
use uds_state::{
    ApprovalStage, DeliveryStatus, DispatchStatus, EntityKind, GrnRecord, InvoiceRecord,
    LegacyPoStatus, LegacyPrStatus, LegacyShipmentStatus, PoRecord, PrRecord, RejectionCatalog,
    RejectionRecord, ShipmentRecord, UnifiedStatus,
};

use crate::config::CompanyWorkflowConfig;
use crate::store::WorkflowStore;

/// Progression rank for shipment statuses. Shipments only move forward.
fn shipment_rank(status: LegacyShipmentStatus) -> u8 {
    match status {
        LegacyShipmentStatus::Dispatched => 0,
        LegacyShipmentStatus::InTransit => 1,
        LegacyShipmentStatus::OutForDelivery => 2,
        LegacyShipmentStatus::Delivered => 3,
    }
}

/// Map a storage-level version conflict to the caller-facing stale-state
/// error; everything else passes through unchanged.
fn map_conflict(err: WorkflowError) -> WorkflowError {
    match err {
        WorkflowError::Storage(StorageError::VersionConflict {
            id,
            expected,
            found,
            ..
        }) => WorkflowError::StaleState {
            entity: id,
            expected: format!("v{expected}"),
            found: format!("v{found}"),
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// The transition authority. Cheap to clone; all clones share one store and
/// one event bus.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    bus: EventBus,
    catalog: RejectionCatalog,
}

impl WorkflowEngine {
    /// Build an engine over a store and bus, with the default rejection
    /// reason catalog.
    pub fn new(store: Arc<dyn WorkflowStore>, bus: EventBus) -> Self {
        Self {
            store,
            bus,
            catalog: RejectionCatalog::default(),
        }
    }

    /// Build an engine with an explicit rejection catalog.
    pub fn with_catalog(
        store: Arc<dyn WorkflowStore>,
        bus: EventBus,
        catalog: RejectionCatalog,
    ) -> Self {
        Self { store, bus, catalog }
    }

    /// The underlying document store.
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// The event bus transitions are announced on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The rejection reason catalog in force.
    pub fn catalog(&self) -> &RejectionCatalog {
        &self.catalog
    }

    // -- PR lifecycle -------------------------------------------------------

    /// Submit (or resubmit) a PR into the company's approval chain.
    ///
    /// Stages the company has disabled are auto-passed: with no site-admin
    /// gate the PR lands directly at the company-admin gate, and with no
    /// gates at all it is approved on submission. Any prior rejection is
    /// cleared.
    pub fn submit_pr(
        &self,
        config: &CompanyWorkflowConfig,
        pr_number: &PrNumber,
        actor: &Actor,
    ) -> Result<PrRecord, WorkflowError> {
        let current = self.store.prs().require(pr_number.as_str())?;

        if !config.enable_pr_po_workflow {
            return Err(ValidationError::WorkflowDisabled {
                company_id: current.record.company_id.to_string(),
            }
            .into());
        }
        self.require_requestor_or_admin(&current.record, actor, "SUBMIT")?;

        let first = config.first_stage();
        let updated = self
            .store
            .prs()
            .try_update(pr_number.as_str(), current.version, |pr| {
                if !pr.is_resubmittable() {
                    return Err(WorkflowError::Validation(ValidationError::InvalidState {
                        entity: pr.pr_number.to_string(),
                        status: pr.legacy_status.to_string(),
                        operation: "submit".to_string(),
                    }));
                }
                pr.rejection = None;
                match first {
                    Some(stage) => {
                        pr.set_legacy_status(stage.entry_status());
                        pr.current_stage = Some(stage);
                    }
                    None => {
                        pr.set_legacy_status(LegacyPrStatus::CompanyAdminApproved);
                        pr.current_stage = None;
                    }
                }
                Ok(pr.clone())
            })
            .map_err(map_conflict)?;

        tracing::info!(
            pr = %updated.pr_number,
            status = %updated.legacy_status,
            stage = updated.current_stage.map(|s| s.key()),
            "PR submitted"
        );
        self.emit_pr_event(
            WorkflowEventType::EntitySubmitted,
            &updated,
            Some(current.record.unified_status),
            None,
            actor,
            None,
        );
        Ok(updated)
    }

    /// Approve a PR at `stage`, advancing it to the next configured stage
    /// or to terminal approval.
    pub fn approve_pr(
        &self,
        config: &CompanyWorkflowConfig,
        pr_number: &PrNumber,
        stage: ApprovalStage,
        actor: &Actor,
    ) -> Result<PrRecord, WorkflowError> {
        self.require_stage_role(stage, actor)?;
        if !config.has_stage(stage) {
            return Err(ValidationError::InvalidState {
                entity: pr_number.to_string(),
                status: "n/a".to_string(),
                operation: format!("approve at unconfigured stage {}", stage.key()),
            }
            .into());
        }

        let current = self.store.prs().require(pr_number.as_str())?;
        let next = config.next_stage(stage);
        let updated = self
            .store
            .prs()
            .try_update(pr_number.as_str(), current.version, |pr| {
                Self::require_waiting_at(pr, stage, "approve")?;
                match next {
                    Some(next_stage) => {
                        pr.set_legacy_status(stage.approved_status());
                        pr.current_stage = Some(next_stage);
                    }
                    None => {
                        pr.set_legacy_status(LegacyPrStatus::CompanyAdminApproved);
                        pr.current_stage = None;
                    }
                }
                Ok(pr.clone())
            })
            .map_err(map_conflict)?;

        let terminal = updated.current_stage.is_none();
        tracing::info!(
            pr = %updated.pr_number,
            stage = stage.key(),
            status = %updated.legacy_status,
            terminal,
            "PR approved"
        );
        self.emit_pr_event(
            if terminal {
                WorkflowEventType::EntityApproved
            } else {
                WorkflowEventType::EntityApprovedAtStage
            },
            &updated,
            Some(current.record.unified_status),
            Some(stage),
            actor,
            None,
        );
        Ok(updated)
    }

    /// Reject a PR at `stage` with a cataloged reason.
    pub fn reject_pr(
        &self,
        config: &CompanyWorkflowConfig,
        pr_number: &PrNumber,
        stage: ApprovalStage,
        actor: &Actor,
        reason_code: &str,
        remarks: Option<&str>,
    ) -> Result<PrRecord, WorkflowError> {
        self.require_stage_role(stage, actor)?;
        if !config.has_stage(stage) {
            return Err(ValidationError::InvalidState {
                entity: pr_number.to_string(),
                status: "n/a".to_string(),
                operation: format!("reject at unconfigured stage {}", stage.key()),
            }
            .into());
        }
        let reason = self
            .catalog
            .validate(EntityKind::Pr, reason_code, remarks)
            .map_err(WorkflowError::Validation)?
            .clone();

        let current = self.store.prs().require(pr_number.as_str())?;
        let rejection = RejectionRecord {
            reason_code: reason.code.clone(),
            reason_label: reason.label.clone(),
            remarks: remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            rejected_by: actor.clone(),
            rejected_at: Utc::now(),
        };
        let updated = self
            .store
            .prs()
            .try_update(pr_number.as_str(), current.version, |pr| {
                Self::require_waiting_at(pr, stage, "reject")?;
                pr.set_legacy_status(stage.rejected_status());
                pr.current_stage = None;
                pr.rejection = Some(rejection.clone());
                Ok(pr.clone())
            })
            .map_err(map_conflict)?;

        tracing::info!(
            pr = %updated.pr_number,
            stage = stage.key(),
            reason = %reason.code,
            "PR rejected"
        );
        self.emit_pr_event(
            WorkflowEventType::EntityRejected,
            &updated,
            Some(current.record.unified_status),
            Some(stage),
            actor,
            Some(EventRejection {
                reason_code: rejection.reason_code,
                reason_label: rejection.reason_label,
                remarks: rejection.remarks,
            }),
        );
        Ok(updated)
    }

    /// Cancel a PR that has not yet reached terminal approval. The
    /// requestor may cancel their own PR; company admins may cancel any.
    /// Once fully approved the PR is PO material and leaves the flow via
    /// `create_po_from_prs`, not cancellation.
    pub fn cancel_pr(
        &self,
        pr_number: &PrNumber,
        actor: &Actor,
    ) -> Result<PrRecord, WorkflowError> {
        let current = self.store.prs().require(pr_number.as_str())?;
        self.require_requestor_or_admin(&current.record, actor, "CANCEL")?;

        let updated = self
            .store
            .prs()
            .try_update(pr_number.as_str(), current.version, |pr| {
                let cancellable = matches!(
                    pr.legacy_status,
                    LegacyPrStatus::Draft
                        | LegacyPrStatus::Submitted
                        | LegacyPrStatus::SiteAdminApproved
                );
                if !cancellable {
                    return Err(WorkflowError::Validation(ValidationError::InvalidState {
                        entity: pr.pr_number.to_string(),
                        status: pr.legacy_status.to_string(),
                        operation: "cancel".to_string(),
                    }));
                }
                pr.set_legacy_status(LegacyPrStatus::Cancelled);
                pr.current_stage = None;
                Ok(pr.clone())
            })
            .map_err(map_conflict)?;

        tracing::info!(pr = %updated.pr_number, "PR cancelled");
        self.emit_pr_event(
            WorkflowEventType::EntityCancelled,
            &updated,
            Some(current.record.unified_status),
            None,
            actor,
            None,
        );
        Ok(updated)
    }

    // -- PO lifecycle -------------------------------------------------------

    /// Create a PO from one or more fully approved PRs, atomically flipping
    /// every PR to its linked state.
    pub fn create_po_from_prs(
        &self,
        config: &CompanyWorkflowConfig,
        po_number: PoNumber,
        po_date: NaiveDate,
        pr_numbers: &[PrNumber],
        actor: &Actor,
    ) -> Result<PoRecord, WorkflowError> {
        if !matches!(
            actor.user_role,
            UserRole::CompanyAdmin | UserRole::SuperAdmin
        ) {
            return Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: "PO_CREATION".to_string(),
            });
        }
        if pr_numbers.is_empty() {
            return Err(ValidationError::EmptyPrSet.into());
        }
        if pr_numbers.len() > 1 && !config.allow_multi_pr_po {
            return Err(ValidationError::MultiPrNotAllowed {
                count: pr_numbers.len(),
            }
            .into());
        }
        if self.store.pos().contains(po_number.as_str()) {
            return Err(ValidationError::DuplicateNumber {
                kind: EntityKind::Po.to_string(),
                number: po_number.to_string(),
            }
            .into());
        }

        let mut linked: Vec<(PrRecord, u64)> = Vec::with_capacity(pr_numbers.len());
        let mut company: Option<CompanyId> = None;
        let mut vendor = None;
        for number in pr_numbers {
            let current = self.store.prs().get(number.as_str()).ok_or_else(|| {
                ValidationError::MissingReference {
                    kind: EntityKind::Pr.to_string(),
                    number: number.to_string(),
                }
            })?;
            let mut pr = current.record;
            if !pr.is_linkable() {
                return Err(ValidationError::InvalidState {
                    entity: pr.pr_number.to_string(),
                    status: pr.legacy_status.to_string(),
                    operation: "link into PO".to_string(),
                }
                .into());
            }
            match &company {
                None => {
                    company = Some(pr.company_id.clone());
                    vendor = Some(pr.vendor_id.clone());
                }
                Some(first) => {
                    if *first != pr.company_id {
                        return Err(ValidationError::MixedPrSet {
                            detail: format!(
                                "company {} vs {}",
                                first, pr.company_id
                            ),
                        }
                        .into());
                    }
                    if vendor.as_ref() != Some(&pr.vendor_id) {
                        return Err(ValidationError::MixedPrSet {
                            detail: format!(
                                "vendor {} vs {}",
                                vendor.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                                pr.vendor_id
                            ),
                        }
                        .into());
                    }
                }
            }
            pr.set_legacy_status(LegacyPrStatus::PoCreated);
            pr.po_number = Some(po_number.clone());
            linked.push((pr, current.version));
        }

        // Validation above guarantees at least one PR, hence Some.
        let company_id = company.ok_or_else(|| WorkflowError::PartialFailure {
            operation: "create_po_from_prs".to_string(),
            reason: "no source PR survived validation".to_string(),
        })?;
        let vendor_id = vendor.ok_or_else(|| WorkflowError::PartialFailure {
            operation: "create_po_from_prs".to_string(),
            reason: "no source PR survived validation".to_string(),
        })?;

        let po = PoRecord::issued(
            po_number.clone(),
            company_id,
            vendor_id,
            po_date,
            pr_numbers.to_vec(),
        );
        self.store
            .create_po_linking(po.clone(), linked)
            .map_err(|err| match err {
                StorageError::VersionConflict {
                    id,
                    expected,
                    found,
                    ..
                } => WorkflowError::StaleState {
                    entity: id,
                    expected: format!("v{expected}"),
                    found: format!("v{found}"),
                },
                StorageError::AlreadyExists { kind, id } => {
                    ValidationError::DuplicateNumber { kind, number: id }.into()
                }
                StorageError::NotFound { kind, id } => {
                    ValidationError::MissingReference { kind, number: id }.into()
                }
                StorageError::Backend(reason) => WorkflowError::PartialFailure {
                    operation: "create_po_from_prs".to_string(),
                    reason,
                },
            })?;

        tracing::info!(
            po = %po.po_number,
            prs = po.linked_prs.len(),
            "PO created"
        );
        Ok(po)
    }

    /// Vendor acknowledges a freshly issued PO.
    pub fn acknowledge_po(
        &self,
        po_number: &PoNumber,
        actor: &Actor,
    ) -> Result<PoRecord, WorkflowError> {
        self.require_vendor(actor, "PO_ACKNOWLEDGEMENT")?;
        let current = self.store.pos().require(po_number.as_str())?;
        let updated = self
            .store
            .pos()
            .try_update(po_number.as_str(), current.version, |po| {
                if po.legacy_status != LegacyPoStatus::Created {
                    return Err(WorkflowError::Validation(ValidationError::InvalidState {
                        entity: po.po_number.to_string(),
                        status: po.legacy_status.to_string(),
                        operation: "acknowledge".to_string(),
                    }));
                }
                po.set_legacy_status(LegacyPoStatus::Acknowledged);
                Ok(po.clone())
            })
            .map_err(map_conflict)?;
        tracing::info!(po = %updated.po_number, "PO acknowledged");
        Ok(updated)
    }

    /// Close out a fully delivered PO.
    pub fn close_po(&self, po_number: &PoNumber, actor: &Actor) -> Result<PoRecord, WorkflowError> {
        if !matches!(
            actor.user_role,
            UserRole::CompanyAdmin | UserRole::SuperAdmin
        ) {
            return Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: "PO_CLOSE".to_string(),
            });
        }
        let current = self.store.pos().require(po_number.as_str())?;
        let updated = self
            .store
            .pos()
            .try_update(po_number.as_str(), current.version, |po| {
                if po.legacy_status != LegacyPoStatus::FullyDelivered {
                    return Err(WorkflowError::Validation(ValidationError::InvalidState {
                        entity: po.po_number.to_string(),
                        status: po.legacy_status.to_string(),
                        operation: "close".to_string(),
                    }));
                }
                po.set_legacy_status(LegacyPoStatus::Closed);
                Ok(po.clone())
            })
            .map_err(map_conflict)?;
        tracing::info!(po = %updated.po_number, "PO closed");
        Ok(updated)
    }

    // -- Fulfillment --------------------------------------------------------

    /// Record a dispatch against a linked PR: creates the shipment record,
    /// then flips the PR's dispatch flag and moves the PO to dispatched.
    ///
    /// The shipment is written first. A crash between the shipment write and
    /// the flag updates leaves drift the integrity checker detects and the
    /// repairer reconciles from the shipment as evidence.
    pub fn record_dispatch(
        &self,
        shipment_id: ShipmentId,
        pr_number: &PrNumber,
        actor: &Actor,
    ) -> Result<ShipmentRecord, WorkflowError> {
        self.require_vendor(actor, "DISPATCH")?;
        let current = self.store.prs().require(pr_number.as_str())?;
        if current.record.legacy_status != LegacyPrStatus::PoCreated {
            return Err(ValidationError::InvalidState {
                entity: current.record.pr_number.to_string(),
                status: current.record.legacy_status.to_string(),
                operation: "dispatch".to_string(),
            }
            .into());
        }

        let shipment = ShipmentRecord::dispatched(
            shipment_id.clone(),
            current.record.company_id.clone(),
            pr_number.clone(),
        );
        self.store
            .shipments()
            .insert_new(shipment_id.as_str(), shipment.clone())
            .map_err(|err| match err {
                StorageError::AlreadyExists { kind, id } => {
                    WorkflowError::Validation(ValidationError::DuplicateNumber {
                        kind,
                        number: id,
                    })
                }
                other => WorkflowError::Storage(other),
            })?;

        self.store
            .prs()
            .try_update(pr_number.as_str(), current.version, |pr| {
                pr.dispatch_status = DispatchStatus::Dispatched;
                pr.updated_at = Utc::now();
                Ok::<_, WorkflowError>(())
            })
            .map_err(map_conflict)?;

        if let Some(po_number) = &current.record.po_number {
            self.store.pos().update(po_number.as_str(), |po| {
                if matches!(
                    po.legacy_status,
                    LegacyPoStatus::Created | LegacyPoStatus::Acknowledged
                ) {
                    po.set_legacy_status(LegacyPoStatus::Dispatched);
                }
            });
        }

        tracing::info!(
            shipment = %shipment.shipment_id,
            pr = %pr_number,
            "dispatch recorded"
        );
        Ok(shipment)
    }

    /// Advance a shipment along its forward-only progression. Delivery
    /// cascades to the PR and, when every linked PR is delivered, to the PO.
    pub fn advance_shipment(
        &self,
        shipment_id: &ShipmentId,
        to: LegacyShipmentStatus,
        actor: &Actor,
    ) -> Result<ShipmentRecord, WorkflowError> {
        self.require_vendor(actor, "SHIPMENT_UPDATE")?;
        let current = self.store.shipments().require(shipment_id.as_str())?;
        let updated = self
            .store
            .shipments()
            .try_update(shipment_id.as_str(), current.version, |shipment| {
                if shipment_rank(to) <= shipment_rank(shipment.legacy_status) {
                    return Err(WorkflowError::StaleState {
                        entity: shipment.shipment_id.to_string(),
                        expected: format!("a status after {}", shipment.legacy_status),
                        found: to.to_string(),
                    });
                }
                shipment.set_legacy_status(to);
                Ok(shipment.clone())
            })
            .map_err(map_conflict)?;

        if to == LegacyShipmentStatus::Delivered {
            self.cascade_delivery(&updated);
        }

        tracing::info!(
            shipment = %updated.shipment_id,
            status = %updated.legacy_status,
            "shipment advanced"
        );
        Ok(updated)
    }

    /// Propagate a delivered shipment onto its PR, and onto the PO once all
    /// linked PRs are delivered. Runs after the shipment write committed;
    /// any crash gap here is exactly what the integrity repairer reconciles.
    fn cascade_delivery(&self, shipment: &ShipmentRecord) {
        let pr = self.store.prs().update(shipment.pr_number.as_str(), |pr| {
            pr.dispatch_status = DispatchStatus::Dispatched;
            pr.delivery_status = DeliveryStatus::Delivered;
            pr.set_legacy_status(LegacyPrStatus::FullyDelivered);
        });

        let Some(pr) = pr else {
            tracing::warn!(
                shipment = %shipment.shipment_id,
                pr = %shipment.pr_number,
                "delivered shipment references a missing PR"
            );
            return;
        };

        if let Some(po_number) = &pr.record.po_number {
            if let Some(po) = self.store.pos().get(po_number.as_str()) {
                let all_delivered = po.record.linked_prs.iter().all(|n| {
                    self.store
                        .prs()
                        .get(n.as_str())
                        .map(|p| p.record.legacy_status == LegacyPrStatus::FullyDelivered)
                        .unwrap_or(false)
                });
                if all_delivered {
                    self.store.pos().update(po_number.as_str(), |po| {
                        po.set_legacy_status(LegacyPoStatus::FullyDelivered);
                    });
                }
            }
        }
    }

    /// Record a goods receipt against an existing PO.
    pub fn create_grn(
        &self,
        grn_number: GrnNumber,
        po_number: &PoNumber,
        actor: &Actor,
    ) -> Result<GrnRecord, WorkflowError> {
        if actor.user_role == UserRole::Vendor {
            return Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: "GOODS_RECEIPT".to_string(),
            });
        }
        let po = self.store.pos().get(po_number.as_str()).ok_or_else(|| {
            ValidationError::MissingReference {
                kind: EntityKind::Po.to_string(),
                number: po_number.to_string(),
            }
        })?;
        let grn = GrnRecord::created(
            grn_number.clone(),
            po.record.company_id.clone(),
            po_number.clone(),
        );
        self.store
            .grns()
            .insert_new(grn_number.as_str(), grn.clone())
            .map_err(|err| match err {
                StorageError::AlreadyExists { kind, id } => {
                    WorkflowError::Validation(ValidationError::DuplicateNumber {
                        kind,
                        number: id,
                    })
                }
                other => WorkflowError::Storage(other),
            })?;
        tracing::info!(grn = %grn.grn_number, po = %po_number, "GRN recorded");
        Ok(grn)
    }

    /// Raise an invoice against an existing GRN.
    pub fn create_invoice(
        &self,
        invoice_number: InvoiceNumber,
        grn_number: &GrnNumber,
        actor: &Actor,
    ) -> Result<InvoiceRecord, WorkflowError> {
        self.require_vendor(actor, "INVOICING")?;
        let grn = self.store.grns().get(grn_number.as_str()).ok_or_else(|| {
            ValidationError::MissingReference {
                kind: EntityKind::Grn.to_string(),
                number: grn_number.to_string(),
            }
        })?;
        let invoice = InvoiceRecord::raised(
            invoice_number.clone(),
            grn.record.company_id.clone(),
            grn_number.clone(),
        );
        self.store
            .invoices()
            .insert_new(invoice_number.as_str(), invoice.clone())
            .map_err(|err| match err {
                StorageError::AlreadyExists { kind, id } => {
                    WorkflowError::Validation(ValidationError::DuplicateNumber {
                        kind,
                        number: id,
                    })
                }
                other => WorkflowError::Storage(other),
            })?;
        tracing::info!(
            invoice = %invoice.invoice_number,
            grn = %grn_number,
            "invoice raised"
        );
        Ok(invoice)
    }

    // -- Gates --------------------------------------------------------------

    fn require_stage_role(&self, stage: ApprovalStage, actor: &Actor) -> Result<(), WorkflowError> {
        if stage.permits(actor.user_role) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: stage.key().to_string(),
            })
        }
    }

    fn require_vendor(&self, actor: &Actor, stage: &str) -> Result<(), WorkflowError> {
        if matches!(actor.user_role, UserRole::Vendor | UserRole::SuperAdmin) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: stage.to_string(),
            })
        }
    }

    fn require_requestor_or_admin(
        &self,
        pr: &PrRecord,
        actor: &Actor,
        stage: &str,
    ) -> Result<(), WorkflowError> {
        let is_requestor = actor.user_id == pr.created_by.user_id;
        let is_admin = matches!(
            actor.user_role,
            UserRole::CompanyAdmin | UserRole::SuperAdmin
        );
        if is_requestor || is_admin {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                role: actor.user_role.to_string(),
                stage: stage.to_string(),
            })
        }
    }

    /// A PR must be waiting exactly at `stage` for a gate action. Waiting at
    /// the other gate is a concurrency symptom; not waiting at all is a
    /// request against the wrong lifecycle phase.
    fn require_waiting_at(
        pr: &mut PrRecord,
        stage: ApprovalStage,
        operation: &str,
    ) -> Result<(), WorkflowError> {
        match pr.current_stage {
            Some(current) if current == stage => Ok(()),
            Some(current) => Err(WorkflowError::StaleState {
                entity: pr.pr_number.to_string(),
                expected: stage.key().to_string(),
                found: current.key().to_string(),
            }),
            None => Err(WorkflowError::Validation(ValidationError::InvalidState {
                entity: pr.pr_number.to_string(),
                status: pr.legacy_status.to_string(),
                operation: operation.to_string(),
            })),
        }
    }

    // -- Events -------------------------------------------------------------

    fn emit_pr_event(
        &self,
        event_type: WorkflowEventType,
        pr: &PrRecord,
        previous_status: Option<UnifiedStatus>,
        previous_stage: Option<ApprovalStage>,
        actor: &Actor,
        rejection: Option<EventRejection>,
    ) {
        let snapshot = EntitySnapshot {
            display_id: pr.pr_number.to_string(),
            created_by: pr.created_by.user_id.clone(),
            created_by_email: pr.created_by.user_email.clone(),
            created_by_name: pr.created_by.user_name.clone(),
            total_amount: pr.total_amount,
            item_count: pr.item_count,
            vendor_id: pr.vendor_id.clone(),
            vendor_name: pr.vendor_name.clone(),
            location_id: pr.location_id.clone(),
            location_name: pr.location_name.clone(),
        };
        self.bus.emit(WorkflowEvent {
            event_id: EventId::new(),
            event_type,
            event_timestamp: Utc::now(),
            company_id: pr.company_id.clone(),
            entity_type: EntityKind::Pr,
            entity_id: pr.pr_number.to_string(),
            current_stage: pr.current_stage.map(|s| s.key().to_string()),
            previous_stage: previous_stage.map(|s| s.key().to_string()),
            current_status: pr.unified_status,
            previous_status,
            triggered_by: actor.clone(),
            rejection,
            entity_snapshot: snapshot,
        });
    }
}
