//! # Dataset Fixtures
//!
//! Loads a workflow dataset dump (JSON or YAML) into an in-memory store.
//! Dumps carry raw legacy status strings, exactly as the upstream system
//! exported them; mapping to the unified vocabulary happens here, and any
//! value outside the known vocabulary parks the record at `NEEDS_REVIEW`
//! instead of failing the load or guessing.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use uds_core::{
    Actor, Amount, CompanyId, GrnNumber, InvoiceNumber, LocationId, PoNumber, PrNumber,
    ShipmentId, VendorId,
};
use uds_state::{
    ApprovalStage, DeliveryStatus, DispatchStatus, EntityKind, GrnRecord, InvoiceRecord,
    LegacyGrnStatus, LegacyInvoiceStatus, LegacyPoStatus, LegacyPrStatus, LegacyShipmentStatus,
    PoRecord, PrRecord, ShipmentRecord, UnifiedStatus,
};
use uds_workflow::{InMemoryWorkflowStore, WorkflowStore};

/// A raw PR document as dumped by the upstream system.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPr {
    /// Requisition number.
    pub pr_number: String,
    /// Owning company.
    pub company_id: String,
    /// Fulfilling vendor.
    pub vendor_id: String,
    /// Vendor display name.
    #[serde(default)]
    pub vendor_name: Option<String>,
    /// Delivery location.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Delivery location display name.
    #[serde(default)]
    pub location_name: Option<String>,
    /// The requestor.
    pub created_by: Actor,
    /// Order total in minor units.
    pub total_amount: u64,
    /// Line item count.
    #[serde(default)]
    pub item_count: u32,
    /// Raw legacy status string.
    pub status: String,
    /// Dispatch flag; absent means not dispatched.
    #[serde(default)]
    pub dispatch_status: Option<DispatchStatus>,
    /// Delivery flag; absent means not delivered.
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    /// The stage the PR is waiting at, by stage key.
    #[serde(default)]
    pub current_stage: Option<ApprovalStage>,
    /// Linked PO, if one was created.
    #[serde(default)]
    pub po_number: Option<String>,
}

/// A raw PO document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPo {
    /// Order number.
    pub po_number: String,
    /// Owning company.
    pub company_id: String,
    /// The vendor the PO is issued to.
    pub vendor_id: String,
    /// Business date of the order.
    pub po_date: chrono::NaiveDate,
    /// The PRs the PO was created from.
    #[serde(default)]
    pub linked_prs: Vec<String>,
    /// Raw legacy status string.
    pub status: String,
}

/// A raw shipment document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShipment {
    /// Shipment identifier.
    pub shipment_id: String,
    /// Owning company.
    pub company_id: String,
    /// The PR fulfilled.
    pub pr_number: String,
    /// Raw legacy status string.
    pub status: String,
}

/// A raw GRN document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGrn {
    /// Receipt number.
    pub grn_number: String,
    /// Owning company.
    pub company_id: String,
    /// The PO receipted against.
    pub po_number: String,
    /// Raw legacy status string.
    pub status: String,
}

/// A raw invoice document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInvoice {
    /// Invoice number.
    pub invoice_number: String,
    /// Owning company.
    pub company_id: String,
    /// The GRN invoiced against.
    pub grn_number: String,
    /// Raw legacy status string.
    pub status: String,
}

/// A full dataset dump.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureFile {
    /// Purchase requisitions.
    #[serde(default)]
    pub prs: Vec<RawPr>,
    /// Purchase orders.
    #[serde(default)]
    pub pos: Vec<RawPo>,
    /// Shipments.
    #[serde(default)]
    pub shipments: Vec<RawShipment>,
    /// Goods receipt notes.
    #[serde(default)]
    pub grns: Vec<RawGrn>,
    /// Invoices.
    #[serde(default)]
    pub invoices: Vec<RawInvoice>,
}

/// What the loader did with the dump.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents loaded per kind, in PR/PO/shipment/GRN/invoice order.
    pub loaded: usize,
    /// Documents whose legacy status was outside the known vocabulary
    /// and were parked at `NEEDS_REVIEW`.
    pub parked: Vec<String>,
}

impl FixtureFile {
    /// Parse a dump from disk. `.json` files are JSON; anything else is
    /// treated as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset dump {}", path.display()))?;
        let fixture = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&text)
                .with_context(|| format!("invalid JSON dump {}", path.display()))?
        } else {
            serde_yaml::from_str(&text)
                .with_context(|| format!("invalid YAML dump {}", path.display()))?
        };
        Ok(fixture)
    }

    /// Load every document into a fresh in-memory store.
    pub fn into_store(self) -> Result<(Arc<InMemoryWorkflowStore>, LoadReport)> {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let mut report = LoadReport::default();

        for raw in self.prs {
            let parked = load_pr(store.as_ref(), raw, &mut report)?;
            if let Some(id) = parked {
                report.parked.push(id);
            }
        }
        for raw in self.pos {
            let parked = load_po(store.as_ref(), raw, &mut report)?;
            if let Some(id) = parked {
                report.parked.push(id);
            }
        }
        for raw in self.shipments {
            let parked = load_shipment(store.as_ref(), raw, &mut report)?;
            if let Some(id) = parked {
                report.parked.push(id);
            }
        }
        for raw in self.grns {
            let parked = load_grn(store.as_ref(), raw, &mut report)?;
            if let Some(id) = parked {
                report.parked.push(id);
            }
        }
        for raw in self.invoices {
            let parked = load_invoice(store.as_ref(), raw, &mut report)?;
            if let Some(id) = parked {
                report.parked.push(id);
            }
        }

        if !report.parked.is_empty() {
            tracing::warn!(
                parked = report.parked.len(),
                "documents with unrecognized legacy statuses were parked at NEEDS_REVIEW"
            );
        }
        Ok((store, report))
    }
}

/// Map a raw legacy string to the typed legacy value plus the unified
/// status to store. Unknown strings come back as the kind's initial legacy
/// value parked at `NEEDS_REVIEW`.
fn park_note(kind: EntityKind, id: &str, raw: &str) -> String {
    tracing::warn!(
        entity = kind.as_str(),
        id,
        status = raw,
        "unrecognized legacy status; parking at NEEDS_REVIEW"
    );
    format!("{}:{}", kind.as_str(), id)
}

fn load_pr(
    store: &InMemoryWorkflowStore,
    raw: RawPr,
    report: &mut LoadReport,
) -> Result<Option<String>> {
    let mut record = PrRecord::draft(
        PrNumber::new(raw.pr_number.as_str()),
        CompanyId::new(raw.company_id),
        VendorId::new(raw.vendor_id),
        raw.created_by,
        Amount::from_minor_units(raw.total_amount),
        raw.item_count,
    );
    record.vendor_name = raw.vendor_name;
    record.location_id = raw.location_id.map(LocationId::new);
    record.location_name = raw.location_name;
    record.dispatch_status = raw.dispatch_status.unwrap_or(DispatchStatus::NotDispatched);
    record.delivery_status = raw.delivery_status.unwrap_or(DeliveryStatus::NotDelivered);
    record.current_stage = raw.current_stage;
    record.po_number = raw.po_number.map(PoNumber::new);

    let parked = match LegacyPrStatus::parse(&raw.status) {
        Some(status) => {
            record.set_legacy_status(status);
            None
        }
        None => {
            record.unified_status = UnifiedStatus::NeedsReview;
            Some(park_note(EntityKind::Pr, &raw.pr_number, &raw.status))
        }
    };
    store
        .prs()
        .insert_new(raw.pr_number.as_str(), record)
        .with_context(|| format!("duplicate PR {} in dump", raw.pr_number))?;
    report.loaded += 1;
    Ok(parked)
}

fn load_po(
    store: &InMemoryWorkflowStore,
    raw: RawPo,
    report: &mut LoadReport,
) -> Result<Option<String>> {
    let mut record = PoRecord::issued(
        PoNumber::new(raw.po_number.as_str()),
        CompanyId::new(raw.company_id),
        VendorId::new(raw.vendor_id),
        raw.po_date,
        raw.linked_prs.iter().map(|p| PrNumber::new(p.as_str())).collect(),
    );
    let parked = match LegacyPoStatus::parse(&raw.status) {
        Some(status) => {
            record.set_legacy_status(status);
            None
        }
        None => {
            record.unified_status = UnifiedStatus::NeedsReview;
            Some(park_note(EntityKind::Po, &raw.po_number, &raw.status))
        }
    };
    store
        .pos()
        .insert_new(raw.po_number.as_str(), record)
        .with_context(|| format!("duplicate PO {} in dump", raw.po_number))?;
    report.loaded += 1;
    Ok(parked)
}

fn load_shipment(
    store: &InMemoryWorkflowStore,
    raw: RawShipment,
    report: &mut LoadReport,
) -> Result<Option<String>> {
    let mut record = ShipmentRecord::dispatched(
        ShipmentId::new(raw.shipment_id.as_str()),
        CompanyId::new(raw.company_id),
        PrNumber::new(raw.pr_number),
    );
    let parked = match LegacyShipmentStatus::parse(&raw.status) {
        Some(status) => {
            record.set_legacy_status(status);
            None
        }
        None => {
            record.unified_status = UnifiedStatus::NeedsReview;
            Some(park_note(
                EntityKind::Shipment,
                &raw.shipment_id,
                &raw.status,
            ))
        }
    };
    store
        .shipments()
        .insert_new(raw.shipment_id.as_str(), record)
        .with_context(|| format!("duplicate shipment {} in dump", raw.shipment_id))?;
    report.loaded += 1;
    Ok(parked)
}

fn load_grn(
    store: &InMemoryWorkflowStore,
    raw: RawGrn,
    report: &mut LoadReport,
) -> Result<Option<String>> {
    let mut record = GrnRecord::created(
        GrnNumber::new(raw.grn_number.as_str()),
        CompanyId::new(raw.company_id),
        PoNumber::new(raw.po_number),
    );
    let parked = match LegacyGrnStatus::parse(&raw.status) {
        Some(status) => {
            record.set_legacy_status(status);
            None
        }
        None => {
            record.unified_status = UnifiedStatus::NeedsReview;
            Some(park_note(EntityKind::Grn, &raw.grn_number, &raw.status))
        }
    };
    store
        .grns()
        .insert_new(raw.grn_number.as_str(), record)
        .with_context(|| format!("duplicate GRN {} in dump", raw.grn_number))?;
    report.loaded += 1;
    Ok(parked)
}

fn load_invoice(
    store: &InMemoryWorkflowStore,
    raw: RawInvoice,
    report: &mut LoadReport,
) -> Result<Option<String>> {
    let mut record = InvoiceRecord::raised(
        InvoiceNumber::new(raw.invoice_number.as_str()),
        CompanyId::new(raw.company_id),
        GrnNumber::new(raw.grn_number),
    );
    let parked = match LegacyInvoiceStatus::parse(&raw.status) {
        Some(status) => {
            record.set_legacy_status(status);
            None
        }
        None => {
            record.unified_status = UnifiedStatus::NeedsReview;
            Some(park_note(
                EntityKind::Invoice,
                &raw.invoice_number,
                &raw.status,
            ))
        }
    };
    store
        .invoices()
        .insert_new(raw.invoice_number.as_str(), record)
        .with_context(|| format!("duplicate invoice {} in dump", raw.invoice_number))?;
    report.loaded += 1;
    Ok(parked)
}
