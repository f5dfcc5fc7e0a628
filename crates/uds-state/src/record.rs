//! # Normalized Entity Records
//!
//! One canonical shape per entity, produced at the persistence boundary.
//! The engine and the integrity checker operate on these structs only —
//! there are no defensive fallback chains over historical document shapes;
//! normalization happens once, on load.
//!
//! Every record stores both its legacy status and its unified status. The
//! redundancy is deliberate: the unified field is what reporting queries
//! read, and drift between the two is exactly what the integrity checker
//! detects. [`PrRecord::refresh_unified`] and its siblings recompute the
//! unified field from the legacy field, never the other way around.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use uds_core::{
    Actor, Amount, CompanyId, GrnNumber, InvoiceNumber, LocationId, PoNumber, PrNumber,
    ShipmentId, VendorId,
};

use crate::rejection::RejectionRecord;
use crate::stage::ApprovalStage;
use crate::status::{
    DeliveryStatus, DispatchStatus, LegacyGrnStatus, LegacyInvoiceStatus, LegacyPoStatus,
    LegacyPrStatus, LegacyShipmentStatus, UnifiedStatus,
};

// ---------------------------------------------------------------------------
// PrRecord
// ---------------------------------------------------------------------------

/// A purchase requisition (order) document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRecord {
    /// The requisition number; also the display identifier.
    pub pr_number: PrNumber,
    /// Owning company (tenant).
    pub company_id: CompanyId,
    /// The vendor expected to fulfill.
    pub vendor_id: VendorId,
    /// Vendor display name, when denormalized onto the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    /// Delivery location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    /// Delivery location display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    /// The requestor.
    pub created_by: Actor,
    /// Order total in minor units.
    pub total_amount: Amount,
    /// Number of line items.
    pub item_count: u32,
    /// Legacy workflow status.
    pub legacy_status: LegacyPrStatus,
    /// Canonical status; must be the image of `legacy_status`.
    pub unified_status: UnifiedStatus,
    /// Dispatch flag; terminal values require a shipment to exist.
    pub dispatch_status: DispatchStatus,
    /// Delivery flag; terminal values require a shipment to exist.
    pub delivery_status: DeliveryStatus,
    /// The approval stage the PR is waiting at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<ApprovalStage>,
    /// The PO this PR was linked into, once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<PoNumber>,
    /// The rejection, when the PR was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionRecord>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl PrRecord {
    /// Create a draft PR.
    pub fn draft(
        pr_number: PrNumber,
        company_id: CompanyId,
        vendor_id: VendorId,
        created_by: Actor,
        total_amount: Amount,
        item_count: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            pr_number,
            company_id,
            vendor_id,
            vendor_name: None,
            location_id: None,
            location_name: None,
            created_by,
            total_amount,
            item_count,
            legacy_status: LegacyPrStatus::Draft,
            unified_status: UnifiedStatus::Draft,
            dispatch_status: DispatchStatus::NotDispatched,
            delivery_status: DeliveryStatus::NotDelivered,
            current_stage: None,
            po_number: None,
            rejection: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: attach a delivery location.
    pub fn with_location(mut self, id: LocationId, name: impl Into<String>) -> Self {
        self.location_id = Some(id);
        self.location_name = Some(name.into());
        self
    }

    /// Builder: attach the vendor display name.
    pub fn with_vendor_name(mut self, name: impl Into<String>) -> Self {
        self.vendor_name = Some(name.into());
        self
    }

    /// Set the legacy status and recompute the unified field in one step.
    pub fn set_legacy_status(&mut self, status: LegacyPrStatus) {
        self.legacy_status = status;
        self.unified_status = status.unified();
        self.updated_at = Utc::now();
    }

    /// Recompute the unified field from the legacy field.
    pub fn refresh_unified(&mut self) {
        self.unified_status = self.legacy_status.unified();
    }

    /// Whether the stored unified status is the image of the legacy status.
    /// Records parked at [`UnifiedStatus::NeedsReview`] are consistent by
    /// definition; parking is a deliberate state, not drift.
    pub fn unified_consistent(&self) -> bool {
        self.unified_status == UnifiedStatus::NeedsReview
            || self.unified_status == self.legacy_status.unified()
    }

    /// Whether the PR may be (re)submitted: drafts, cancellations, and
    /// rejections are resubmittable; everything else is in flight or done.
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self.legacy_status,
            LegacyPrStatus::Draft
                | LegacyPrStatus::Cancelled
                | LegacyPrStatus::RejectedBySiteAdmin
                | LegacyPrStatus::RejectedByCompanyAdmin
        )
    }

    /// Whether the PR is terminal-approved and not yet linked to a PO.
    pub fn is_linkable(&self) -> bool {
        self.legacy_status == LegacyPrStatus::CompanyAdminApproved && self.po_number.is_none()
    }
}

// ---------------------------------------------------------------------------
// PoRecord
// ---------------------------------------------------------------------------

/// A purchase order created from one or more approved PRs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoRecord {
    /// The purchase order number.
    pub po_number: PoNumber,
    /// Owning company (tenant).
    pub company_id: CompanyId,
    /// The vendor the PO is issued to.
    pub vendor_id: VendorId,
    /// The business date of the order.
    pub po_date: NaiveDate,
    /// The PRs this PO was created from. Never empty via the engine.
    pub linked_prs: Vec<PrNumber>,
    /// Legacy PO status.
    pub legacy_status: LegacyPoStatus,
    /// Canonical status; must be the image of `legacy_status`.
    pub unified_status: UnifiedStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl PoRecord {
    /// Create a freshly issued PO.
    pub fn issued(
        po_number: PoNumber,
        company_id: CompanyId,
        vendor_id: VendorId,
        po_date: NaiveDate,
        linked_prs: Vec<PrNumber>,
    ) -> Self {
        let now = Utc::now();
        Self {
            po_number,
            company_id,
            vendor_id,
            po_date,
            linked_prs,
            legacy_status: LegacyPoStatus::Created,
            unified_status: LegacyPoStatus::Created.unified(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the legacy status and recompute the unified field in one step.
    pub fn set_legacy_status(&mut self, status: LegacyPoStatus) {
        self.legacy_status = status;
        self.unified_status = status.unified();
        self.updated_at = Utc::now();
    }

    /// Recompute the unified field from the legacy field.
    pub fn refresh_unified(&mut self) {
        self.unified_status = self.legacy_status.unified();
    }

    /// Whether the stored unified status is the image of the legacy status.
    /// Records parked at [`UnifiedStatus::NeedsReview`] are consistent by
    /// definition; parking is a deliberate state, not drift.
    pub fn unified_consistent(&self) -> bool {
        self.unified_status == UnifiedStatus::NeedsReview
            || self.unified_status == self.legacy_status.unified()
    }
}

// ---------------------------------------------------------------------------
// ShipmentRecord
// ---------------------------------------------------------------------------

/// A shipment created against a PR at dispatch time.
///
/// `pr_number` is a weak back-reference: lookup only, not ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    /// The shipment identifier.
    pub shipment_id: ShipmentId,
    /// Owning company (tenant).
    pub company_id: CompanyId,
    /// The PR this shipment fulfills.
    pub pr_number: PrNumber,
    /// Legacy shipment status.
    pub legacy_status: LegacyShipmentStatus,
    /// Canonical status; must be the image of `legacy_status`.
    pub unified_status: UnifiedStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl ShipmentRecord {
    /// Create a shipment at the moment of dispatch.
    pub fn dispatched(shipment_id: ShipmentId, company_id: CompanyId, pr_number: PrNumber) -> Self {
        let now = Utc::now();
        Self {
            shipment_id,
            company_id,
            pr_number,
            legacy_status: LegacyShipmentStatus::Dispatched,
            unified_status: LegacyShipmentStatus::Dispatched.unified(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the legacy status and recompute the unified field in one step.
    pub fn set_legacy_status(&mut self, status: LegacyShipmentStatus) {
        self.legacy_status = status;
        self.unified_status = status.unified();
        self.updated_at = Utc::now();
    }

    /// Recompute the unified field from the legacy field.
    pub fn refresh_unified(&mut self) {
        self.unified_status = self.legacy_status.unified();
    }

    /// Whether the stored unified status is the image of the legacy status.
    /// Records parked at [`UnifiedStatus::NeedsReview`] are consistent by
    /// definition; parking is a deliberate state, not drift.
    pub fn unified_consistent(&self) -> bool {
        self.unified_status == UnifiedStatus::NeedsReview
            || self.unified_status == self.legacy_status.unified()
    }
}

// ---------------------------------------------------------------------------
// GrnRecord
// ---------------------------------------------------------------------------

/// A goods receipt note recorded against a PO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnRecord {
    /// The GRN number.
    pub grn_number: GrnNumber,
    /// Owning company (tenant).
    pub company_id: CompanyId,
    /// The PO receipted against. Must exist.
    pub po_number: PoNumber,
    /// Legacy GRN status.
    pub legacy_status: LegacyGrnStatus,
    /// Canonical status; must be the image of `legacy_status`.
    pub unified_status: UnifiedStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl GrnRecord {
    /// Create a freshly recorded GRN.
    pub fn created(grn_number: GrnNumber, company_id: CompanyId, po_number: PoNumber) -> Self {
        let now = Utc::now();
        Self {
            grn_number,
            company_id,
            po_number,
            legacy_status: LegacyGrnStatus::Created,
            unified_status: LegacyGrnStatus::Created.unified(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the legacy status and recompute the unified field in one step.
    pub fn set_legacy_status(&mut self, status: LegacyGrnStatus) {
        self.legacy_status = status;
        self.unified_status = status.unified();
        self.updated_at = Utc::now();
    }

    /// Recompute the unified field from the legacy field.
    pub fn refresh_unified(&mut self) {
        self.unified_status = self.legacy_status.unified();
    }

    /// Whether the stored unified status is the image of the legacy status.
    /// Records parked at [`UnifiedStatus::NeedsReview`] are consistent by
    /// definition; parking is a deliberate state, not drift.
    pub fn unified_consistent(&self) -> bool {
        self.unified_status == UnifiedStatus::NeedsReview
            || self.unified_status == self.legacy_status.unified()
    }
}

// ---------------------------------------------------------------------------
// InvoiceRecord
// ---------------------------------------------------------------------------

/// An invoice raised against a GRN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// The invoice number.
    pub invoice_number: InvoiceNumber,
    /// Owning company (tenant).
    pub company_id: CompanyId,
    /// The GRN invoiced against. Must exist.
    pub grn_number: GrnNumber,
    /// Legacy invoice status.
    pub legacy_status: LegacyInvoiceStatus,
    /// Canonical status; must be the image of `legacy_status`.
    pub unified_status: UnifiedStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl InvoiceRecord {
    /// Create a freshly raised invoice.
    pub fn raised(
        invoice_number: InvoiceNumber,
        company_id: CompanyId,
        grn_number: GrnNumber,
    ) -> Self {
        let now = Utc::now();
        Self {
            invoice_number,
            company_id,
            grn_number,
            legacy_status: LegacyInvoiceStatus::Raised,
            unified_status: LegacyInvoiceStatus::Raised.unified(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the legacy status and recompute the unified field in one step.
    pub fn set_legacy_status(&mut self, status: LegacyInvoiceStatus) {
        self.legacy_status = status;
        self.unified_status = status.unified();
        self.updated_at = Utc::now();
    }

    /// Recompute the unified field from the legacy field.
    pub fn refresh_unified(&mut self) {
        self.unified_status = self.legacy_status.unified();
    }

    /// Whether the stored unified status is the image of the legacy status.
    /// Records parked at [`UnifiedStatus::NeedsReview`] are consistent by
    /// definition; parking is a deliberate state, not drift.
    pub fn unified_consistent(&self) -> bool {
        self.unified_status == UnifiedStatus::NeedsReview
            || self.unified_status == self.legacy_status.unified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uds_core::{UserId, UserRole};

    fn requestor() -> Actor {
        Actor::new(UserId::new("u-1"), "Asha", UserRole::Employee).with_email("asha@acme.example")
    }

    fn draft_pr() -> PrRecord {
        PrRecord::draft(
            PrNumber::new("PR-001"),
            CompanyId::new("acme"),
            VendorId::new("v-1"),
            requestor(),
            Amount::from_minor_units(45_000),
            3,
        )
    }

    #[test]
    fn draft_starts_consistent() {
        let pr = draft_pr();
        assert!(pr.unified_consistent());
        assert_eq!(pr.unified_status, UnifiedStatus::Draft);
        assert!(pr.is_resubmittable());
        assert!(!pr.is_linkable());
    }

    #[test]
    fn set_legacy_status_keeps_unified_in_lockstep() {
        let mut pr = draft_pr();
        pr.set_legacy_status(LegacyPrStatus::Submitted);
        assert_eq!(pr.unified_status, UnifiedStatus::PendingSiteAdminApproval);
        pr.set_legacy_status(LegacyPrStatus::CompanyAdminApproved);
        assert!(pr.is_linkable());
    }

    #[test]
    fn every_record_kind_sets_legacy_with_unified_in_lockstep() {
        let mut grn = GrnRecord::created(
            GrnNumber::new("GRN-1"),
            CompanyId::new("acme"),
            PoNumber::new("PO-1"),
        );
        grn.set_legacy_status(LegacyGrnStatus::Verified);
        assert_eq!(grn.unified_status, LegacyGrnStatus::Verified.unified());
        assert!(grn.unified_consistent());

        let mut invoice = InvoiceRecord::raised(
            InvoiceNumber::new("INV-1"),
            CompanyId::new("acme"),
            GrnNumber::new("GRN-1"),
        );
        invoice.set_legacy_status(LegacyInvoiceStatus::Paid);
        assert_eq!(invoice.unified_status, LegacyInvoiceStatus::Paid.unified());
        assert!(invoice.unified_consistent());
    }

    #[test]
    fn refresh_unified_repairs_drift() {
        let mut pr = draft_pr();
        // Simulate drift written by a crashed legacy code path.
        pr.unified_status = UnifiedStatus::Delivered;
        assert!(!pr.unified_consistent());
        pr.refresh_unified();
        assert!(pr.unified_consistent());
        assert_eq!(pr.unified_status, UnifiedStatus::Draft);
    }

    #[test]
    fn pr_json_shape() {
        let pr = draft_pr();
        let json = serde_json::to_value(&pr).unwrap();
        assert_eq!(json["prNumber"], "PR-001");
        assert_eq!(json["legacyStatus"], "Draft");
        assert_eq!(json["unifiedStatus"], "DRAFT");
        assert_eq!(json["dispatchStatus"], "Not-Dispatched");
        assert!(json.get("poNumber").is_none());
    }

    #[test]
    fn shipment_dispatched_is_consistent() {
        let s = ShipmentRecord::dispatched(
            ShipmentId::new("SHP-1"),
            CompanyId::new("acme"),
            PrNumber::new("PR-001"),
        );
        assert!(s.unified_consistent());
        assert_eq!(s.unified_status, UnifiedStatus::Dispatched);
    }

    #[test]
    fn po_record_round_trip() {
        let po = PoRecord::issued(
            PoNumber::new("PO-9"),
            CompanyId::new("acme"),
            VendorId::new("v-1"),
            NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            vec![PrNumber::new("PR-001")],
        );
        let json = serde_json::to_string(&po).unwrap();
        let back: PoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, po);
        assert_eq!(back.unified_status, UnifiedStatus::PoIssued);
    }
}
