//! # Status Vocabularies and the Unified Mapping
//!
//! Every workflow entity carries two status fields: a *legacy* status in the
//! vocabulary its screens and reports have always used, and a *unified*
//! status in the canonical cross-entity vocabulary used for consistent
//! querying. The legacy→unified mapping is a fixed, deterministic function:
//! many legacy statuses may share a unified image, but a single legacy
//! status has exactly one.
//!
//! Unknown legacy values are never guessed at. [`unified_status_for`]
//! returns [`MappedStatus::Unrecognized`] and the caller parks the record at
//! [`UnifiedStatus::NeedsReview`] for the integrity audit to flag.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The kinds of workflow entity that carry a legacy/unified status pair.
///
/// `Pr` doubles as "Order" — in PR-enabled companies the two are synonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Purchase requisition (order).
    Pr,
    /// Purchase order.
    Po,
    /// Goods receipt note.
    Grn,
    /// Invoice.
    Invoice,
    /// Shipment.
    Shipment,
}

impl EntityKind {
    /// Return the wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pr => "pr",
            Self::Po => "po",
            Self::Grn => "grn",
            Self::Invoice => "invoice",
            Self::Shipment => "shipment",
        }
    }

    /// All entity kinds.
    pub fn all() -> &'static [EntityKind] {
        &[Self::Pr, Self::Po, Self::Grn, Self::Invoice, Self::Shipment]
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UnifiedStatus — the canonical vocabulary
// ---------------------------------------------------------------------------

/// The canonical cross-entity status vocabulary.
///
/// Legacy per-entity statuses map onto this set for consistent querying and
/// reporting. [`UnifiedStatus::NeedsReview`] is the safe parking state for
/// records whose legacy status fell outside the known vocabulary — it is
/// only ever produced for unrecognized input, never by a live transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnifiedStatus {
    /// Not yet submitted.
    Draft,
    /// Awaiting site-admin approval.
    PendingSiteAdminApproval,
    /// Awaiting company-admin approval.
    PendingCompanyAdminApproval,
    /// Fully approved, not yet linked to a PO.
    Approved,
    /// Rejected at an approval stage. Terminal.
    Rejected,
    /// Cancelled by the requestor. Terminal.
    Cancelled,
    /// A PO exists for this document.
    PoIssued,
    /// Acknowledged by the vendor.
    Acknowledged,
    /// Goods dispatched.
    Dispatched,
    /// Goods in transit.
    InTransit,
    /// Goods delivered.
    Delivered,
    /// Goods received and receipted.
    Received,
    /// Invoiced.
    Invoiced,
    /// Invoice settled. Terminal.
    Paid,
    /// Document closed. Terminal.
    Closed,
    /// Parked for operator review: the legacy status was not recognized.
    NeedsReview,
}

impl UnifiedStatus {
    /// Return the wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingSiteAdminApproval => "PENDING_SITE_ADMIN_APPROVAL",
            Self::PendingCompanyAdminApproval => "PENDING_COMPANY_ADMIN_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::PoIssued => "PO_ISSUED",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Dispatched => "DISPATCHED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Received => "RECEIVED",
            Self::Invoiced => "INVOICED",
            Self::Paid => "PAID",
            Self::Closed => "CLOSED",
            Self::NeedsReview => "NEEDS_REVIEW",
        }
    }
}

impl std::fmt::Display for UnifiedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Legacy vocabularies
// ---------------------------------------------------------------------------

macro_rules! legacy_vocabulary {
    (
        $(#[$doc:meta])*
        $name:ident {
            $( $(#[$vdoc:meta])* $variant:ident = $wire:literal => $unified:ident ),+ $(,)?
        }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vdoc])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Return the legacy wire string.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            /// Parse a legacy wire string. `None` for values outside the
            /// known vocabulary — the caller decides how to park them.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $( $wire => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// The unified image of this legacy status. Total and
            /// deterministic: one legacy status, one unified status.
            pub fn unified(&self) -> UnifiedStatus {
                match self {
                    $( Self::$variant => UnifiedStatus::$unified, )+
                }
            }

            /// All statuses in this vocabulary.
            pub fn all() -> &'static [$name] {
                &[ $( Self::$variant, )+ ]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

legacy_vocabulary!(
    /// The PR/order legacy status vocabulary.
    LegacyPrStatus {
        /// Not yet submitted.
        Draft = "Draft" => Draft,
        /// Submitted; awaiting the site-admin gate.
        Submitted = "Submitted" => PendingSiteAdminApproval,
        /// Passed the site-admin gate; awaiting the company-admin gate.
        SiteAdminApproved = "Site-Admin-Approved" => PendingCompanyAdminApproval,
        /// Fully approved; eligible for PO creation.
        CompanyAdminApproved = "Company-Admin-Approved" => Approved,
        /// Rejected at the site-admin gate. Terminal.
        RejectedBySiteAdmin = "Rejected-by-Site-Admin" => Rejected,
        /// Rejected at the company-admin gate. Terminal.
        RejectedByCompanyAdmin = "Rejected-by-Company-Admin" => Rejected,
        /// Linked into a purchase order.
        PoCreated = "PO-Created" => PoIssued,
        /// All items delivered. Terminal.
        FullyDelivered = "Fully-Delivered" => Delivered,
        /// Cancelled by the requestor. Terminal.
        Cancelled = "Cancelled" => Cancelled,
    }
);

legacy_vocabulary!(
    /// The purchase-order legacy status vocabulary.
    LegacyPoStatus {
        /// PO issued to the vendor.
        Created = "Created" => PoIssued,
        /// Vendor acknowledged the PO.
        Acknowledged = "Acknowledged" => Acknowledged,
        /// Vendor dispatched against the PO.
        Dispatched = "Dispatched" => Dispatched,
        /// All linked PRs delivered.
        FullyDelivered = "Fully-Delivered" => Delivered,
        /// PO closed out. Terminal.
        Closed = "Closed" => Closed,
    }
);

legacy_vocabulary!(
    /// The shipment legacy status vocabulary. A shipment record only exists
    /// once dispatch has happened, so the vocabulary starts at `Dispatched`.
    /// `InTransit` and `OutForDelivery` share a unified image — the mapping
    /// is many-to-one by design.
    LegacyShipmentStatus {
        /// Handed to the carrier.
        Dispatched = "Dispatched" => Dispatched,
        /// Moving through the carrier network.
        InTransit = "In-Transit" => InTransit,
        /// On the final delivery leg.
        OutForDelivery = "Out-for-Delivery" => InTransit,
        /// Delivered. Terminal.
        Delivered = "Delivered" => Delivered,
    }
);

legacy_vocabulary!(
    /// The goods-receipt-note legacy status vocabulary.
    LegacyGrnStatus {
        /// Receipt recorded.
        Created = "Created" => Received,
        /// Receipt verified against the PO.
        Verified = "Verified" => Received,
        /// Receipt disputed. Terminal.
        Disputed = "Disputed" => Rejected,
    }
);

legacy_vocabulary!(
    /// The invoice legacy status vocabulary.
    LegacyInvoiceStatus {
        /// Invoice raised against a GRN.
        Raised = "Raised" => Invoiced,
        /// Invoice submitted for payment.
        Submitted = "Submitted" => Invoiced,
        /// Invoice settled. Terminal.
        Paid = "Paid" => Paid,
        /// Invoice rejected. Terminal.
        Rejected = "Rejected" => Rejected,
    }
);

// ---------------------------------------------------------------------------
// Dispatch / delivery flags
// ---------------------------------------------------------------------------

/// The PR's dispatch flag. Terminal values require a shipment record to
/// exist for the PR — enforced forward by the engine, audited backward by
/// the integrity checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// Nothing dispatched.
    #[serde(rename = "Not-Dispatched")]
    NotDispatched,
    /// Some items dispatched.
    #[serde(rename = "Partially-Dispatched")]
    PartiallyDispatched,
    /// All items dispatched.
    #[serde(rename = "Dispatched")]
    Dispatched,
}

/// The PR's delivery flag. Same shipment-evidence rule as
/// [`DispatchStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Nothing delivered.
    #[serde(rename = "Not-Delivered")]
    NotDelivered,
    /// Some items delivered.
    #[serde(rename = "Partially-Delivered")]
    PartiallyDelivered,
    /// All items delivered.
    #[serde(rename = "Delivered")]
    Delivered,
}

impl DispatchStatus {
    /// Whether this flag asserts that any dispatch has happened.
    pub fn claims_dispatch(&self) -> bool {
        !matches!(self, Self::NotDispatched)
    }
}

impl DeliveryStatus {
    /// Whether this flag asserts that any delivery has happened.
    pub fn claims_delivery(&self) -> bool {
        !matches!(self, Self::NotDelivered)
    }
}

// ---------------------------------------------------------------------------
// The mapping function
// ---------------------------------------------------------------------------

/// The result of mapping a raw legacy status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedStatus {
    /// The legacy value is in the known vocabulary; here is its image.
    Mapped(UnifiedStatus),
    /// The legacy value is outside the known vocabulary. Do not guess —
    /// park the record at [`UnifiedStatus::NeedsReview`] and flag it.
    Unrecognized,
}

impl MappedStatus {
    /// The unified status a caller should persist: the mapped image, or the
    /// review parking state for unrecognized input.
    pub fn or_needs_review(self) -> UnifiedStatus {
        match self {
            Self::Mapped(u) => u,
            Self::Unrecognized => UnifiedStatus::NeedsReview,
        }
    }
}

/// Map a raw legacy status string to its canonical unified status.
///
/// Pure and total: any string is accepted, unknown values come back as
/// [`MappedStatus::Unrecognized`] rather than being silently dropped or
/// guessed at.
pub fn unified_status_for(kind: EntityKind, legacy: &str) -> MappedStatus {
    let mapped = match kind {
        EntityKind::Pr => LegacyPrStatus::parse(legacy).map(|s| s.unified()),
        EntityKind::Po => LegacyPoStatus::parse(legacy).map(|s| s.unified()),
        EntityKind::Grn => LegacyGrnStatus::parse(legacy).map(|s| s.unified()),
        EntityKind::Invoice => LegacyInvoiceStatus::parse(legacy).map(|s| s.unified()),
        EntityKind::Shipment => LegacyShipmentStatus::parse(legacy).map(|s| s.unified()),
    };
    match mapped {
        Some(u) => MappedStatus::Mapped(u),
        None => MappedStatus::Unrecognized,
    }
}
