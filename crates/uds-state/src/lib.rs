#![deny(missing_docs)]

//! # uds-state — The Status Reconciliation Model
//!
//! Defines the per-entity legacy status vocabularies, the canonical unified
//! vocabulary they map onto, the normalized entity records that carry both,
//! the approval stages, and the rejection reason catalog.
//!
//! ## Design
//!
//! The legacy system compared free-form status strings with equality and
//! substring checks, and unknown values fell through silently. Here every
//! vocabulary is a closed enum with an explicit wire form, the
//! legacy→unified mapping is a total function ([`unified_status_for`]), and
//! an out-of-vocabulary value is an explicit [`MappedStatus::Unrecognized`]
//! that callers must park at [`UnifiedStatus::NeedsReview`] — never guess,
//! never drop.
//!
//! Many legacy statuses may share one unified image; no legacy status has
//! two. The compiler enforces exhaustiveness wherever these enums are
//! matched.

pub mod cascade;
pub mod record;
pub mod rejection;
pub mod stage;
pub mod status;

pub use record::{GrnRecord, InvoiceRecord, PoRecord, PrRecord, ShipmentRecord};
pub use rejection::{RejectionCatalog, RejectionReason, RejectionRecord};
pub use stage::ApprovalStage;
pub use status::{
    unified_status_for, DeliveryStatus, DispatchStatus, EntityKind, LegacyGrnStatus,
    LegacyInvoiceStatus, LegacyPoStatus, LegacyPrStatus, LegacyShipmentStatus, MappedStatus,
    UnifiedStatus,
};
