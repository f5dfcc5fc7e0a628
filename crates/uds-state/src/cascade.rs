//! # Cascade Consistency Predicates
//!
//! Pure helpers answering "does the parent's claim fit the child's
//! evidence?". The integrity checker (which has the store and can find the
//! actual shipments) drives these; nothing here performs I/O.
//!
//! Cascade integrity: a child entity's status never implies a stronger
//! claim than its parent's status supports, and a parent never claims more
//! than its children evidence.

use crate::status::{DeliveryStatus, DispatchStatus, LegacyShipmentStatus};

/// Whether a PR's dispatch flag is supported by shipment evidence.
///
/// Any dispatch claim requires at least one shipment to exist; the absence
/// of a claim is always fine.
pub fn dispatch_claim_supported(dispatch: DispatchStatus, has_shipment: bool) -> bool {
    !dispatch.claims_dispatch() || has_shipment
}

/// Whether a PR's delivery flag is supported by shipment evidence.
pub fn delivery_claim_supported(
    delivery: DeliveryStatus,
    shipment: Option<LegacyShipmentStatus>,
) -> bool {
    match delivery {
        DeliveryStatus::NotDelivered => true,
        DeliveryStatus::PartiallyDelivered => shipment.is_some(),
        DeliveryStatus::Delivered => shipment == Some(LegacyShipmentStatus::Delivered),
    }
}

/// Whether the PR's delivery flag and its shipment's status agree on
/// terminal delivery. The two must make the same "delivered" claim: a PR
/// marked delivered with an in-transit shipment overstates, a PR not marked
/// delivered with a delivered shipment understates.
pub fn terminal_delivery_consistent(
    delivery: DeliveryStatus,
    shipment: LegacyShipmentStatus,
) -> bool {
    (delivery == DeliveryStatus::Delivered) == (shipment == LegacyShipmentStatus::Delivered)
}
