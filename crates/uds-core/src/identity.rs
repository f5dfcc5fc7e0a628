//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the workflow core.
//! Each identifier is a distinct type — you cannot pass a [`GrnNumber`]
//! where an [`InvoiceNumber`] is expected.
//!
//! ## Canonical schemes
//!
//! Business document numbers follow a per-kind prefix scheme (`PR-`, `PO-`,
//! `GRN-`, `INV-`, `SHP-`) with a non-empty suffix. Construction does **not**
//! enforce the scheme: historical tenant data contains drifted identifiers
//! (raw storage object IDs pasted into reference fields), and those records
//! must remain loadable so the integrity checker can flag them. The
//! `is_canonical()` predicate is the single source of truth for the scheme.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Check a document number against a `PREFIX-suffix` scheme.
fn has_prefixed_suffix(value: &str, prefix: &str) -> bool {
    match value.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
        None => false,
    }
}

macro_rules! document_number {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw document number. Does not validate the scheme.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Access the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this number conforms to the tenant's canonical scheme.
            pub fn is_canonical(&self) -> bool {
                has_prefixed_suffix(&self.0, $prefix)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

document_number!(
    /// A purchase requisition number (canonical scheme `PR-<suffix>`).
    /// In PR-enabled companies this is also the order's display identifier.
    PrNumber,
    "PR-"
);

document_number!(
    /// A purchase order number (canonical scheme `PO-<suffix>`).
    PoNumber,
    "PO-"
);

document_number!(
    /// A goods receipt note number (canonical scheme `GRN-<suffix>`).
    GrnNumber,
    "GRN-"
);

document_number!(
    /// An invoice number (canonical scheme `INV-<suffix>`).
    InvoiceNumber,
    "INV-"
);

document_number!(
    /// A shipment identifier (canonical scheme `SHP-<suffix>`).
    ShipmentId,
    "SHP-"
);

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Access the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// A tenant (company) identifier. Opaque string scoped to the deployment.
    CompanyId
);

opaque_id!(
    /// A vendor identifier. Opaque string scoped to the deployment.
    VendorId
);

opaque_id!(
    /// A user identifier. Opaque string scoped to the deployment.
    UserId
);

opaque_id!(
    /// A delivery-location identifier. Opaque string scoped to a company.
    LocationId
);

/// A unique identifier for a workflow event. Always valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new random event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an event identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_number_canonical() {
        assert!(PrNumber::new("PR-001").is_canonical());
        assert!(PrNumber::new("PR-2024-0113").is_canonical());
        assert!(!PrNumber::new("PR-").is_canonical());
        assert!(!PrNumber::new("PO-001").is_canonical());
        assert!(!PrNumber::new("64f1c2a9e4b0d7").is_canonical());
        assert!(!PrNumber::new("").is_canonical());
    }

    #[test]
    fn each_kind_rejects_other_schemes() {
        assert!(PoNumber::new("PO-42").is_canonical());
        assert!(!PoNumber::new("PR-42").is_canonical());
        assert!(GrnNumber::new("GRN-42").is_canonical());
        assert!(!GrnNumber::new("GR-42").is_canonical());
        assert!(InvoiceNumber::new("INV-42").is_canonical());
        assert!(ShipmentId::new("SHP-42").is_canonical());
        assert!(!ShipmentId::new("SHIP-42").is_canonical());
    }

    #[test]
    fn non_canonical_values_remain_representable() {
        // Drifted historical data must round-trip so the audit can report it.
        let raw = PrNumber::new("64f1c2a9e4b0d7");
        let json = serde_json::to_string(&raw).unwrap();
        let back: PrNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(raw, back);
        assert!(!back.is_canonical());
    }

    #[test]
    fn serde_is_transparent() {
        let id = CompanyId::new("acme");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acme\"");
        let pr = PrNumber::new("PR-001");
        assert_eq!(serde_json::to_string(&pr).unwrap(), "\"PR-001\"");
    }

    #[test]
    fn event_id_unique_and_displayable() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
        assert_eq!(format!("{a}"), a.as_uuid().to_string());
    }

    #[test]
    fn display_matches_inner() {
        assert_eq!(PrNumber::new("PR-7").to_string(), "PR-7");
        assert_eq!(VendorId::new("v-1").to_string(), "v-1");
    }
}
