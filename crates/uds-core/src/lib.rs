#![deny(missing_docs)]

//! # uds-core — Foundational Types for the Uniform Distribution Stack
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `thiserror`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a distinct
//!    type. You cannot pass a [`PoNumber`] where a [`PrNumber`] is expected.
//!
//! 2. **Canonical-scheme checks are advisory, not constructive.** Document
//!    numbers arriving from historical tenant data may be malformed; they must
//!    remain representable so the reference-integrity audit can report them.
//!    `is_canonical()` answers the question without rejecting the value.
//!
//! 3. **[`WorkflowError`] hierarchy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests. Each variant is distinct
//!    enough for a caller to decide between surfacing, refetch-and-retry, and
//!    whole-operation retry.
//!
//! 4. **Integer money.** [`Amount`] is minor units in a `u64`. Floats never
//!    appear in persisted or canonicalized values.

pub mod actor;
pub mod error;
pub mod identity;
pub mod money;

// Re-export primary types at crate root for ergonomic imports.
pub use actor::{Actor, UserRole};
pub use error::{StorageError, ValidationError, WorkflowError};
pub use identity::{
    CompanyId, EventId, GrnNumber, InvoiceNumber, LocationId, PoNumber, PrNumber, ShipmentId,
    UserId, VendorId,
};
pub use money::Amount;
