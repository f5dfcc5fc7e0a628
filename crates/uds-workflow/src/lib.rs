//! # uds-workflow
//!
//! The procurement transition engine: per-company stage configuration, the
//! versioned document store, and the engine that moves PRs, POs, shipments,
//! GRNs, and invoices through their lifecycles.
//!
//! ## Layering
//!
//! - [`config`] — which stages a company's chain contains.
//! - [`store`] — versioned persistence with optimistic concurrency and the
//!   atomic PO-linking primitive.
//! - [`engine`] — role gates, stage advancement, rejection, cancellation,
//!   fulfillment, and event emission.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod store;

pub use config::CompanyWorkflowConfig;
pub use engine::WorkflowEngine;
pub use store::{Collection, InMemoryWorkflowStore, Versioned, WorkflowStore};
