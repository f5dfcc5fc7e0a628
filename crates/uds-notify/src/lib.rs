//! # uds-notify
//!
//! Notification routing for workflow events: a declarative rule document
//! (YAML/JSON) maps events to recipients and channels, company-specific
//! rules shadow platform defaults, and a bus subscriber performs the
//! resolution and fan-out with per-event deduplication.
//!
//! The routing layer holds no user data of its own — recipients are
//! resolved through a [`resolver::DirectoryProvider`] the host supplies,
//! and deliveries go through a [`engine::NotificationSender`].

#![deny(missing_docs)]
#![warn(clippy::all)]

use thiserror::Error;

pub mod engine;
pub mod mapping;
pub mod provider;
pub mod resolver;

pub use engine::{Notification, NotificationEngine, NotificationSender};
pub use mapping::{Channel, MappingCatalog, MappingConditions, NotificationMapping};
pub use provider::{CachedMappingProvider, FileMappingProvider, MappingProvider, StaticMappingProvider};
pub use resolver::{DirectoryProvider, Recipient, RecipientResolver};

/// Errors from loading rule documents and delivering notifications.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The rule document failed to parse as YAML.
    #[error("mapping document is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The rule document failed to parse as JSON.
    #[error("mapping document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The rule document could not be read.
    #[error("cannot read mapping document {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A provider- or sender-level validation failure.
    #[error("{0}")]
    Validation(String),

    /// One or more deliveries failed; the bus may retry the event.
    #[error("{failures} notification delivery(ies) failed")]
    Delivery {
        /// How many deliveries failed.
        failures: usize,
    },
}
