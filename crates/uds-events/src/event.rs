//! # The Workflow Event Schema
//!
//! An immutable, timestamped fact produced once per workflow transition.
//! The JSON shape is a stable contract consumed by the notification layer
//! and any downstream log — field names are camelCase and do not change
//! with internal refactors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uds_core::{Actor, Amount, CompanyId, EventId, LocationId, UserId, VendorId};
use uds_state::{EntityKind, UnifiedStatus};

// ---------------------------------------------------------------------------
// WorkflowEventType
// ---------------------------------------------------------------------------

/// The canonical workflow event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowEventType {
    /// An entity was submitted into the approval workflow.
    #[serde(rename = "ENTITY_SUBMITTED")]
    EntitySubmitted,
    /// An entity passed a non-final approval stage.
    #[serde(rename = "ENTITY_APPROVED_AT_STAGE")]
    EntityApprovedAtStage,
    /// An entity passed its final approval stage.
    #[serde(rename = "ENTITY_APPROVED")]
    EntityApproved,
    /// An entity was rejected at an approval stage.
    #[serde(rename = "ENTITY_REJECTED")]
    EntityRejected,
    /// An entity was cancelled by its requestor.
    #[serde(rename = "ENTITY_CANCELLED")]
    EntityCancelled,
}

impl WorkflowEventType {
    /// Return the wire string for this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntitySubmitted => "ENTITY_SUBMITTED",
            Self::EntityApprovedAtStage => "ENTITY_APPROVED_AT_STAGE",
            Self::EntityApproved => "ENTITY_APPROVED",
            Self::EntityRejected => "ENTITY_REJECTED",
            Self::EntityCancelled => "ENTITY_CANCELLED",
        }
    }

    /// All event types.
    pub fn all() -> &'static [WorkflowEventType] {
        &[
            Self::EntitySubmitted,
            Self::EntityApprovedAtStage,
            Self::EntityApproved,
            Self::EntityRejected,
            Self::EntityCancelled,
        ]
    }
}

impl std::fmt::Display for WorkflowEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventPattern
// ---------------------------------------------------------------------------

/// A subscription pattern over event types: an exact wire string
/// (`ENTITY_REJECTED`), a trailing-wildcard prefix (`ENTITY_*`), or the
/// match-all `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPattern(String);

impl EventPattern {
    /// Wrap a pattern string.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The raw pattern string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this pattern matches an event type.
    pub fn matches(&self, event_type: WorkflowEventType) -> bool {
        match self.0.as_str() {
            "*" => true,
            p => match p.strip_suffix('*') {
                Some(prefix) => event_type.as_str().starts_with(prefix),
                None => event_type.as_str() == p,
            },
        }
    }
}

impl From<&str> for EventPattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<WorkflowEventType> for EventPattern {
    fn from(value: WorkflowEventType) -> Self {
        Self::new(value.as_str())
    }
}

impl std::fmt::Display for EventPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Event payload pieces
// ---------------------------------------------------------------------------

/// The rejection payload attached to `ENTITY_REJECTED` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRejection {
    /// The catalog code.
    pub reason_code: String,
    /// The catalog label.
    pub reason_label: String,
    /// Remarks, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// A denormalized projection of the entity at the moment of the event.
///
/// Notification templates read from this snapshot only — handlers never go
/// back to the store, so a late-running handler still describes the entity
/// as it was when the transition committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    /// The entity's display identifier (e.g. the PR number).
    pub display_id: String,
    /// The requestor's user id.
    pub created_by: UserId,
    /// The requestor's email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_email: Option<String>,
    /// The requestor's display name.
    pub created_by_name: String,
    /// Order total in minor units.
    pub total_amount: Amount,
    /// Number of line items.
    pub item_count: u32,
    /// The vendor.
    pub vendor_id: VendorId,
    /// Vendor display name, when denormalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    /// Delivery location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    /// Delivery location display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// An immutable workflow fact, produced once per transition.
///
/// Not persisted as a queryable entity by this layer — durable delivery
/// logs are the notification collaborator's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    /// Unique event identifier.
    pub event_id: EventId,
    /// What happened.
    pub event_type: WorkflowEventType,
    /// When it happened.
    pub event_timestamp: DateTime<Utc>,
    /// The tenant the entity belongs to.
    pub company_id: CompanyId,
    /// The kind of entity.
    pub entity_type: EntityKind,
    /// The entity's identifier, as a string.
    pub entity_id: String,
    /// The stage the entity is now waiting at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    /// The stage the entity just left, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_stage: Option<String>,
    /// The entity's unified status after the transition.
    pub current_status: UnifiedStatus,
    /// The entity's unified status before the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<UnifiedStatus>,
    /// Who performed the transition.
    pub triggered_by: Actor,
    /// Rejection details, on `ENTITY_REJECTED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<EventRejection>,
    /// The entity as it was at commit time.
    pub entity_snapshot: EntitySnapshot,
}
