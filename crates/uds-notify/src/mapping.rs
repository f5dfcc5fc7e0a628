//! # Notification Mapping Rules
//!
//! Declarative routing: which workflow events produce which notifications,
//! to whom, over which channels. Rules live in a YAML or JSON document
//! maintained by operators, not in code — adding a recipient group to an
//! approval event is a config change, not a release.
//!
//! ## Selection
//!
//! A company-specific rule shadows a platform-wide (wildcard) rule for the
//! same slot — the (entity type, event type, stage) triple — so a tenant can
//! replace the default routing for one event without forking the whole
//! document. Survivors are ordered by descending priority.

use std::path::Path;

use serde::{Deserialize, Serialize};

use uds_core::{Amount, CompanyId, UserRole};
use uds_events::{WorkflowEvent, WorkflowEventType};
use uds_state::{ApprovalStage, EntityKind, UnifiedStatus};

use crate::resolver::RecipientResolver;
use crate::NotifyError;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email delivery.
    Email,
    /// In-app notification feed.
    InApp,
    /// Outbound webhook.
    Webhook,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Email => "email",
            Self::InApp => "in_app",
            Self::Webhook => "webhook",
        })
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Optional guards a matching event must also satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingConditions {
    /// Only fire for amounts at or above this threshold (minor units).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Amount>,
    /// Only fire when the event's resulting status equals this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_status: Option<UnifiedStatus>,
    /// Only fire when the triggering actor holds this role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_actor_role: Option<UserRole>,
}

impl MappingConditions {
    /// Whether `event` satisfies every present guard.
    pub fn satisfied_by(&self, event: &WorkflowEvent) -> bool {
        if let Some(min) = self.min_amount {
            if event.entity_snapshot.total_amount < min {
                return false;
            }
        }
        if let Some(status) = self.required_status {
            if event.current_status != status {
                return false;
            }
        }
        if let Some(role) = self.required_actor_role {
            if event.triggered_by.user_role != role {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// NotificationMapping
// ---------------------------------------------------------------------------

/// One routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMapping {
    /// Stable identifier, used for shadowing diagnostics and lint output.
    pub mapping_id: String,
    /// The tenant this rule belongs to; `None` is a platform-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    /// Restrict to one entity type; `None` matches any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityKind>,
    /// The event type this rule fires on.
    pub event_type: WorkflowEventType,
    /// Restrict to one approval stage (the stage the action happened at,
    /// or the stage the entity arrived at); `None` matches any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_key: Option<String>,
    /// Extra guards beyond the type/stage match.
    #[serde(default)]
    pub conditions: MappingConditions,
    /// Who gets notified.
    pub recipients: Vec<RecipientResolver>,
    /// Over which channels.
    pub channels: Vec<Channel>,
    /// The message template to render with.
    pub template_key: String,
    /// Skip the user who triggered the event.
    #[serde(default)]
    pub exclude_actor: bool,
    /// Inactive rules are kept in the document but never fire.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Higher fires first within a selection.
    #[serde(default)]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

impl NotificationMapping {
    /// Whether this rule applies to `event`, ignoring activity and
    /// conditions — the structural match only.
    pub fn matches(&self, event: &WorkflowEvent) -> bool {
        if self.event_type != event.event_type {
            return false;
        }
        if let Some(company) = &self.company_id {
            if *company != event.company_id {
                return false;
            }
        }
        if let Some(entity) = self.entity_type {
            if entity != event.entity_type {
                return false;
            }
        }
        if let Some(key) = &self.stage_key {
            let acted = event.previous_stage.as_deref() == Some(key.as_str());
            let arrived = event.current_stage.as_deref() == Some(key.as_str());
            if !acted && !arrived {
                return false;
            }
        }
        true
    }

    /// The shadowing slot: company-specific rules displace wildcard rules
    /// that share this key.
    fn slot(&self) -> (Option<EntityKind>, WorkflowEventType, Option<&str>) {
        (self.entity_type, self.event_type, self.stage_key.as_deref())
    }
}

// ---------------------------------------------------------------------------
// MappingCatalog
// ---------------------------------------------------------------------------

/// The full rule document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingCatalog {
    /// All rules, wildcard and company-specific alike.
    pub mappings: Vec<NotificationMapping>,
}

impl MappingCatalog {
    /// Parse a YAML rule document.
    pub fn from_yaml_str(input: &str) -> Result<Self, NotifyError> {
        serde_yaml::from_str(input).map_err(NotifyError::from)
    }

    /// Parse a JSON rule document.
    pub fn from_json_str(input: &str) -> Result<Self, NotifyError> {
        serde_json::from_str(input).map_err(NotifyError::from)
    }

    /// Load a rule document, dispatching on the file extension
    /// (`.yaml`/`.yml` vs `.json`).
    pub fn from_path(path: &Path) -> Result<Self, NotifyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| NotifyError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_yaml_str(&raw),
        }
    }

    /// The rules that should fire for `event`, company overrides applied,
    /// conditions evaluated, ordered by descending priority.
    pub fn select(&self, event: &WorkflowEvent) -> Vec<&NotificationMapping> {
        let candidates: Vec<&NotificationMapping> = self
            .mappings
            .iter()
            .filter(|m| m.is_active && m.matches(event) && m.conditions.satisfied_by(event))
            .collect();

        let mut selected: Vec<&NotificationMapping> = candidates
            .iter()
            .filter(|m| {
                // A wildcard rule survives only if no company-specific rule
                // occupies the same slot.
                m.company_id.is_some()
                    || !candidates
                        .iter()
                        .any(|other| other.company_id.is_some() && other.slot() == m.slot())
            })
            .copied()
            .collect();
        selected.sort_by(|a, b| b.priority.cmp(&a.priority));
        selected
    }

    /// Static checks an operator runs before deploying a rule document.
    /// Returns one finding per problem; an empty vector means clean.
    pub fn lint(&self) -> Vec<String> {
        let mut findings = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();
        for mapping in &self.mappings {
            if !seen_ids.insert(mapping.mapping_id.as_str()) {
                findings.push(format!("duplicate mapping id \"{}\"", mapping.mapping_id));
            }
            if mapping.recipients.is_empty() {
                findings.push(format!(
                    "mapping \"{}\" has no recipient resolvers",
                    mapping.mapping_id
                ));
            }
            if mapping.channels.is_empty() {
                findings.push(format!(
                    "mapping \"{}\" has no delivery channels",
                    mapping.mapping_id
                ));
            }
            if mapping.template_key.trim().is_empty() {
                findings.push(format!(
                    "mapping \"{}\" has a blank template key",
                    mapping.mapping_id
                ));
            }
            if let Some(key) = &mapping.stage_key {
                if ApprovalStage::from_key(key).is_none() {
                    findings.push(format!(
                        "mapping \"{}\" references unknown stage key \"{}\"",
                        mapping.mapping_id, key
                    ));
                }
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uds_core::{Actor, EventId, UserId, VendorId};
    use uds_events::EntitySnapshot;

    fn event(company: &str, event_type: WorkflowEventType) -> WorkflowEvent {
        WorkflowEvent {
            event_id: EventId::new(),
            event_type,
            event_timestamp: Utc::now(),
            company_id: CompanyId::new(company),
            entity_type: EntityKind::Pr,
            entity_id: "PR-001".to_string(),
            current_stage: Some("SITE_ADMIN_APPROVAL".to_string()),
            previous_stage: None,
            current_status: UnifiedStatus::PendingSiteAdminApproval,
            previous_status: Some(UnifiedStatus::Draft),
            triggered_by: Actor::new(UserId::new("u-1"), "Asha", UserRole::Employee),
            rejection: None,
            entity_snapshot: EntitySnapshot {
                display_id: "PR-001".to_string(),
                created_by: UserId::new("u-1"),
                created_by_email: Some("asha@acme.example".to_string()),
                created_by_name: "Asha".to_string(),
                total_amount: Amount::from_minor_units(45_000),
                item_count: 3,
                vendor_id: VendorId::new("v-1"),
                vendor_name: None,
                location_id: None,
                location_name: None,
            },
        }
    }

    fn rule(id: &str, company: Option<&str>, priority: i32) -> NotificationMapping {
        NotificationMapping {
            mapping_id: id.to_string(),
            company_id: company.map(CompanyId::new),
            entity_type: Some(EntityKind::Pr),
            event_type: WorkflowEventType::EntitySubmitted,
            stage_key: Some("SITE_ADMIN_APPROVAL".to_string()),
            conditions: MappingConditions::default(),
            recipients: vec![RecipientResolver::Requestor],
            channels: vec![Channel::Email],
            template_key: "pr_submitted".to_string(),
            exclude_actor: false,
            is_active: true,
            priority,
        }
    }

    #[test]
    fn company_rule_shadows_wildcard_for_same_slot() {
        let catalog = MappingCatalog {
            mappings: vec![rule("global", None, 0), rule("acme-own", Some("acme"), 0)],
        };
        let selected = catalog.select(&event("acme", WorkflowEventType::EntitySubmitted));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].mapping_id, "acme-own");

        // Other tenants still get the wildcard.
        let selected = catalog.select(&event("globex", WorkflowEventType::EntitySubmitted));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].mapping_id, "global");
    }

    #[test]
    fn inactive_rules_never_fire() {
        let mut inactive = rule("off", None, 0);
        inactive.is_active = false;
        let catalog = MappingCatalog {
            mappings: vec![inactive],
        };
        assert!(catalog
            .select(&event("acme", WorkflowEventType::EntitySubmitted))
            .is_empty());
    }

    #[test]
    fn selection_orders_by_priority() {
        let mut low = rule("low", None, 1);
        low.stage_key = None;
        let mut high = rule("high", None, 10);
        high.entity_type = None;
        let catalog = MappingCatalog {
            mappings: vec![low, high],
        };
        let selected = catalog.select(&event("acme", WorkflowEventType::EntitySubmitted));
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].mapping_id, "high");
    }

    #[test]
    fn min_amount_condition_gates_small_orders() {
        let mut gated = rule("big-orders", None, 0);
        gated.conditions.min_amount = Some(Amount::from_minor_units(100_000));
        let catalog = MappingCatalog {
            mappings: vec![gated],
        };
        assert!(catalog
            .select(&event("acme", WorkflowEventType::EntitySubmitted))
            .is_empty());
    }

    #[test]
    fn yaml_document_round_trips() {
        let yaml = r#"
- mappingId: pr-submitted-site-admins
  eventType: ENTITY_SUBMITTED
  entityType: pr
  stageKey: SITE_ADMIN_APPROVAL
  recipients:
    - strategy: current_stage_role_holders
  channels: [email, in_app]
  templateKey: pr_submitted
  priority: 5
"#;
        let catalog = MappingCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.mappings.len(), 1);
        let m = &catalog.mappings[0];
        assert!(m.is_active);
        assert!(m.company_id.is_none());
        assert_eq!(m.channels, vec![Channel::Email, Channel::InApp]);
        assert!(catalog.lint().is_empty());
    }

    #[test]
    fn lint_flags_duplicates_and_dangling_stage_keys() {
        let mut bad = rule("dup", None, 0);
        bad.stage_key = Some("FINANCE_APPROVAL".to_string());
        bad.recipients = Vec::new();
        let catalog = MappingCatalog {
            mappings: vec![rule("dup", None, 0), bad],
        };
        let findings = catalog.lint();
        assert!(findings.iter().any(|f| f.contains("duplicate mapping id")));
        assert!(findings.iter().any(|f| f.contains("no recipient resolvers")));
        assert!(findings.iter().any(|f| f.contains("FINANCE_APPROVAL")));
    }
}
