//! # Notification Engine
//!
//! The bus subscriber that turns workflow events into deliveries: select
//! the rules that apply, resolve recipients, dedupe, and hand each delivery
//! to the sender. Runs entirely downstream of the workflow — a failure here
//! is retried by the bus and never touches committed workflow state.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use uds_core::CompanyId;
use uds_events::{EventHandler, HandlerError, WorkflowEvent, WorkflowEventType};

use crate::mapping::Channel;
use crate::provider::MappingProvider;
use crate::resolver::{DirectoryProvider, Recipient};
use crate::NotifyError;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// One delivery: a recipient, a channel, and what to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// The rule that produced this delivery.
    pub mapping_id: String,
    /// The template to render.
    pub template_key: String,
    /// Delivery channel.
    pub channel: Channel,
    /// Who receives it.
    pub recipient: Recipient,
    /// The event type being announced.
    pub event_type: WorkflowEventType,
    /// The entity's display identifier.
    pub entity_id: String,
    /// The tenant.
    pub company_id: CompanyId,
}

/// Delivers notifications. Implementations should deduplicate on the
/// (event, recipient, channel) they see across bus retries.
pub trait NotificationSender: Send + Sync {
    /// Deliver one notification.
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// NotificationEngine
// ---------------------------------------------------------------------------

/// The subscriber. Register it on the bus with the `"*"` pattern (or a
/// narrower one) and start the bus.
pub struct NotificationEngine {
    provider: Arc<dyn MappingProvider>,
    directory: Arc<dyn DirectoryProvider>,
    sender: Arc<dyn NotificationSender>,
}

impl NotificationEngine {
    /// Wire a provider, directory, and sender together.
    pub fn new(
        provider: Arc<dyn MappingProvider>,
        directory: Arc<dyn DirectoryProvider>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            provider,
            directory,
            sender,
        }
    }

    fn route(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        let catalog = self.provider.catalog()?;
        let selected = catalog.select(event);
        if selected.is_empty() {
            tracing::debug!(
                event_type = event.event_type.as_str(),
                entity = %event.entity_id,
                "no notification mapping matched"
            );
            return Ok(());
        }

        let actor_email = event
            .triggered_by
            .user_email
            .as_deref()
            .map(str::to_lowercase);
        // One delivery per (channel, address) per event, across all rules.
        let mut delivered: HashSet<(Channel, String)> = HashSet::new();
        let mut failures = 0usize;

        for mapping in selected {
            let mut recipients: Vec<Recipient> = Vec::new();
            for resolver in &mapping.recipients {
                recipients.extend(resolver.resolve(event, self.directory.as_ref()));
            }
            for recipient in recipients {
                let address = recipient.email.to_lowercase();
                if mapping.exclude_actor && Some(&address) == actor_email.as_ref() {
                    continue;
                }
                for channel in &mapping.channels {
                    if !delivered.insert((*channel, address.clone())) {
                        continue;
                    }
                    let notification = Notification {
                        mapping_id: mapping.mapping_id.clone(),
                        template_key: mapping.template_key.clone(),
                        channel: *channel,
                        recipient: recipient.clone(),
                        event_type: event.event_type,
                        entity_id: event.entity_id.clone(),
                        company_id: event.company_id.clone(),
                    };
                    if let Err(err) = self.sender.deliver(&notification) {
                        failures += 1;
                        tracing::warn!(
                            mapping = %mapping.mapping_id,
                            channel = %channel,
                            error = %err,
                            "notification delivery failed"
                        );
                    }
                }
            }
        }

        if failures > 0 {
            return Err(NotifyError::Delivery { failures });
        }
        Ok(())
    }
}

impl EventHandler for NotificationEngine {
    fn name(&self) -> &str {
        "notification-engine"
    }

    fn handle(&self, event: &WorkflowEvent) -> Result<(), HandlerError> {
        self.route(event).map_err(HandlerError::new)
    }
}
