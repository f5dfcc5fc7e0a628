//! # The In-Process Event Bus
//!
//! Decouples the stage engine from notification dispatch. [`EventBus::emit`]
//! is fire-and-forget: it never blocks, never errors back into the caller,
//! and returns before any handler runs. Dispatch happens on a background
//! task; handler errors and panics are caught and logged there, never
//! propagated — a failing notification handler must never fail the
//! workflow transition that produced the event.
//!
//! This layer offers no durability. An event with no matching subscriber is
//! dropped; a durable delivery log, if wanted, belongs to a downstream
//! subscriber.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::event::{EventPattern, WorkflowEvent};

/// An error returned by an event handler. Logged by the bus, never
/// propagated to the emitter.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HandlerError {
    /// What went wrong, for the operator log.
    pub message: String,
}

impl HandlerError {
    /// Build a handler error from any displayable cause.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A subscriber on the bus.
pub trait EventHandler: Send + Sync {
    /// A short name for the operator log.
    fn name(&self) -> &str;

    /// Handle one event. Errors are logged and retried by the bus up to its
    /// retry policy; they never reach the emitter.
    fn handle(&self, event: &WorkflowEvent) -> Result<(), HandlerError>;
}

/// Bounded retry for failing handlers: a fixed number of attempts with a
/// fixed pause between them. Retries affect only the notification side;
/// workflow state committed before the event was emitted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per handler per event (first try included).
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

struct Subscription {
    pattern: EventPattern,
    handler: Arc<dyn EventHandler>,
}

struct BusInner {
    subscriptions: RwLock<Vec<Subscription>>,
    tx: UnboundedSender<WorkflowEvent>,
    rx: Mutex<Option<UnboundedReceiver<WorkflowEvent>>>,
    retry: RetryPolicy,
}

/// The in-process workflow event bus.
///
/// Cheap to clone; all clones share one channel and subscriber registry.
/// Call [`EventBus::start`] once a Tokio runtime exists to begin dispatch —
/// events emitted before that buffer in the channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with the default retry policy.
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    /// Create a bus with an explicit retry policy.
    pub fn with_retry(retry: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(BusInner {
                subscriptions: RwLock::new(Vec::new()),
                tx,
                rx: Mutex::new(Some(rx)),
                retry,
            }),
        }
    }

    /// Register a handler for events matching `pattern`.
    pub fn subscribe(&self, pattern: impl Into<EventPattern>, handler: Arc<dyn EventHandler>) {
        let pattern = pattern.into();
        tracing::debug!(pattern = %pattern, handler = handler.name(), "subscriber registered");
        self.inner.subscriptions.write().push(Subscription {
            pattern,
            handler,
        });
    }

    /// Publish an event. Never blocks, never errors back into the caller.
    pub fn emit(&self, event: WorkflowEvent) {
        let event_type = event.event_type;
        if self.inner.tx.send(event).is_err() {
            // Dispatcher gone. The transition already committed; all we owe
            // the operator is a log line.
            tracing::warn!(event_type = %event_type, "event bus channel closed; event dropped");
        }
    }

    /// Spawn the dispatcher task. Returns `None` if already started.
    ///
    /// Requires a running Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let mut rx = self.inner.rx.lock().take()?;
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch_event(&inner, event).await;
            }
        }))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch_event(inner: &BusInner, event: WorkflowEvent) {
    let handlers: Vec<Arc<dyn EventHandler>> = {
        let subs = inner.subscriptions.read();
        subs.iter()
            .filter(|s| s.pattern.matches(event.event_type))
            .map(|s| Arc::clone(&s.handler))
            .collect()
    };

    if handlers.is_empty() {
        tracing::debug!(
            event_type = %event.event_type,
            entity_id = %event.entity_id,
            "no subscriber for event; dropped"
        );
        return;
    }

    for handler in handlers {
        run_handler(handler, &event, inner.retry).await;
    }
}

/// Run one handler with bounded retry. Panics and errors stop here.
async fn run_handler(handler: Arc<dyn EventHandler>, event: &WorkflowEvent, retry: RetryPolicy) {
    let attempts = retry.max_attempts.max(1);
    for attempt in 1..=attempts {
        match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
            Ok(Ok(())) => {
                tracing::trace!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    attempt,
                    "event handled"
                );
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    entity_id = %event.entity_id,
                    attempt,
                    error = %e,
                    "event handler failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    entity_id = %event.entity_id,
                    attempt,
                    "event handler panicked"
                );
            }
        }
        if attempt < attempts {
            tokio::time::sleep(retry.backoff).await;
        }
    }
    tracing::error!(
        handler = handler.name(),
        event_type = %event.event_type,
        entity_id = %event.entity_id,
        attempts,
        "event handler exhausted retries; giving up"
    );
}
