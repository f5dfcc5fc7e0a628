#![deny(missing_docs)]

//! # uds-events — The Workflow Event Bus
//!
//! The stage engine publishes a [`WorkflowEvent`] once per committed
//! transition; subscribers (the notification layer, downstream logs)
//! consume them asynchronously. The safety property of the whole design
//! lives here: **notifications degrade gracefully, workflow does not**.
//! [`EventBus::emit`] cannot block or fail the emitter, and handler
//! failures stop at the dispatcher.

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventHandler, HandlerError, RetryPolicy};
pub use event::{EntitySnapshot, EventPattern, EventRejection, WorkflowEvent, WorkflowEventType};
