//! Event dispatch task.
//!
//! The receive loop decodes events and queues them; a single dispatcher task
//! consumes the queue in arrival order and runs the matching handlers one at a
//! time, so a slow handler delays later events but never the receive loop or
//! command replies. A handler that panics is logged and skipped.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::registry::{DecodedEvent, HandlerRegistry};

// ============================================================================
// Types
// ============================================================================

/// A decoded event waiting for dispatch.
pub(crate) struct QueuedEvent {
    /// Event method.
    pub method: String,
    /// The payload, decoded once per payload type subscribed at receive time.
    pub decoded: Vec<DecodedEvent>,
}

/// Producer side of the event queue.
pub(crate) type EventSender = mpsc::UnboundedSender<QueuedEvent>;

/// Consumer side of the event queue.
pub(crate) type EventReceiver = mpsc::UnboundedReceiver<QueuedEvent>;

/// Creates the event queue.
pub(crate) fn queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Spawns the dispatcher task.
///
/// The task drains every queued event and exits once all senders are dropped.
pub(crate) fn spawn(registry: Arc<HandlerRegistry>, mut events: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(queued) = events.recv().await {
            dispatch(&registry, queued).await;
        }
        debug!("Event dispatcher stopped");
    })
}

/// Runs the handlers registered for one event, in registration order.
async fn dispatch(registry: &HandlerRegistry, queued: QueuedEvent) {
    let QueuedEvent { method, decoded } = queued;
    let handlers = registry.snapshot(&method);

    trace!(%method, handlers = handlers.len(), "Dispatching event");

    for handler in handlers {
        // Subscribed after the event was decoded
        let Some(event) = decoded
            .iter()
            .find(|event| event.payload_type == handler.payload_type())
        else {
            continue;
        };
        if !handler.accepts(event.context.as_ref()) {
            continue;
        }

        let invocation = handler.invoke(Arc::clone(&event.payload));
        if let Err(panic) = AssertUnwindSafe(invocation).catch_unwind().await {
            error!(
                %method,
                panic = %panic_message(panic.as_ref()),
                "Event handler panicked"
            );
        }
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
