//! Event handler registry.
//!
//! Maps each event method to the handlers currently subscribed. Every handler
//! carries the decoder for its own payload type, so subscriptions to the same
//! method with different types stay independent. Callers mutate it on
//! subscribe and unsubscribe; the dispatcher reads it through snapshots, so
//! handlers can be added or removed while an event is being dispatched.

// ============================================================================
// Imports
// ============================================================================

use std::any::{Any, TypeId, type_name};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::value::RawValue;
use tracing::warn;

use crate::error::Result;
use crate::identifiers::BrowsingContextId;
use crate::protocol::EventArgs;
use crate::protocol::envelope::decode_payload;

// ============================================================================
// Types
// ============================================================================

/// Type-erased decoded event payload.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Decodes an event's deferred `params` into one handler payload type.
pub(crate) type Decoder = fn(&RawValue) -> Result<DecodedEvent>;

/// Type-erased handler callback.
pub(crate) type HandlerFn = Box<dyn Fn(Payload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Locally unique handler identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandlerId(u64);

/// An event payload decoded into one handler payload type.
pub(crate) struct DecodedEvent {
    /// Type the payload was decoded into.
    pub payload_type: TypeId,
    /// The typed payload.
    pub payload: Payload,
    /// Browsing context the event belongs to, used for scope filtering.
    pub context: Option<BrowsingContextId>,
}

fn decode_event<E: EventArgs>(params: &RawValue) -> Result<DecodedEvent> {
    let event: E = decode_payload(params)?;
    let context = event.context().cloned();
    Ok(DecodedEvent {
        payload_type: TypeId::of::<E>(),
        payload: Arc::new(event),
        context,
    })
}

// ============================================================================
// Handler Constructors
// ============================================================================

/// Wraps a synchronous handler.
pub(crate) fn sync_handler<E, F>(handler: F) -> HandlerFn
where
    E: EventArgs,
    F: Fn(&E) + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    Box::new(move |payload: Payload| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            match payload.downcast_ref::<E>() {
                Some(event) => handler(event),
                None => warn!(expected = type_name::<E>(), "Event payload type mismatch"),
            }
        })
    })
}

/// Wraps an asynchronous handler.
pub(crate) fn async_handler<E, F, Fut>(handler: F) -> HandlerFn
where
    E: EventArgs,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handler = Arc::new(handler);
    Box::new(move |payload: Payload| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let event = payload.downcast_ref::<E>().cloned();
            match event {
                Some(event) => handler(event).await,
                None => warn!(expected = type_name::<E>(), "Event payload type mismatch"),
            }
        })
    })
}

// ============================================================================
// EventHandler
// ============================================================================

/// A registered handler with its scope filter.
pub(crate) struct EventHandler {
    id: HandlerId,
    payload_type: TypeId,
    decoder: Decoder,
    /// Handler fires only for these contexts; `None` = every event.
    contexts: Option<Vec<BrowsingContextId>>,
    callback: HandlerFn,
}

impl EventHandler {
    /// Returns the handler id.
    #[inline]
    pub(crate) fn id(&self) -> HandlerId {
        self.id
    }

    /// Returns the payload type this handler expects.
    #[inline]
    pub(crate) fn payload_type(&self) -> TypeId {
        self.payload_type
    }

    /// Returns `true` if an event carrying `context` should reach this handler.
    pub(crate) fn accepts(&self, context: Option<&BrowsingContextId>) -> bool {
        match &self.contexts {
            None => true,
            Some(scope) => context.is_some_and(|context| scope.contains(context)),
        }
    }

    /// Invokes the handler with a decoded payload.
    #[inline]
    pub(crate) fn invoke(&self, payload: Payload) -> BoxFuture<'static, ()> {
        (self.callback)(payload)
    }
}

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Event method → handlers. Methods without handlers have no entry.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    slots: RwLock<FxHashMap<String, Vec<Arc<EventHandler>>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    /// Appends a handler for `method` whose payload type is `E`.
    ///
    /// An empty context list is treated as no restriction.
    pub(crate) fn add<E: EventArgs>(
        &self,
        method: &str,
        contexts: Option<Vec<BrowsingContextId>>,
        callback: HandlerFn,
    ) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler = Arc::new(EventHandler {
            id,
            payload_type: TypeId::of::<E>(),
            decoder: decode_event::<E>,
            contexts: contexts.filter(|contexts| !contexts.is_empty()),
            callback,
        });

        let mut slots = self.slots.write();
        slots.entry(method.to_string()).or_default().push(handler);
        id
    }

    /// Removes one handler. Returns `false` if it was not registered.
    ///
    /// The method's entry goes with its last handler, so its events are no
    /// longer decoded.
    pub(crate) fn remove(&self, method: &str, id: HandlerId) -> bool {
        let mut slots = self.slots.write();
        let Some(handlers) = slots.get_mut(method) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|handler| handler.id() != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            slots.remove(method);
        }
        removed
    }

    /// Returns one decoder per distinct payload type subscribed to `method`.
    ///
    /// Empty when nothing listens to `method`.
    pub(crate) fn decoders(&self, method: &str) -> Vec<Decoder> {
        let slots = self.slots.read();
        let Some(handlers) = slots.get(method) else {
            return Vec::new();
        };

        let mut seen: Vec<TypeId> = Vec::with_capacity(1);
        handlers
            .iter()
            .filter(|handler| {
                if seen.contains(&handler.payload_type) {
                    false
                } else {
                    seen.push(handler.payload_type);
                    true
                }
            })
            .map(|handler| handler.decoder)
            .collect()
    }

    /// Returns the handlers for `method` as of now, in registration order.
    pub(crate) fn snapshot(&self, method: &str) -> Vec<Arc<EventHandler>> {
        self.slots
            .read()
            .get(method)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of handlers for `method`.
    pub(crate) fn handler_count(&self, method: &str) -> usize {
        self.slots
            .read()
            .get(method)
            .map_or(0, Vec::len)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::Value;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> HandlerFn {
        let counter = Arc::clone(counter);
        sync_handler(move |_: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).expect("raw value")
    }

    #[derive(Debug, Clone, serde::Deserialize)]
    struct Numbered {
        v: u32,
    }

    impl EventArgs for Numbered {}

    #[test]
    fn test_decoders_follow_handlers() {
        let registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(registry.decoders("a.b").is_empty());

        let id = registry.add::<Value>("a.b", None, counting_handler(&counter));
        let decoders = registry.decoders("a.b");
        assert_eq!(decoders.len(), 1);

        let event = decoders[0](&raw(r#"{"v":1}"#)).expect("decoded");
        assert_eq!(event.payload_type, TypeId::of::<Value>());
        assert_eq!(
            event.payload.downcast_ref::<Value>(),
            Some(&serde_json::json!({ "v": 1 }))
        );
        assert!(event.context.is_none());

        assert!(registry.remove("a.b", id));
        assert!(registry.decoders("a.b").is_empty());
        assert_eq!(registry.handler_count("a.b"), 0);
    }

    #[test]
    fn test_one_decoder_per_payload_type() {
        let registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.add::<Value>("a.b", None, counting_handler(&counter));
        registry.add::<Value>("a.b", None, counting_handler(&counter));
        registry.add::<Numbered>("a.b", None, sync_handler(|_: &Numbered| {}));

        let decoded: Vec<DecodedEvent> = registry
            .decoders("a.b")
            .into_iter()
            .map(|decode| decode(&raw(r#"{"v":3}"#)).expect("decoded"))
            .collect();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].payload_type, TypeId::of::<Value>());
        assert_eq!(decoded[1].payload_type, TypeId::of::<Numbered>());
        assert_eq!(
            decoded[1].payload.downcast_ref::<Numbered>().map(|n| n.v),
            Some(3)
        );
    }

    #[test]
    fn test_add_and_remove_exactly_one() {
        let registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = registry.add::<Value>("a.b", None, counting_handler(&counter));
        let second = registry.add::<Value>("a.b", None, counting_handler(&counter));
        assert_ne!(first, second);
        assert_eq!(registry.handler_count("a.b"), 2);

        assert!(registry.remove("a.b", first));
        assert!(!registry.remove("a.b", first));

        let remaining = registry.snapshot("a.b");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), second);
    }

    #[test]
    fn test_snapshot_is_stable_during_mutation() {
        let registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry.add::<Value>("a.b", None, counting_handler(&counter));

        let snapshot = registry.snapshot("a.b");
        registry.remove("a.b", id);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.handler_count("a.b"), 0);
    }

    #[test]
    fn test_context_filter() {
        let registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = BrowsingContextId::new("c1");
        let c2 = BrowsingContextId::new("c2");

        registry.add::<Value>("a.b", Some(vec![c1.clone()]), counting_handler(&counter));
        registry.add::<Value>("a.b", None, counting_handler(&counter));
        registry.add::<Value>("a.b", Some(Vec::new()), counting_handler(&counter));

        let handlers = registry.snapshot("a.b");
        let scoped = &handlers[0];
        let global = &handlers[1];
        let empty_scope = &handlers[2];

        assert!(scoped.accepts(Some(&c1)));
        assert!(!scoped.accepts(Some(&c2)));
        assert!(!scoped.accepts(None));

        assert!(global.accepts(Some(&c2)));
        assert!(global.accepts(None));
        assert!(empty_scope.accepts(Some(&c2)));
    }

    #[tokio::test]
    async fn test_invoke_with_mismatched_payload_is_ignored() {
        let counter = Arc::new(AtomicUsize::new(0));
        let callback = counting_handler(&counter);

        callback(Arc::new(42_u32)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        callback(Arc::new(Value::Null)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
