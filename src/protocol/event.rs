//! Event payload types.
//!
//! Events are notifications sent from the remote end when browser activity
//! occurs. Each handler names the payload type it expects, which implements
//! [`EventArgs`]; the broker decodes an event's `params` once per distinct
//! type among the method's live handlers, and not at all when none exist.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;

use crate::identifiers::BrowsingContextId;

// ============================================================================
// EventArgs
// ============================================================================

/// Payload type of a subscribable event.
///
/// Payloads that belong to a browsing context return it from
/// [`context`](Self::context); handlers subscribed with a context scope only
/// fire for events whose context is in that scope.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Deserialize)]
/// struct NavigationInfo {
///     context: BrowsingContextId,
///     url: String,
/// }
///
/// impl EventArgs for NavigationInfo {
///     fn context(&self) -> Option<&BrowsingContextId> {
///         Some(&self.context)
///     }
/// }
/// ```
pub trait EventArgs: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Browsing context the event belongs to, if any.
    fn context(&self) -> Option<&BrowsingContextId> {
        None
    }
}

impl EventArgs for serde_json::Value {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    struct Load {
        context: BrowsingContextId,
    }

    impl EventArgs for Load {
        fn context(&self) -> Option<&BrowsingContextId> {
            Some(&self.context)
        }
    }

    #[test]
    fn test_context_default_is_none() {
        let value = serde_json::json!({ "context": "ctx" });
        assert!(EventArgs::context(&value).is_none());
    }

    #[test]
    fn test_context_override() {
        let load: Load = serde_json::from_str(r#"{"context":"ctx-1"}"#).expect("parse");
        assert_eq!(load.context().map(BrowsingContextId::as_str), Some("ctx-1"));
    }
}
