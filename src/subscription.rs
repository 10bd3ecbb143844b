//! Event subscriptions.
//!
//! A [`Subscription`] binds one local handler to one remote subscription id.
//! Unsubscribing removes exactly that handler and asks the remote end to stop
//! sending under that id; other subscriptions to the same event are untouched.
//!
//! # Example
//!
//! ```ignore
//! let subscription = broker
//!     .subscribe("log.entryAdded", |entry: &LogEntry| println!("{}", entry.text), Default::default())
//!     .await?;
//!
//! // ...
//!
//! subscription.unsubscribe().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::broker::{Broker, BrokerInner, HandlerId};
use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, SubscriptionId, UserContextId};
use crate::session::UnsubscribeCommand;

// ============================================================================
// SubscriptionOptions
// ============================================================================

/// Scope and timeout for a new subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Browsing contexts the handler is limited to. Empty = all.
    pub contexts: Vec<BrowsingContextId>,

    /// User contexts the remote subscription is limited to. Empty = all.
    pub user_contexts: Vec<UserContextId>,

    /// Timeout for the remote subscribe call.
    pub timeout: Option<Duration>,
}

impl SubscriptionOptions {
    /// Creates unscoped options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a browsing context to the scope.
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: impl Into<BrowsingContextId>) -> Self {
        self.contexts.push(context.into());
        self
    }

    /// Adds a user context to the scope.
    #[inline]
    #[must_use]
    pub fn with_user_context(mut self, user_context: impl Into<UserContextId>) -> Self {
        self.user_contexts.push(user_context.into());
        self
    }

    /// Sets the remote subscribe timeout.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// ContextSubscriptionOptions
// ============================================================================

/// Options for subscriptions made on behalf of a single browsing context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSubscriptionOptions {
    /// Timeout for the remote subscribe call.
    pub timeout: Option<Duration>,
}

impl ContextSubscriptionOptions {
    /// Builds [`SubscriptionOptions`] scoped to `context`.
    #[must_use]
    pub fn with_context(self, context: impl Into<BrowsingContextId>) -> SubscriptionOptions {
        SubscriptionOptions {
            contexts: vec![context.into()],
            user_contexts: Vec::new(),
            timeout: self.timeout,
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A live event subscription.
///
/// Dropping it without calling [`unsubscribe`](Self::unsubscribe) removes the
/// local handler immediately and sends the remote unsubscribe in the
/// background.
pub struct Subscription {
    id: SubscriptionId,
    method: String,
    handler_id: HandlerId,
    broker: Weak<BrokerInner>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        method: impl Into<String>,
        handler_id: HandlerId,
        broker: Weak<BrokerInner>,
    ) -> Self {
        Self {
            id,
            method: method.into(),
            handler_id,
            broker,
            active: true,
        }
    }

    /// Returns the remote subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Returns the event method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Removes the handler and the remote subscription.
    ///
    /// The handler is removed locally before the remote call, so it does not
    /// fire again even if the remote call fails.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the broker is gone or closed
    /// - Any error from `session.unsubscribe`
    pub async fn unsubscribe(mut self) -> Result<()> {
        self.active = false;

        let broker = self
            .broker
            .upgrade()
            .map(Broker::from_inner)
            .ok_or(Error::ConnectionClosed)?;
        broker.remove_handler(&self.method, self.handler_id);

        broker
            .execute(&UnsubscribeCommand::new(vec![self.id.clone()]))
            .await?;

        debug!(subscription = %self.id, method = %self.method, "Unsubscribed");
        Ok(())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        let Some(broker) = self.broker.upgrade().map(Broker::from_inner) else {
            return;
        };
        broker.remove_handler(&self.method, self.handler_id);

        if broker.is_closed() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            debug!(subscription = %self.id, "No runtime, skipping remote unsubscribe");
            return;
        };

        let id = self.id.clone();
        handle.spawn(async move {
            let command = UnsubscribeCommand::new(vec![id.clone()]);
            if let Err(e) = broker.execute(&command).await {
                warn!(subscription = %id, error = %e, "Background unsubscribe failed");
            }
        });
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
