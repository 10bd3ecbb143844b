//! `session` module commands.
//!
//! Status, session creation and teardown, and the subscribe/unsubscribe calls
//! that ask the remote end to start or stop sending events.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::broker::Broker;
use crate::error::Result;
use crate::identifiers::{BrowsingContextId, SubscriptionId, UserContextId};
use crate::protocol::{Command, EmptyResult};

// ============================================================================
// session.status
// ============================================================================

/// `session.status` command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCommand {}

impl Command for StatusCommand {
    type Output = StatusResult;

    fn method(&self) -> &str {
        "session.status"
    }
}

/// Result of `session.status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResult {
    /// Whether the remote end can create new sessions.
    pub ready: bool,
    /// Implementation-defined status message.
    pub message: String,
}

// ============================================================================
// session.new
// ============================================================================

/// Requested capabilities for `session.new`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesRequest {
    /// Capabilities every match must satisfy.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub always_match: Map<String, Value>,

    /// Alternative capability sets, tried in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub first_match: Vec<Map<String, Value>>,
}

impl CapabilitiesRequest {
    /// Adds a required capability.
    #[inline]
    #[must_use]
    pub fn with_always_match(mut self, name: impl Into<String>, value: Value) -> Self {
        self.always_match.insert(name.into(), value);
        self
    }

    /// Appends an alternative capability set.
    #[inline]
    #[must_use]
    pub fn with_first_match(mut self, capabilities: Map<String, Value>) -> Self {
        self.first_match.push(capabilities);
        self
    }
}

/// `session.new` command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCommand {
    /// Requested capabilities.
    pub capabilities: CapabilitiesRequest,
}

impl NewCommand {
    /// Creates the command.
    #[inline]
    #[must_use]
    pub fn new(capabilities: CapabilitiesRequest) -> Self {
        Self { capabilities }
    }
}

impl Command for NewCommand {
    type Output = NewResult;

    fn method(&self) -> &str {
        "session.new"
    }
}

/// Result of `session.new`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResult {
    /// Id of the new session.
    pub session_id: String,
    /// Capabilities the remote end granted.
    pub capabilities: Capability,
}

/// Capabilities granted by the remote end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Whether untrusted TLS certificates are accepted.
    #[serde(default)]
    pub accept_insecure_certs: bool,
    /// Browser name.
    #[serde(default)]
    pub browser_name: String,
    /// Browser version.
    #[serde(default)]
    pub browser_version: String,
    /// Platform name.
    #[serde(default)]
    pub platform_name: String,
    /// Whether window size and position can be set.
    #[serde(default)]
    pub set_window_rect: bool,
    /// Browser user agent.
    #[serde(default)]
    pub user_agent: String,
    /// BiDi endpoint, when the session was created over HTTP.
    #[serde(default)]
    pub web_socket_url: Option<String>,
    /// Vendor-specific capabilities.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

// ============================================================================
// session.end
// ============================================================================

/// `session.end` command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndCommand {}

impl Command for EndCommand {
    type Output = EmptyResult;

    fn method(&self) -> &str {
        "session.end"
    }
}

// ============================================================================
// session.subscribe
// ============================================================================

/// `session.subscribe` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeCommand {
    /// Event methods or module names.
    pub events: Vec<String>,

    /// Limit delivery to these browsing contexts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,

    /// Limit delivery to these user contexts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl SubscribeCommand {
    /// Creates a subscription request for `events` across all contexts.
    #[must_use]
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            contexts: None,
            user_contexts: None,
        }
    }

    /// Restricts the subscription to browsing contexts. Empty means all.
    #[must_use]
    pub fn with_contexts(mut self, contexts: Vec<BrowsingContextId>) -> Self {
        self.contexts = (!contexts.is_empty()).then_some(contexts);
        self
    }

    /// Restricts the subscription to user contexts. Empty means all.
    #[must_use]
    pub fn with_user_contexts(mut self, user_contexts: Vec<UserContextId>) -> Self {
        self.user_contexts = (!user_contexts.is_empty()).then_some(user_contexts);
        self
    }
}

impl Command for SubscribeCommand {
    type Output = SubscribeResult;

    fn method(&self) -> &str {
        "session.subscribe"
    }
}

/// Result of `session.subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribeResult {
    /// Remote subscription id.
    pub subscription: SubscriptionId,
}

// ============================================================================
// session.unsubscribe
// ============================================================================

/// `session.unsubscribe` command, by subscription id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsubscribeCommand {
    /// Subscriptions to remove.
    pub subscriptions: Vec<SubscriptionId>,
}

impl UnsubscribeCommand {
    /// Creates the command.
    #[inline]
    #[must_use]
    pub fn new(subscriptions: Vec<SubscriptionId>) -> Self {
        Self { subscriptions }
    }
}

impl Command for UnsubscribeCommand {
    type Output = EmptyResult;

    fn method(&self) -> &str {
        "session.unsubscribe"
    }
}

// ============================================================================
// SessionModule
// ============================================================================

/// Typed access to the `session` module.
#[derive(Clone)]
pub struct SessionModule {
    broker: Broker,
}

impl SessionModule {
    /// Creates the module over `broker`.
    #[must_use]
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }

    /// Queries whether the remote end is ready.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn status(&self) -> Result<StatusResult> {
        self.broker.execute(&StatusCommand {}).await
    }

    /// Creates a new session.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn new_session(&self, capabilities: CapabilitiesRequest) -> Result<NewResult> {
        self.broker.execute(&NewCommand::new(capabilities)).await
    }

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn end(&self) -> Result<()> {
        self.broker.execute(&EndCommand {}).await.map(|_| ())
    }

    /// Asks the remote end to send `command.events`.
    ///
    /// This only performs the remote call; use
    /// [`Broker::subscribe`] to also attach a local handler.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn subscribe(&self, command: &SubscribeCommand) -> Result<SubscriptionId> {
        Ok(self.broker.execute(command).await?.subscription)
    }

    /// Removes remote subscriptions by id.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn unsubscribe(&self, subscriptions: Vec<SubscriptionId>) -> Result<()> {
        self.broker
            .execute(&UnsubscribeCommand::new(subscriptions))
            .await
            .map(|_| ())
    }
}

// ============================================================================
// Tests
// ============================================================================
