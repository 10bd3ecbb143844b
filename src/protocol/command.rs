//! Outbound command definitions.
//!
//! Commands follow `module.methodName` format. Each command type serializes
//! to its own `params` object and names the type its reply decodes into, so
//! the broker can defer decoding of the `result` payload until the reply for
//! that exact command arrives.
//!
//! # Format
//!
//! ```json
//! { "id": 1, "method": "module.methodName", "params": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::CommandId;

// ============================================================================
// Command
// ============================================================================

/// A protocol command with a typed result.
///
/// Implementors serialize as the command's `params` object.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Navigate { context: BrowsingContextId, url: String }
///
/// impl Command for Navigate {
///     type Output = NavigateResult;
///
///     fn method(&self) -> &str {
///         "browsingContext.navigate"
///     }
/// }
/// ```
pub trait Command: Serialize + Send + Sync {
    /// Type the reply's `result` payload decodes into.
    type Output: DeserializeOwned + Send + 'static;

    /// Method name in `module.methodName` format.
    fn method(&self) -> &str;
}

// ============================================================================
// CommandFrame
// ============================================================================

/// Wire form of an outbound command.
#[derive(Debug, Serialize)]
pub struct CommandFrame<'a, C: Serialize + ?Sized> {
    /// Correlation id assigned by the broker.
    pub id: CommandId,

    /// Method name.
    pub method: &'a str,

    /// Command parameters.
    pub params: &'a C,
}

impl<'a, C: Command + ?Sized> CommandFrame<'a, C> {
    /// Wraps a command with its assigned id.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, command: &'a C) -> Self {
        Self {
            id,
            method: command.method(),
            params: command,
        }
    }
}

// ============================================================================
// EmptyResult
// ============================================================================

/// Result of commands whose reply carries no data.
///
/// Any fields present in the reply are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EmptyResult {}

// ============================================================================
// GenericCommand
// ============================================================================

/// Untyped command for methods without a dedicated type.
///
/// The reply's `result` is returned as a raw JSON [`Value`].
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct GenericCommand {
    #[serde(skip)]
    method: String,

    params: Value,
}

impl GenericCommand {
    /// Creates a command with the given method and params.
    ///
    /// `params` should be a JSON object; `null` is sent as `{}`.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };
        Self {
            method: method.into(),
            params,
        }
    }
}

impl Command for GenericCommand {
    type Output = Value;

    fn method(&self) -> &str {
        &self.method
    }
}

// ============================================================================
// Tests
// ============================================================================
