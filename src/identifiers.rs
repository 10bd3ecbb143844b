//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Wire form | Assigned by |
//! |------|-----------|-------------|
//! | [`CommandId`] | integer | local end (monotonic counter) |
//! | [`SubscriptionId`] | string | remote end (`session.subscribe`) |
//! | [`BrowsingContextId`] | string | remote end |
//! | [`UserContextId`] | string | remote end |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Identifier correlating an outbound command with its reply.
///
/// Allocated from a per-session monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw command id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Remote subscription handle returned by `session.subscribe`.
    SubscriptionId
);

string_id!(
    /// Browsing context (tab, window or frame) handle.
    BrowsingContextId
);

string_id!(
    /// User context (browser profile partition) handle.
    UserContextId
);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_serializes_as_integer() {
        let id = CommandId::new(42);
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "42");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_command_id_ordering() {
        assert!(CommandId::new(1) < CommandId::new(2));
    }

    #[test]
    fn test_string_ids_are_transparent() {
        let ctx = BrowsingContextId::new("ctx-1");
        assert_eq!(serde_json::to_string(&ctx).expect("serialize"), "\"ctx-1\"");

        let parsed: SubscriptionId = serde_json::from_str("\"sub-9\"").expect("parse");
        assert_eq!(parsed.as_str(), "sub-9");
        assert_eq!(parsed, SubscriptionId::from("sub-9"));
    }
}
