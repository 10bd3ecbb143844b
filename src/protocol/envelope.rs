//! Inbound envelope classification.
//!
//! Every message from the remote end is a flat JSON object. The decoder makes
//! one forward pass over its top-level properties, eagerly reading only the
//! small routing fields (`id`, `type`, `method`, `error`, `message`). The
//! potentially large `result` and `params` payloads are captured as borrowed
//! [`RawValue`] slices of the original frame and decoded later by whichever
//! consumer knows their target type.
//!
//! # Format
//!
//! Success:
//! ```json
//! { "id": 1, "type": "success", "result": { ... } }
//! ```
//!
//! Error:
//! ```json
//! { "id": 1, "type": "error", "error": "no such frame", "message": "..." }
//! ```
//!
//! Event:
//! ```json
//! { "type": "event", "method": "log.entryAdded", "params": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// MessageKind
// ============================================================================

/// Top-level message discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Successful command reply.
    Success,
    /// Failed command reply.
    Error,
    /// Unsolicited event.
    Event,
}

impl MessageKind {
    /// Maps the wire `type` value, returning `None` for unknown kinds.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A classified inbound message borrowing its payload from the frame buffer.
#[derive(Debug)]
pub enum Envelope<'a> {
    /// Reply to command `id`; `result` is still undecoded.
    Success {
        /// Id of the command being answered.
        id: CommandId,
        /// Deferred `result` payload.
        result: &'a RawValue,
    },

    /// Error reply to command `id`.
    Error {
        /// Id of the command being answered.
        id: CommandId,
        /// Remote error code.
        error: String,
        /// Remote error detail.
        message: String,
    },

    /// Event notification; `params` is still undecoded.
    Event {
        /// Event name in `module.eventName` format.
        method: Cow<'a, str>,
        /// Deferred `params` payload.
        params: &'a RawValue,
    },
}

impl Envelope<'_> {
    /// Returns the message kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Success { .. } => MessageKind::Success,
            Self::Error { .. } => MessageKind::Error,
            Self::Event { .. } => MessageKind::Event,
        }
    }

    /// Returns the command id for replies, `None` for events.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CommandId> {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } => Some(*id),
            Self::Event { .. } => None,
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// Top-level fields of an inbound message.
///
/// Unknown properties are skipped without being materialized.
#[derive(Deserialize)]
struct RawEnvelope<'a> {
    #[serde(default)]
    id: Option<u64>,

    #[serde(rename = "type", borrow, default)]
    kind: Option<Cow<'a, str>>,

    #[serde(borrow, default)]
    method: Option<Cow<'a, str>>,

    #[serde(borrow, default)]
    result: Option<&'a RawValue>,

    #[serde(borrow, default)]
    params: Option<&'a RawValue>,

    #[serde(default)]
    error: Option<String>,

    #[serde(default)]
    message: Option<String>,
}

/// Classifies one complete inbound message.
///
/// Returns `Ok(None)` for messages whose `type` is missing or unknown; those
/// are ignored for forward compatibility.
///
/// # Errors
///
/// - [`Error::Json`] if the frame is not a JSON object
/// - [`Error::Protocol`] if a required field for the message kind is missing
pub fn decode(frame: &[u8]) -> Result<Option<Envelope<'_>>> {
    let raw: RawEnvelope<'_> = serde_json::from_slice(frame)?;

    let Some(kind) = raw.kind.as_deref().and_then(MessageKind::from_wire) else {
        return Ok(None);
    };

    let envelope = match kind {
        MessageKind::Success => {
            let id = raw.id.ok_or_else(|| {
                Error::protocol("'success' message is missing required 'id' property")
            })?;
            let result = raw.result.ok_or_else(|| {
                Error::protocol(format!(
                    "'success' message for command {id} is missing required 'result' property"
                ))
            })?;
            Envelope::Success {
                id: CommandId::new(id),
                result,
            }
        }

        MessageKind::Error => {
            let id = raw.id.ok_or_else(|| {
                Error::protocol("'error' message is missing required 'id' property")
            })?;
            Envelope::Error {
                id: CommandId::new(id),
                error: raw.error.unwrap_or_else(|| "unknown error".to_string()),
                message: raw.message.unwrap_or_default(),
            }
        }

        MessageKind::Event => {
            let method = raw.method.ok_or_else(|| {
                Error::protocol("'event' message is missing required 'method' property")
            })?;
            let params = raw.params.ok_or_else(|| {
                Error::protocol(format!(
                    "'event' message '{method}' is missing required 'params' property"
                ))
            })?;
            Envelope::Event { method, params }
        }
    };

    Ok(Some(envelope))
}

/// Decodes a deferred payload into its target type.
///
/// # Errors
///
/// Returns [`Error::Json`] if the payload does not match `T`.
#[inline]
pub fn decode_payload<T: DeserializeOwned>(payload: &RawValue) -> Result<T> {
    Ok(serde_json::from_str(payload.get())?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    #[test]
    fn test_success_envelope() {
        let frame = br#"{"id":1,"type":"success","result":{"ok":true}}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        assert_eq!(envelope.kind(), MessageKind::Success);
        assert_eq!(envelope.id(), Some(CommandId::new(1)));

        let Envelope::Success { result, .. } = envelope else {
            panic!("expected success");
        };
        assert_eq!(result.get(), r#"{"ok":true}"#);

        let value: Value = decode_payload(result).expect("payload");
        assert_eq!(value, json!({ "ok": true }));
    }

    #[test]
    fn test_result_is_captured_verbatim() {
        let frame = br#"{"type":"success","result": { "a" : [1, 2] },"id":9}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        let Envelope::Success { id, result } = envelope else {
            panic!("expected success");
        };
        assert_eq!(id, CommandId::new(9));
        assert_eq!(result.get(), r#"{ "a" : [1, 2] }"#);
    }

    #[test]
    fn test_error_envelope() {
        let frame = br#"{"id":2,"type":"error","error":"no such x","message":"detail"}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        match envelope {
            Envelope::Error { id, error, message } => {
                assert_eq!(id, CommandId::new(2));
                assert_eq!(error, "no such x");
                assert_eq!(message, "detail");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_event_envelope() {
        let frame = br#"{"type":"event","method":"domain.thing","params":{"v":1}}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        assert_eq!(envelope.kind(), MessageKind::Event);
        assert_eq!(envelope.id(), None);

        let Envelope::Event { method, params } = envelope else {
            panic!("expected event");
        };
        assert_eq!(method, "domain.thing");
        assert_eq!(params.get(), r#"{"v":1}"#);
    }

    #[test]
    fn test_escaped_method_is_unescaped() {
        let frame = br#"{"type":"event","method":"a\u002eb","params":{}}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        let Envelope::Event { method, .. } = envelope else {
            panic!("expected event");
        };
        assert_eq!(method, "a.b");
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let frame = br#"{"id":3,"extra":{"deep":[{"x":null}]},"type":"success","result":{}}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");
        assert_eq!(envelope.id(), Some(CommandId::new(3)));
    }

    #[test]
    fn test_success_without_id_is_protocol_error() {
        let frame = br#"{"type":"success","result":{}}"#;
        let err = decode(frame).expect_err("missing id");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_error_without_id_is_protocol_error() {
        let frame = br#"{"id":null,"type":"error","error":"invalid argument","message":"bad"}"#;
        let err = decode(frame).expect_err("null id");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_event_without_method_is_protocol_error() {
        let frame = br#"{"type":"event","params":{}}"#;
        let err = decode(frame).expect_err("missing method");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let frame = br#"{"id":4,"type":"notification","result":{}}"#;
        assert!(decode(frame).expect("decode").is_none());

        let frame = br#"{"id":4}"#;
        assert!(decode(frame).expect("decode").is_none());
    }

    #[test]
    fn test_error_defaults_missing_strings() {
        let frame = br#"{"id":5,"type":"error"}"#;
        let envelope = decode(frame).expect("decode").expect("known kind");

        let Envelope::Error { error, message, .. } = envelope else {
            panic!("expected error");
        };
        assert_eq!(error, "unknown error");
        assert!(message.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(decode(b"{\"id\":"), Err(Error::Json(_))));
    }
}
