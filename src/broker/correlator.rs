//! Command correlation.
//!
//! Assigns command ids and tracks every command awaiting a reply. Each entry
//! carries a typed resolver that decodes the deferred `result` payload into
//! the type the caller expects and hands it to the caller's oneshot waiter.
//!
//! # Terminal transitions
//!
//! An entry leaves the map exactly once, through whichever of these runs
//! first; removal happens under the map lock, so the others find nothing:
//!
//! | Path | Caller sees |
//! |------|-------------|
//! | [`Correlator::resolve`] | decoded result |
//! | [`Correlator::reject`] | [`Error::Remote`] |
//! | [`Correlator::cancel`] (timeout, send failure) | error chosen by the caller |
//! | [`Correlator::fail_all`] (shutdown) | [`Error::ConnectionClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::envelope;

// ============================================================================
// Types
// ============================================================================

/// Terminal outcome delivered to a pending command's resolver.
pub(crate) enum Completion<'a> {
    /// Undecoded `result` payload.
    Success(&'a RawValue),
    /// Command failed.
    Failure(Error),
}

/// Decodes a completion into the caller's type and wakes the caller.
type Resolver = Box<dyn for<'a> FnOnce(Completion<'a>) + Send>;

/// A command awaiting its reply.
struct PendingCommand {
    /// Method name, for diagnostics.
    method: String,
    /// Single-use resolver.
    resolver: Resolver,
}

/// Map state guarded by one lock.
#[derive(Default)]
struct State {
    pending: FxHashMap<CommandId, PendingCommand>,
    /// Set by `fail_all`; no registrations are accepted afterwards.
    closed: bool,
}

// ============================================================================
// Correlator
// ============================================================================

/// Id allocator and pending-command map.
pub(crate) struct Correlator {
    next_id: AtomicU64,
    state: Mutex<State>,
    max_pending: usize,
}

impl Correlator {
    /// Creates an empty correlator; ids start at 1.
    pub(crate) fn new(max_pending: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(State::default()),
            max_pending,
        }
    }

    /// Allocates an id and registers a waiter expecting a `T` result.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after [`fail_all`](Self::fail_all)
    /// - [`Error::Protocol`] if the pending limit is reached
    pub(crate) fn register<T>(&self, method: &str) -> Result<(CommandId, oneshot::Receiver<Result<T>>)>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let resolver: Resolver = Box::new(move |completion: Completion<'_>| {
            let outcome = match completion {
                Completion::Success(result) => envelope::decode_payload::<T>(result),
                Completion::Failure(error) => Err(error),
            };
            // The caller may have stopped waiting
            let _ = tx.send(outcome);
        });

        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::ConnectionClosed);
        }
        if state.pending.len() >= self.max_pending {
            warn!(
                pending = state.pending.len(),
                max = self.max_pending,
                "Too many pending commands"
            );
            return Err(Error::protocol(format!(
                "Too many pending commands: {}/{}",
                state.pending.len(),
                self.max_pending
            )));
        }

        let id = CommandId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        state.pending.insert(
            id,
            PendingCommand {
                method: method.to_string(),
                resolver,
            },
        );

        Ok((id, rx))
    }

    /// Completes command `id` with its undecoded result.
    ///
    /// Returns `false` if no such command is pending.
    pub(crate) fn resolve(&self, id: CommandId, result: &RawValue) -> bool {
        let Some(command) = self.take(id) else {
            return false;
        };
        debug!(%id, method = %command.method, "Command succeeded");
        (command.resolver)(Completion::Success(result));
        true
    }

    /// Fails command `id` with a remote error.
    ///
    /// Returns `false` if no such command is pending.
    pub(crate) fn reject(&self, id: CommandId, error: String, message: String) -> bool {
        let Some(command) = self.take(id) else {
            return false;
        };
        debug!(%id, method = %command.method, %error, "Command failed");
        (command.resolver)(Completion::Failure(Error::remote(error, message)));
        true
    }

    /// Removes command `id` without waking its waiter.
    ///
    /// Used by the caller itself once it stops waiting. Returns `false` if the
    /// command already reached a terminal state.
    pub(crate) fn cancel(&self, id: CommandId) -> bool {
        self.take(id).is_some()
    }

    /// Fails every pending command with [`Error::ConnectionClosed`] and
    /// refuses further registrations.
    ///
    /// Returns the number of commands failed.
    pub(crate) fn fail_all(&self) -> usize {
        let pending: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.pending.drain().collect()
        };

        let count = pending.len();
        for (_, command) in pending {
            (command.resolver)(Completion::Failure(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
        count
    }

    /// Returns the number of commands awaiting a reply.
    #[inline]
    pub(crate) fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn take(&self, id: CommandId) -> Option<PendingCommand> {
        self.state.lock().pending.remove(&id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).expect("raw value")
    }

    #[test]
    fn test_ids_are_monotonic() {
        let correlator = Correlator::new(16);
        let (a, _rx_a) = correlator.register::<Value>("a.b").expect("register");
        let (b, _rx_b) = correlator.register::<Value>("a.b").expect("register");
        let (c, _rx_c) = correlator.register::<Value>("a.b").expect("register");

        assert_eq!(a, CommandId::new(1));
        assert!(a < b && b < c);
        assert_eq!(correlator.pending_count(), 3);
    }

    #[tokio::test]
    async fn test_resolve_decodes_typed_result() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Reply {
            ok: bool,
        }

        let correlator = Correlator::new(16);
        let (id, rx) = correlator.register::<Reply>("x.y").expect("register");

        assert!(correlator.resolve(id, &raw(r#"{"ok":true}"#)));
        assert_eq!(rx.await.expect("sent").expect("decoded"), Reply { ok: true });
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_reply_resolves_once() {
        let correlator = Correlator::new(16);
        let (id, rx) = correlator.register::<Value>("x.y").expect("register");

        assert!(correlator.resolve(id, &raw("{\"n\":1}")));
        assert!(!correlator.resolve(id, &raw("{\"n\":2}")));
        assert!(!correlator.reject(id, "late".into(), "late".into()));

        assert_eq!(rx.await.expect("sent").expect("decoded"), json!({ "n": 1 }));
    }

    #[tokio::test]
    async fn test_reject_carries_remote_strings() {
        let correlator = Correlator::new(16);
        let (id, rx) = correlator.register::<Value>("x.y").expect("register");

        assert!(correlator.reject(id, "no such x".into(), "detail".into()));
        let err = rx.await.expect("sent").expect_err("rejected");
        assert!(matches!(
            err,
            Error::Remote { ref error, ref message } if error == "no such x" && message == "detail"
        ));
    }

    #[tokio::test]
    async fn test_result_type_mismatch_is_json_error() {
        let correlator = Correlator::new(16);
        let (id, rx) = correlator.register::<u32>("x.y").expect("register");

        assert!(correlator.resolve(id, &raw(r#"{"not":"a number"}"#)));
        let err = rx.await.expect("sent").expect_err("mismatch");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_cancel_then_reply_is_unknown() {
        let correlator = Correlator::new(16);
        let (id, _rx) = correlator.register::<Value>("x.y").expect("register");

        assert!(correlator.cancel(id));
        assert!(!correlator.cancel(id));
        assert!(!correlator.resolve(id, &raw("{}")));
    }

    #[tokio::test]
    async fn test_fail_all_rejects_and_closes() {
        let correlator = Correlator::new(16);
        let (_, rx_a) = correlator.register::<Value>("a.a").expect("register");
        let (_, rx_b) = correlator.register::<Value>("b.b").expect("register");

        assert_eq!(correlator.fail_all(), 2);
        assert!(matches!(rx_a.await.expect("sent"), Err(Error::ConnectionClosed)));
        assert!(matches!(rx_b.await.expect("sent"), Err(Error::ConnectionClosed)));

        let err = correlator.register::<Value>("c.c").expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_pending_limit() {
        let correlator = Correlator::new(1);
        let (_id, _rx) = correlator.register::<Value>("a.a").expect("register");

        let err = correlator.register::<Value>("b.b").expect_err("limit");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_unknown_id() {
        let correlator = Correlator::new(4);
        assert!(!correlator.resolve(CommandId::new(99), &raw("{}")));
        assert!(!correlator.reject(CommandId::new(99), "e".into(), "m".into()));
    }
}
