//! In-process transport pair.
//!
//! [`MemoryTransport`] implements [`Transport`] over unbounded channels; its
//! [`MemoryPeer`] plays the remote end, reading the commands the broker sent
//! and injecting replies and events. Used to exercise domain modules and the
//! broker without a browser.
//!
//! # Example
//!
//! ```ignore
//! let (transport, peer) = MemoryTransport::pair();
//! let broker = Broker::new(Arc::new(transport), BiDiOptions::default());
//! broker.connect(&Url::parse("ws://memory")?).await?;
//!
//! let command = peer.next_command().await?;
//! peer.reply_success(command["id"].as_u64().unwrap(), json!({}))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

use super::Transport;

// ============================================================================
// MemoryTransport
// ============================================================================

/// Local end of an in-process connection.
pub struct MemoryTransport {
    /// Messages sent by the local end.
    outbound: mpsc::UnboundedSender<String>,
    /// Messages injected by the peer.
    inbound: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

/// Remote end of an in-process connection.
pub struct MemoryPeer {
    /// Messages sent by the local end.
    sent: AsyncMutex<mpsc::UnboundedReceiver<String>>,
    /// Injection channel towards the local end.
    inject: mpsc::UnboundedSender<Vec<u8>>,
}

impl MemoryTransport {
    /// Creates a connected transport/peer pair.
    #[must_use]
    pub fn pair() -> (Self, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let transport = Self {
            outbound: outbound_tx,
            inbound: AsyncMutex::new(inbound_rx),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        let peer = MemoryPeer {
            sent: AsyncMutex::new(outbound_rx),
            inject: inbound_tx,
        };

        (transport, peer)
    }

    /// Returns `true` once `close` has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        if !self.connected.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, _endpoint: &Url) -> Result<()> {
        if self.connected.swap(true, Ordering::AcqRel) {
            return Err(Error::connection("transport is already connected"));
        }
        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
        self.check_open()?;
        self.outbound
            .send(message)
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        self.check_open()?;
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or(Error::ConnectionClosed)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

impl MemoryPeer {
    /// Waits for the next raw message sent by the local end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub async fn next_message(&self) -> Result<String> {
        self.sent
            .lock()
            .await
            .recv()
            .await
            .ok_or(Error::ConnectionClosed)
    }

    /// Waits for the next command and parses it as JSON.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] once the local end is dropped
    /// - [`Error::Json`] if the message is not JSON
    pub async fn next_command(&self) -> Result<Value> {
        let message = self.next_message().await?;
        Ok(serde_json::from_str(&message)?)
    }

    /// Injects a raw message towards the local end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub fn inject(&self, message: impl Into<Vec<u8>>) -> Result<()> {
        self.inject
            .send(message.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Injects a JSON message towards the local end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub fn inject_json(&self, message: &Value) -> Result<()> {
        self.inject(serde_json::to_vec(message)?)
    }

    /// Injects a success reply for command `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub fn reply_success(&self, id: u64, result: Value) -> Result<()> {
        self.inject_json(&json!({ "id": id, "type": "success", "result": result }))
    }

    /// Injects an error reply for command `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub fn reply_error(&self, id: u64, error: &str, message: &str) -> Result<()> {
        self.inject_json(&json!({
            "id": id,
            "type": "error",
            "error": error,
            "message": message,
        }))
    }

    /// Injects an event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the local end is dropped.
    pub fn emit(&self, method: &str, params: Value) -> Result<()> {
        self.inject_json(&json!({ "type": "event", "method": method, "params": params }))
    }

    /// Drops the injection side, ending the local end's receive stream.
    pub fn disconnect(self) {
        drop(self);
    }
}

// ============================================================================
// Tests
// ============================================================================
