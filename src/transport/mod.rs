//! WebSocket transport layer.
//!
//! This module owns the physical duplex connection to the remote end.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Broker (Rust)  │                              │  Remote End     │
//! │                 │         WebSocket            │  (Browser)      │
//! │  Transport      │◄────────────────────────────►│                 │
//! │  send / receive │      ws://host:port/...      │  BiDi server    │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Contract
//!
//! - `connect` is called once; `send`/`receive` before it fail with
//!   [`Error::NotConnected`](crate::Error::NotConnected)
//! - `send` transmits one complete message; concurrent senders are
//!   serialized so frames never interleave
//! - `receive` suspends until one complete message is available
//! - `close` is idempotent
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite client transport |
//! | `memory` | In-process transport pair for tests |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport pair.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

// ============================================================================
// Transport
// ============================================================================

/// Message-oriented duplex connection used by the broker.
///
/// Only the broker's receive loop calls [`receive`](Self::receive); any
/// number of tasks may call [`send`](Self::send) concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`](crate::Error::Connection) if the endpoint refuses or is unreachable
    /// - [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the handshake stalls
    async fn connect(&self, endpoint: &Url) -> Result<()>;

    /// Sends one complete text message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`](crate::Error::NotConnected) before `connect`
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) after `close`
    async fn send(&self, message: String) -> Result<()>;

    /// Receives one complete message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`](crate::Error::NotConnected) before `connect`
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) when the connection ends
    async fn receive(&self) -> Result<Vec<u8>>;

    /// Releases the connection. Safe to call more than once.
    async fn close(&self);
}
