//! WebDriver BiDi client core.
//!
//! This library connects to a WebDriver BiDi endpoint over one WebSocket and
//! multiplexes concurrent commands and an event stream over it.
//!
//! # Architecture
//!
//! The client follows the BiDi local end / remote end model:
//!
//! - **Local End (Rust)**: Sends commands, receives replies and events
//! - **Remote End (Browser)**: Executes commands, emits events
//!
//! Key design principles:
//!
//! - One [`Broker`] owns one transport, a receive loop and a dispatcher task
//! - Replies are matched to commands by id, never by arrival order
//! - Envelopes are classified in one pass; `result`/`params` are decoded only
//!   once the consumer's type is known
//! - Events reach handlers in arrival order, off the receive loop
//!
//! # Quick Start
//!
//! ```no_run
//! use webdriver_bidi::{BiDi, Result, SubscriptionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bidi = BiDi::connect("ws://127.0.0.1:9222/session").await?;
//!
//!     let subscription = bidi
//!         .broker()
//!         .subscribe(
//!             "log.entryAdded",
//!             |entry: &serde_json::Value| println!("{entry}"),
//!             SubscriptionOptions::default(),
//!         )
//!         .await?;
//!
//!     let status = bidi.status().await?;
//!     println!("ready: {}", status.ready);
//!
//!     subscription.unsubscribe().await?;
//!     bidi.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bidi`] | Session entry point: [`BiDi`] |
//! | [`broker`] | Command correlation and event dispatch: [`Broker`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Session and per-command configuration |
//! | [`protocol`] | Wire message types |
//! | [`session`] | `session` module commands |
//! | [`subscription`] | Event subscriptions |
//! | [`transport`] | Transport trait and implementations |

// ============================================================================
// Modules
// ============================================================================

/// Session entry point.
pub mod bidi;

/// Command correlation and event dispatch.
///
/// Use [`Broker::execute`] for commands and [`Broker::subscribe`] for events.
pub mod broker;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Session and per-command configuration.
pub mod options;

/// Wire message types.
///
/// Outbound command frames and inbound envelope classification.
pub mod protocol;

/// `session` module commands.
pub mod session;

/// Event subscriptions.
pub mod subscription;

/// Transport layer.
///
/// The [`Transport`](transport::Transport) trait and its WebSocket and
/// in-memory implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Entry points
pub use bidi::BiDi;
pub use broker::Broker;

// Configuration
pub use options::{BiDiOptions, CommandOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{BrowsingContextId, CommandId, SubscriptionId, UserContextId};

// Protocol types
pub use protocol::{Command, EmptyResult, EventArgs, GenericCommand};

// Subscription types
pub use subscription::{ContextSubscriptionOptions, Subscription, SubscriptionOptions};

// Transport types
pub use transport::{MemoryPeer, MemoryTransport, Transport, WebSocketTransport};
