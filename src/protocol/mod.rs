//! WebSocket protocol message types.
//!
//! This module defines the message format exchanged with the remote end.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`CommandFrame`] | Local → Remote | Command request |
//! | [`Envelope::Success`] | Remote → Local | Command result |
//! | [`Envelope::Error`] | Remote → Local | Command failure |
//! | [`Envelope::Event`] | Remote → Local | Browser notification |
//!
//! # Command Naming
//!
//! Commands and events follow `module.methodName` format:
//!
//! - `session.subscribe`
//! - `browsingContext.navigate`
//! - `log.entryAdded`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound command trait and wire frame |
//! | `envelope` | Single-pass inbound classification |
//! | `event` | Event payload trait |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command trait and wire frame.
pub mod command;

/// Inbound envelope classification with deferred payloads.
pub mod envelope;

/// Event payload trait.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, CommandFrame, EmptyResult, GenericCommand};
pub use envelope::{Envelope, MessageKind};
pub use event::EventArgs;
