//! Command/event broker.
//!
//! | Module | Role |
//! |--------|------|
//! | `core` | [`Broker`]: connection lifecycle, receive loop, commands, subscriptions |
//! | `correlator` | Command ids and the pending-command map |
//! | `registry` | Event method → handlers, each with its payload decoder |
//! | `dispatcher` | FIFO event queue and its consumer task |

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod correlator;
mod dispatcher;
mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Broker;

pub(crate) use self::core::BrokerInner;
pub(crate) use self::registry::HandlerId;
