//! Session and per-command configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use webdriver_bidi::BiDiOptions;
//!
//! let options = BiDiOptions::new()
//!     .with_command_timeout(Duration::from_secs(10))
//!     .with_max_message_size(64 << 20);
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum number of in-flight commands.
pub const DEFAULT_MAX_PENDING_COMMANDS: usize = 1024;

// ============================================================================
// BiDiOptions
// ============================================================================

/// Configuration for one BiDi session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiDiOptions {
    /// Timeout applied to commands that do not override it.
    pub command_timeout: Duration,

    /// Timeout for establishing the WebSocket connection.
    pub connect_timeout: Duration,

    /// Maximum inbound message size in bytes (`None` = tungstenite default).
    pub max_message_size: Option<usize>,

    /// Maximum number of commands awaiting a reply.
    pub max_pending_commands: usize,
}

impl Default for BiDiOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BiDiOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_message_size: None,
            max_pending_commands: DEFAULT_MAX_PENDING_COMMANDS,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BiDiOptions {
    /// Sets the default command timeout.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the connection handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the maximum inbound message size in bytes.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Sets the maximum number of in-flight commands.
    #[inline]
    #[must_use]
    pub fn with_max_pending_commands(mut self, limit: usize) -> Self {
        self.max_pending_commands = limit;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BiDiOptions {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout or limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("Command timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }
        if self.max_pending_commands == 0 {
            return Err(Error::config(
                "Maximum pending commands must be greater than zero",
            ));
        }
        if self.max_message_size == Some(0) {
            return Err(Error::config("Maximum message size must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// CommandOptions
// ============================================================================

/// Per-command overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Timeout for this command; falls back to [`BiDiOptions::command_timeout`].
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    /// Creates options with a specific timeout.
    #[inline]
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`, for error reports.
#[inline]
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BiDiOptions::default();
        assert_eq!(options.command_timeout.as_secs(), 30);
        assert_eq!(options.connect_timeout.as_secs(), 30);
        assert_eq!(options.max_message_size, None);
        assert_eq!(options.max_pending_commands, DEFAULT_MAX_PENDING_COMMANDS);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_builder_chain() {
        let options = BiDiOptions::new()
            .with_command_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_max_message_size(1024)
            .with_max_pending_commands(8);

        assert_eq!(options.command_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
        assert_eq!(options.max_message_size, Some(1024));
        assert_eq!(options.max_pending_commands, 8);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let options = BiDiOptions::new().with_command_timeout(Duration::ZERO);
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let options = BiDiOptions::new().with_max_pending_commands(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_command_options() {
        assert_eq!(CommandOptions::default().timeout, None);
        assert_eq!(
            CommandOptions::with_timeout(Duration::from_millis(50)).timeout,
            Some(Duration::from_millis(50))
        );
    }
}
