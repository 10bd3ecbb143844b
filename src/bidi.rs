//! Session entry point.
//!
//! [`BiDi`] validates the endpoint, connects a broker over a WebSocket and
//! exposes the `session` module. Domain modules build on [`BiDi::broker`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::broker::Broker;
use crate::error::{Error, Result};
use crate::options::BiDiOptions;
use crate::session::{SessionModule, StatusResult};
use crate::transport::{Transport, WebSocketTransport};

// ============================================================================
// BiDi
// ============================================================================

/// A connected BiDi session.
///
/// # Example
///
/// ```no_run
/// use webdriver_bidi::{BiDi, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let bidi = BiDi::connect("ws://127.0.0.1:9222/session").await?;
///
///     let status = bidi.status().await?;
///     println!("ready: {}", status.ready);
///
///     bidi.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BiDi {
    broker: Broker,
    session: SessionModule,
}

impl BiDi {
    /// Connects to `endpoint` with default options.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the endpoint is not a `ws`/`wss` URL
    /// - [`Error::Url`] if the endpoint does not parse
    /// - Any connection error
    pub async fn connect(endpoint: &str) -> Result<Self> {
        Self::connect_with_options(endpoint, BiDiOptions::default()).await
    }

    /// Connects to `endpoint` over a WebSocket.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - See [`connect`](Self::connect)
    pub async fn connect_with_options(endpoint: &str, options: BiDiOptions) -> Result<Self> {
        options.validate()?;
        let endpoint = parse_endpoint(endpoint)?;
        let transport = Arc::new(WebSocketTransport::new(&options));
        Self::connect_with_transport(transport, &endpoint, options).await
    }

    /// Connects over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - Any error from the transport's `connect`
    pub async fn connect_with_transport(
        transport: Arc<dyn Transport>,
        endpoint: &Url,
        options: BiDiOptions,
    ) -> Result<Self> {
        options.validate()?;

        let broker = Broker::new(transport, options);
        broker.connect(endpoint).await?;
        debug!(%endpoint, "BiDi session connected");

        Ok(Self {
            session: SessionModule::new(broker.clone()),
            broker,
        })
    }

    /// Returns the broker for issuing commands and subscribing to events.
    #[inline]
    #[must_use]
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Returns the `session` module.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionModule {
        &self.session
    }

    /// Shortcut for `session.status`.
    ///
    /// # Errors
    ///
    /// Any command error.
    pub async fn status(&self) -> Result<StatusResult> {
        self.session.status().await
    }

    /// Ends the remote session, then closes the connection.
    ///
    /// The connection is closed even if `session.end` fails.
    ///
    /// # Errors
    ///
    /// Returns the `session.end` error, if any.
    pub async fn end(&self) -> Result<()> {
        let ended = self.session.end().await;
        self.broker.close().await;
        ended
    }

    /// Closes the connection without ending the remote session.
    pub async fn close(&self) {
        self.broker.close().await;
    }
}

/// Parses and checks a BiDi endpoint URL.
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::invalid_argument(format!(
            "unsupported endpoint scheme '{other}', expected ws or wss"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
