//! WebSocket client transport.
//!
//! Connects to the remote end with tokio-tungstenite and splits the stream
//! into independently locked halves: one writer shared by all senders, one
//! reader owned in practice by the broker's receive loop.
//!
//! Fragmented data messages are reassembled by tungstenite; control frames
//! (ping, pong) are skipped until a complete text or binary message arrives.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::options::{BiDiOptions, saturating_millis};

use super::Transport;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// WebSocket connection to a BiDi endpoint.
pub struct WebSocketTransport {
    /// Outbound half; the mutex serializes concurrent senders.
    writer: AsyncMutex<Option<SplitSink<WsStream, Message>>>,
    /// Inbound half.
    reader: AsyncMutex<Option<SplitStream<WsStream>>>,
    /// Set once `connect` succeeds.
    connected: AtomicBool,
    /// Set on `close` or when the remote end closes.
    closed: AtomicBool,
    /// Handshake timeout.
    connect_timeout: Duration,
    /// Maximum inbound message size in bytes.
    max_message_size: Option<usize>,
}

impl WebSocketTransport {
    /// Creates an unconnected transport configured from `options`.
    #[must_use]
    pub fn new(options: &BiDiOptions) -> Self {
        Self {
            writer: AsyncMutex::new(None),
            reader: AsyncMutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            connect_timeout: options.connect_timeout,
            max_message_size: options.max_message_size,
        }
    }

    /// Returns the error for an operation on a missing stream half.
    fn unavailable(&self) -> Error {
        if self.closed.load(Ordering::Acquire) {
            Error::ConnectionClosed
        } else {
            Error::NotConnected
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(&BiDiOptions::default())
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &Url) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Err(Error::connection("transport is already connected"));
        }

        let mut config = WebSocketConfig::default();
        if let Some(size) = self.max_message_size {
            config = config.max_message_size(Some(size));
        }

        let handshake = connect_async_with_config(endpoint.as_str(), Some(config), true);
        let (stream, _response) = timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| Error::connection_timeout(saturating_millis(self.connect_timeout)))?
            .map_err(|e| Error::connection(format!("{endpoint}: {e}")))?;

        let (write, read) = stream.split();
        *self.writer.lock().await = Some(write);
        *self.reader.lock().await = Some(read);
        self.connected.store(true, Ordering::Release);

        info!(%endpoint, "WebSocket connection established");
        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or_else(|| self.unavailable())?;

        trace!(message = %message, "BiDi SND -->");

        sink.send(Message::Text(message.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or_else(|| self.unavailable())?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(message = %text.as_str(), "BiDi RCV <--");
                    return Ok(text.as_bytes().to_vec());
                }

                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "BiDi RCV <-- (binary)");
                    return Ok(data.to_vec());
                }

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    self.closed.store(true, Ordering::Release);
                    return Err(Error::ConnectionClosed);
                }

                // Ping, Pong and raw frames carry no payload for us
                Some(Ok(_)) => {}

                Some(Err(e)) => return Err(map_ws_error(e)),

                None => {
                    debug!("WebSocket stream ended");
                    self.closed.store(true, Ordering::Release);
                    return Err(Error::ConnectionClosed);
                }
            }
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);

        let writer = self.writer.lock().await.take();
        if let Some(mut sink) = writer {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Failed to send close frame");
            }
            debug!("WebSocket transport closed");
        }

        // The receive loop may still hold the reader; it is released with it
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }
}

/// Maps tungstenite errors, folding closed-connection variants.
fn map_ws_error(error: WsError) -> Error {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ConnectionClosed,
        other => Error::WebSocket(other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    async fn echo_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");

            while let Some(Ok(message)) = ws.next().await {
                if message.is_text() && ws.send(message).await.is_err() {
                    break;
                }
            }
        });

        Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url")
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let transport = WebSocketTransport::default();
        let err = transport.send("{}".into()).await.expect_err("not connected");
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_receive_before_connect() {
        let transport = WebSocketTransport::default();
        let err = transport.receive().await.expect_err("not connected");
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let transport = WebSocketTransport::default();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        let err = transport.connect(&url).await.expect_err("refused");
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let url = echo_server().await;
        let transport = WebSocketTransport::default();
        transport.connect(&url).await.expect("connect");

        transport
            .send(r#"{"id":1,"method":"x.y","params":{}}"#.into())
            .await
            .expect("send");
        let echoed = transport.receive().await.expect("receive");
        assert_eq!(echoed, br#"{"id":1,"method":"x.y","params":{}}"#);

        transport.close().await;
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let url = echo_server().await;
        let transport = WebSocketTransport::default();
        transport.connect(&url).await.expect("connect");

        let err = transport.connect(&url).await.expect_err("second connect");
        assert!(matches!(err, Error::Connection { .. }));

        transport.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let url = echo_server().await;
        let transport = WebSocketTransport::default();
        transport.connect(&url).await.expect("connect");

        transport.close().await;
        transport.close().await;

        let err = transport.send("{}".into()).await.expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
