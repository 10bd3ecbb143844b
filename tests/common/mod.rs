//! Shared helpers for integration tests.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;
use webdriver_bidi::{BiDiOptions, Broker, MemoryPeer, MemoryTransport};

// ============================================================================
// Setup
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns a broker connected to an in-memory peer.
pub async fn connected_broker() -> (Broker, MemoryPeer) {
    connected_broker_with(BiDiOptions::default()).await
}

/// Returns a broker with `options`, connected to an in-memory peer.
pub async fn connected_broker_with(options: BiDiOptions) -> (Broker, MemoryPeer) {
    init_logging();

    let (transport, peer) = MemoryTransport::pair();
    let broker = Broker::new(Arc::new(transport), options);
    broker
        .connect(&Url::parse("ws://memory/session").expect("url"))
        .await
        .expect("connect");
    (broker, peer)
}

// ============================================================================
// Remote End Helpers
// ============================================================================

/// Reads the next command and returns its id.
pub async fn expect_command(peer: &MemoryPeer, method: &str) -> (u64, Value) {
    let command = tokio::time::timeout(Duration::from_secs(5), peer.next_command())
        .await
        .expect("command in time")
        .expect("command");

    assert_eq!(command["method"], method, "unexpected command: {command}");
    let id = command["id"].as_u64().expect("numeric id");
    (id, command)
}

/// Acknowledges the next `session.subscribe` with `subscription`.
pub async fn ack_subscribe(peer: &MemoryPeer, subscription: &str) -> Value {
    let (id, command) = expect_command(peer, "session.subscribe").await;
    peer.reply_success(id, json!({ "subscription": subscription }))
        .expect("reply");
    command
}

/// Acknowledges the next `session.unsubscribe`.
pub async fn ack_unsubscribe(peer: &MemoryPeer) -> Value {
    let (id, command) = expect_command(peer, "session.unsubscribe").await;
    peer.reply_success(id, json!({})).expect("reply");
    command
}

/// Polls `condition` until it holds or a second passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
