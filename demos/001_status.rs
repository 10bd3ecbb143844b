//! Connect, query status, create and end a session.
//!
//! Demonstrates:
//! - Connecting to a BiDi endpoint with custom options
//! - `session.status`
//! - `session.new` with capabilities
//! - Ending the session
//!
//! Start a browser with BiDi enabled first, for example:
//!   firefox --remote-debugging-port=9222
//!
//! Usage:
//!   cargo run --example 001_status
//!   cargo run --example 001_status -- --endpoint=ws://127.0.0.1:9222/session
//!   cargo run --example 001_status -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use common::Args;
use serde_json::json;
use webdriver_bidi::session::CapabilitiesRequest;
use webdriver_bidi::{BiDi, BiDiOptions};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== 001: Status ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[Setup] Connecting to {}...", args.endpoint);
    let options = BiDiOptions::new()
        .with_connect_timeout(Duration::from_secs(5))
        .with_command_timeout(Duration::from_secs(10));
    let bidi = BiDi::connect_with_options(&args.endpoint, options)
        .await
        .with_context(|| format!("connecting to {}", args.endpoint))?;
    println!("        ✓ Connected\n");

    // ========================================================================
    // Status
    // ========================================================================

    println!("[1] session.status...");
    let status = bidi.status().await?;
    println!("    ready: {}", status.ready);
    println!("    message: {}\n", status.message);

    // ========================================================================
    // New Session
    // ========================================================================

    println!("[2] session.new...");
    let capabilities =
        CapabilitiesRequest::default().with_always_match("acceptInsecureCerts", json!(true));
    let session = bidi
        .session()
        .new_session(capabilities)
        .await
        .context("creating session")?;
    println!("    ✓ Session {}", session.session_id);
    println!(
        "    Browser: {} {} on {}\n",
        session.capabilities.browser_name,
        session.capabilities.browser_version,
        session.capabilities.platform_name
    );

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Done
    // ========================================================================

    println!("[3] session.end...");
    bidi.end().await?;
    println!("    ✓ Session ended");

    println!("\n=== Done ===");
    Ok(())
}
