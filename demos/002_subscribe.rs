//! Event subscriptions.
//!
//! Demonstrates:
//! - A typed event payload with a browsing context
//! - Synchronous and asynchronous handlers
//! - A handler that issues commands
//! - Unsubscribing
//!
//! Usage:
//!   cargo run --example 002_subscribe
//!   cargo run --example 002_subscribe -- --no-wait
//!   cargo run --example 002_subscribe -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use anyhow::Context;
use common::Args;
use serde::Deserialize;
use serde_json::json;
use webdriver_bidi::session::CapabilitiesRequest;
use webdriver_bidi::{BiDi, BrowsingContextId, EventArgs, GenericCommand, SubscriptionOptions};

// ============================================================================
// Event Types
// ============================================================================

/// `browsingContext.load` / `browsingContext.domContentLoaded` payload.
#[derive(Debug, Clone, Deserialize)]
struct NavigationInfo {
    context: BrowsingContextId,
    url: String,
}

impl EventArgs for NavigationInfo {
    fn context(&self) -> Option<&BrowsingContextId> {
        Some(&self.context)
    }
}

/// `log.entryAdded` payload (subset).
#[derive(Debug, Clone, Deserialize)]
struct LogEntry {
    level: String,
    #[serde(default)]
    text: Option<String>,
}

impl EventArgs for LogEntry {}

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
    println!("=== 002: Subscribe ===\n");

    let bidi = BiDi::connect(&args.endpoint)
        .await
        .with_context(|| format!("connecting to {}", args.endpoint))?;
    bidi.session()
        .new_session(CapabilitiesRequest::default())
        .await
        .context("creating session")?;
    let broker = bidi.broker().clone();

    // ========================================================================
    // Subscribe
    // ========================================================================

    println!("[1] Subscribing to log.entryAdded (sync handler)...");
    let logs = broker
        .subscribe(
            "log.entryAdded",
            |entry: &LogEntry| {
                println!(
                    "    [log:{}] {}",
                    entry.level,
                    entry.text.as_deref().unwrap_or("")
                );
            },
            SubscriptionOptions::default(),
        )
        .await?;
    println!("    ✓ {}\n", logs.id());

    println!("[2] Subscribing to browsingContext.load (async handler)...");
    let loads = broker
        .subscribe_async(
            "browsingContext.load",
            {
                let broker = broker.clone();
                move |info: NavigationInfo| {
                    let broker = broker.clone();
                    async move {
                        println!("    [load] {} in {}", info.url, info.context);
                        let title = broker
                            .execute(&GenericCommand::new(
                                "script.evaluate",
                                json!({
                                    "expression": "document.title",
                                    "target": { "context": info.context },
                                    "awaitPromise": false,
                                }),
                            ))
                            .await;
                        match title {
                            Ok(result) => println!("    [load] title: {}", result["result"]["value"]),
                            Err(e) => println!("    [load] title failed: {e}"),
                        }
                    }
                }
            },
            SubscriptionOptions::default(),
        )
        .await?;
    println!("    ✓ {}\n", loads.id());

    // ========================================================================
    // Trigger Events
    // ========================================================================

    println!("[3] Opening a tab and navigating...");
    let created = broker
        .execute(&GenericCommand::new(
            "browsingContext.create",
            json!({ "type": "tab" }),
        ))
        .await?;
    let context = created["context"].as_str().unwrap_or_default().to_string();
    broker
        .execute(&GenericCommand::new(
            "browsingContext.navigate",
            json!({ "context": context, "url": "https://example.com", "wait": "complete" }),
        ))
        .await?;
    println!("    ✓ Navigated\n");

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Done
    // ========================================================================

    println!("[4] Unsubscribing...");
    logs.unsubscribe().await?;
    loads.unsubscribe().await?;
    println!("    ✓ Unsubscribed");

    bidi.end().await?;
    println!("\n=== Done ===");
    Ok(())
}
