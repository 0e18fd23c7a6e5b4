//! Single scan against a running bridge.
//!
//! Demonstrates:
//! - Building a client from NFC_BRIDGE_URL / NFC_BRIDGE_WS_URL
//! - Activating (probe + persistent channel)
//! - Listening for every scan while waiting for one
//! - Printing the outcome in its wire shape
//!
//! Usage:
//!   cargo run --example scan_once
//!   cargo run --example scan_once -- --debug
//!   cargo run --example scan_once -- --listen

// ============================================================================
// Imports
// ============================================================================

use nfc_scan_bridge::{Result, ScanBridge};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    listen: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            listen: args.iter().any(|a| a == "--listen"),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "nfc_scan_bridge=debug"
    } else {
        "nfc_scan_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    println!("=== Scan Once ===\n");

    // ========================================================================
    // Create Client
    // ========================================================================

    let bridge = ScanBridge::builder().build()?;
    println!("[1] Bridge: {}", bridge.config().http_url);
    println!("    Channel: {}\n", bridge.config().ws_url);

    // ========================================================================
    // Activate
    // ========================================================================

    println!("[2] Probing bridge...");
    if bridge.activate().await {
        println!("    ✓ Bridge available\n");
    } else {
        println!("    ✗ Bridge not reachable, native reading only\n");
    }

    let subscription = bridge.on_card_scanned(|serial| println!("    [listener] {serial}"));

    // ========================================================================
    // Scan
    // ========================================================================

    println!("[3] Present a card...");
    let outcome = bridge.scan_card().await;
    let json = serde_json::to_string(&outcome)?;
    println!("    {json}\n");

    if args.listen {
        println!("[4] Listening for more scans. Press Ctrl+C to exit...");
        tokio::signal::ctrl_c().await.ok();
    }

    bridge.unsubscribe(&subscription);
    bridge.shutdown();
    println!("=== Done ===");
    Ok(())
}
