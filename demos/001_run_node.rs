//! Run a browser node in external mode.
//!
//! Demonstrates:
//! - Loading connection settings from the shared config file
//! - Starting the node (spawns Chrome/Edge, opens the relay tunnel)
//! - Reading node status while it relays
//! - Stopping the node cleanly
//!
//! Usage:
//!   cargo run --example 001_run_node
//!   cargo run --example 001_run_node -- --no-wait
//!   cargo run --example 001_run_node -- --debug
//!
//! Requires a registered api key in the config file; run 002_register
//! against a panel first.

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use prizm_browser_node::{AppConfig, FileConfigStore, NodeController, NodeMode, Result};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Run Node ===\n");

    // ========================================================================
    // Load Config
    // ========================================================================

    println!("[1] Loading config...");
    let config = AppConfig::load()?;
    println!("    Panel:  {}", config.server_url());
    println!("    Client: {}", config.client.name);
    if config.api_key.trim().is_empty() {
        println!("    ✗ No api key configured; run 002_register first");
    } else {
        println!("    ✓ Api key present\n");
    }

    // ========================================================================
    // Start Node
    // ========================================================================

    println!("[2] Starting node (external mode)...");

    let controller = NodeController::builder()
        .config_store(FileConfigStore::new()?)
        .build()?;

    let outcome = controller.start(NodeMode::External).await;
    if !outcome.success {
        println!("    ✗ {}", outcome.message);
        return Ok(());
    }
    println!("    ✓ {}\n", outcome.message);

    // ========================================================================
    // Status
    // ========================================================================

    println!("[3] Node status...");
    let status = controller.status();
    println!("    Running:  {}", status.is_running);
    if let Some(mode) = status.mode {
        println!("    Mode:     {mode}");
    }
    if let Some(endpoint) = &status.ws_endpoint {
        println!("    Endpoint: {endpoint}");
    }
    println!();

    println!("=== Node is relaying panel traffic ===\n");

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("\n[Cleanup] Stopping node...");
    controller.stop().await;
    println!("          ✓ Done");

    Ok(())
}
