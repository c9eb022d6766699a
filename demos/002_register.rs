//! Register this client with a Prizm panel.
//!
//! Demonstrates:
//! - Probing the panel health endpoint
//! - Registering for a panel-issued client id and api key
//! - Persisting the issued credentials to the shared config file
//!
//! Usage:
//!   cargo run --example 002_register
//!   cargo run --example 002_register -- --debug
//!
//! The panel base URL is taken from the config file (or its defaults when
//! no file exists yet).

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use prizm_browser_node::{AppConfig, Result, check_health, ensure_registered};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 002: Register ===\n");

    // ========================================================================
    // Load Config
    // ========================================================================

    println!("[1] Loading config...");
    let mut config = AppConfig::load()?;
    let base_url = config.server_url();
    println!("    Panel:  {base_url}");
    println!("    Client: {}\n", config.client.name);

    if !config.api_key.trim().is_empty() {
        println!("    ✓ Already registered; nothing to do");
        return Ok(());
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    println!("[2] Checking panel health...");
    if check_health(&base_url).await? {
        println!("    ✓ Panel is healthy\n");
    } else {
        println!("    ✗ Panel is not healthy; aborting");
        return Ok(());
    }

    // ========================================================================
    // Register
    // ========================================================================

    println!("[3] Registering...");
    if !ensure_registered(&mut config, &base_url).await? {
        println!("    - Skipped (auto-registration disabled)");
        return Ok(());
    }
    println!("    ✓ Registered as {}", config.client.name);
    println!("    ✓ Api key issued ({} chars)\n", config.api_key.len());

    // ========================================================================
    // Persist
    // ========================================================================

    println!("[4] Saving config...");
    config.save()?;
    println!("    ✓ Saved to {}", AppConfig::config_path()?.display());

    println!("\n=== Registration complete ===");
    Ok(())
}
