//! Prizm Browser Node - CDP relay client for the Prizm panel.
//!
//! This library turns the machine it runs on into a *browser node*: it
//! acquires a local Chromium-based browser with an open Chrome DevTools
//! Protocol (CDP) endpoint and relays that endpoint to a Prizm panel
//! server over a single WebSocket tunnel.
//!
//! # Architecture
//!
//! The node sits between two WebSocket worlds and never interprets the
//! traffic passing through it:
//!
//! ```text
//!   Panel server                    Browser node                 Local browser
//! ┌──────────────┐    tunnel     ┌──────────────┐    CDP ws    ┌──────────────┐
//! │ /api/v1/     │◄─────────────►│     pump     │◄────────────►│ Chrome/Edge  │
//! │ browser/relay│   (provider)  │              │  (loopback)  │ or embedded  │
//! └──────────────┘               └──────────────┘              │ surface      │
//!                                                              └──────────────┘
//! ```
//!
//! Key behaviors:
//!
//! - **Two modes**: [`NodeMode::External`] spawns an installed Chrome or
//!   Edge; [`NodeMode::Internal`] borrows an embedded surface from the
//!   host shell through [`SurfaceFactory`]
//! - **Asymmetric failure handling**: losing the tunnel stops the node;
//!   losing the local browser socket triggers one buffered reconnect
//! - **Exclusive teardown**: stop requests, browser exits, and tunnel
//!   failures race for a single teardown claim, so cleanup runs once
//!
//! # Quick Start
//!
//! ```no_run
//! use prizm_browser_node::{FileConfigStore, NodeController, NodeMode, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connection settings come from the shared config file
//!     let controller = NodeController::builder()
//!         .config_store(FileConfigStore::new()?)
//!         .build()?;
//!
//!     let outcome = controller.start(NodeMode::External).await;
//!     println!("{}", outcome.message);
//!
//!     // The node now relays panel traffic until stopped
//!     tokio::signal::ctrl_c().await?;
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Browser acquisition: locate, spawn, embedded surfaces |
//! | [`config`] | Shared config file and the [`ConfigStore`] seam |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`node`] | Node lifecycle: [`NodeController`], phases, status |
//! | [`registration`] | One-time api-key registration with the panel |
//! | [`relay`] | Frame pump, pending buffer, tunnel (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Browser acquisition: locate, spawn, embedded surfaces.
///
/// External mode finds and launches an installed Chrome or Edge;
/// internal mode requests a surface from the host via [`SurfaceFactory`].
pub mod browser;

/// CDP endpoint discovery and the local WebSocket connection.
pub(crate) mod cdp;

/// Shared config file and the [`ConfigStore`] seam.
///
/// Configuration lives in a JSON file shared with the desktop shell.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Node lifecycle: controller, phases, status.
///
/// Use [`NodeController::builder()`] to create a configured controller.
pub mod node;

/// One-time api-key registration with the panel.
pub mod registration;

/// Frame relay between the panel and the local browser.
///
/// Internal module carrying opaque frames in both directions.
pub mod relay;

#[cfg(test)]
pub(crate) mod testutil;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    BrowserKind, CreatedSurface, EmbeddedSurface, LocatedBrowser, NODE_DEBUG_PORT,
    SURFACE_PARTITION, SurfaceFactory, SurfaceSpec, locate_browser,
};

// Config types
pub use config::{
    AppConfig, ClientSettings, ConfigStore, FileConfigStore, NodeConfig, ServerSettings,
};

// Error types
pub use error::{Error, Result};

// Node types
pub use node::{NodeController, NodeControllerBuilder, NodeMode, NodeStatus, StartOutcome};

// Registration
pub use registration::{Registration, check_health, ensure_registered, register_client};

// Relay types
pub use relay::{PENDING_FRAME_LIMIT, PendingOutbound, RelayFrame};
