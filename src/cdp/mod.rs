//! Chrome DevTools Protocol plumbing.
//!
//! The node never speaks CDP itself; it only finds the browser's
//! debugger endpoint and opens a socket to it. Frames on that socket
//! are relayed verbatim by [`crate::relay`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | WebSocket connection to the debugger endpoint |
//! | `discovery` | Polling `/json/version` for the endpoint URL |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection to the debugger endpoint.
pub(crate) mod client;

/// Polling `/json/version` for the endpoint URL.
pub(crate) mod discovery;

// ============================================================================
// Re-exports
// ============================================================================

pub(crate) use client::connect_cdp;
pub(crate) use discovery::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, resolve_browser_ws_url};
