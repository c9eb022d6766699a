//! Frame relay between the panel and the local browser.
//!
//! This module carries opaque WebSocket frames in both directions. It
//! never parses DevTools protocol traffic; the panel speaks to the
//! browser through it as if the browser were local.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                          ┌─────────────────┐
//! │  Panel server   │        tunnel (ws)       │  Browser node   │
//! │                 │◄────────────────────────►│                 │
//! │  /api/v1/       │   clientId, provider,    │  pump ◄──► CDP  │
//! │  browser/relay  │   apiKey                 │  (localhost)    │
//! └─────────────────┘                          └─────────────────┘
//! ```
//!
//! # Relay Lifecycle
//!
//! 1. `relay_url` - Build the provider tunnel URL from node settings
//! 2. `connect_relay` - Open the tunnel to the panel
//! 3. `spawn_pump` - Relay frames between tunnel and local browser
//! 4. `RelayLink::shut_down` - Close both sockets on stop
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `buffer` | Bounded queue for frames awaiting the local browser |
//! | `frame` | The relayed subset of WebSocket messages |
//! | `pump` | The bidirectional relay task |
//! | `tunnel` | Provider tunnel URL and connection |

// ============================================================================
// Submodules
// ============================================================================

/// Bounded queue for frames awaiting the local browser.
pub mod buffer;

/// The relayed subset of WebSocket messages.
pub mod frame;

/// The bidirectional relay task.
pub(crate) mod pump;

/// Provider tunnel URL and connection.
pub(crate) mod tunnel;

// ============================================================================
// Types
// ============================================================================

use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Client-side WebSocket stream shared by the tunnel and the local
/// browser connection.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Re-exports
// ============================================================================

pub use buffer::{PENDING_FRAME_LIMIT, PendingOutbound};
pub use frame::RelayFrame;
