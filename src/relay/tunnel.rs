//! Relay tunnel client.
//!
//! The tunnel is the authenticated WebSocket connection to the panel
//! server. The node connects as a provider: it offers its local browser to
//! whatever automation clients the panel multiplexes on the other side.
//! There is no retry and no resume; if the tunnel cannot be established or
//! ends later, the session is over.

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::relay::WsStream;

// ============================================================================
// Constants
// ============================================================================

/// Relay endpoint path on the panel server.
pub(crate) const RELAY_PATH: &str = "/api/v1/browser/relay";

/// Role the node announces on connect.
pub(crate) const PROVIDER_ROLE: &str = "provider";

// ============================================================================
// Operations
// ============================================================================

/// Builds the relay endpoint URL from the connection quartet.
///
/// `clientId` and `apiKey` are percent-encoded; the assembled URL is parsed
/// once to reject malformed hosts before any connection attempt.
///
/// # Errors
///
/// Returns [`Error::Config`] when the config produces an invalid URL.
pub(crate) fn relay_url(config: &NodeConfig) -> Result<String> {
    let url = format!(
        "ws://{}:{}{}?clientId={}&role={}&apiKey={}",
        config.server_host,
        config.server_port,
        RELAY_PATH,
        urlencoding::encode(&config.client_name),
        PROVIDER_ROLE,
        urlencoding::encode(&config.api_key),
    );
    Url::parse(&url).map_err(|e| Error::config(format!("invalid relay endpoint: {e}")))?;
    Ok(url)
}

/// Opens the relay tunnel.
///
/// The URL carries the api key, so it is never logged.
///
/// # Errors
///
/// Returns [`Error::TunnelConnect`] when the handshake fails.
pub(crate) async fn connect_relay(url: &str) -> Result<WsStream> {
    debug!("Opening relay tunnel");
    match connect_async(url).await {
        Ok((stream, response)) => {
            info!(status = ?response.status(), "Relay tunnel established");
            Ok(stream)
        }
        Err(e) => Err(Error::tunnel_connect(e.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
