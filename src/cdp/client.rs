//! Connecting to the browser's debugger endpoint.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::debug;

use crate::error::{Error, Result};
use crate::relay::WsStream;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on one connection attempt, handshake included.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Connect
// ============================================================================

/// Opens a WebSocket to the browser-level CDP endpoint.
///
/// # Errors
///
/// - [`Error::ConnectTimeout`] when the attempt outlives [`CONNECT_TIMEOUT`]
/// - [`Error::CdpConnect`] when the dial or handshake fails
pub(crate) async fn connect_cdp(url: &str) -> Result<WsStream> {
    match timeout(CONNECT_TIMEOUT, connect_async(url)).await {
        Ok(Ok((stream, _))) => {
            debug!(url = %url, "connected to the browser debugger");
            Ok(stream)
        }
        Ok(Err(error)) => Err(Error::cdp_connect(error.to_string())),
        Err(_) => Err(Error::connect_timeout(CONNECT_TIMEOUT.as_millis() as u64)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    use crate::testutil::{next_message, spawn_ws_acceptor};

    #[tokio::test]
    async fn test_connect_and_exchange_frames() {
        let mut acceptor = spawn_ws_acceptor().await;

        let mut client = connect_cdp(acceptor.url.as_str()).await.unwrap();
        let mut server = acceptor.next_accepted().await;

        client.send(Message::text("ping")).await.unwrap();
        let seen = next_message(&mut server, "frame from the client").await;
        assert_eq!(seen, Message::text("ping"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_recoverable() {
        let err = connect_cdp("ws://127.0.0.1:1/devtools/browser/nope")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CdpConnect { .. }));
        assert!(err.is_recoverable());
    }
}
