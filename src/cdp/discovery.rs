//! Debugger endpoint discovery.
//!
//! A freshly launched browser takes a moment to open its DevTools
//! port. This module polls `http://127.0.0.1:<port>/json/version`
//! until the browser answers with a `webSocketDebuggerUrl`, the
//! browser-level CDP endpoint the relay attaches to.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// How many times the version endpoint is probed before giving up.
pub(crate) const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Pause between probes.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-probe HTTP timeout, so a wedged endpoint cannot stall the poll.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Version info
// ============================================================================

/// The slice of the `/json/version` answer the node cares about.
#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl", default)]
    web_socket_debugger_url: String,
    #[serde(rename = "Browser", default)]
    browser: String,
}

// ============================================================================
// Discovery
// ============================================================================

/// Polls the local debugger port until it yields a WebSocket endpoint.
///
/// `cancelled` is consulted before every probe; startup aborts between
/// probes when it returns true.
///
/// # Errors
///
/// - [`Error::StartupCancelled`] when `cancelled` reports true
/// - [`Error::DiscoveryTimeout`] when every probe fails
pub(crate) async fn resolve_browser_ws_url(
    port: u16,
    attempts: u32,
    interval: Duration,
    cancelled: impl Fn() -> bool,
) -> Result<String> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    for attempt in 1..=attempts {
        if cancelled() {
            return Err(Error::StartupCancelled);
        }

        match probe_version(&client, port).await {
            Ok(ws_url) => {
                debug!(attempt, url = %ws_url, "browser debugger endpoint resolved");
                return Ok(ws_url);
            }
            Err(error) => {
                debug!(attempt, attempts, error = %error, "debugger endpoint not ready");
            }
        }

        if attempt < attempts {
            sleep(interval).await;
        }
    }

    Err(Error::discovery_timeout(port, attempts))
}

/// One probe of the version endpoint.
async fn probe_version(client: &reqwest::Client, port: u16) -> Result<String> {
    let response = client
        .get(format!("http://127.0.0.1:{port}/json/version"))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::cdp_connect(format!(
            "version endpoint answered {status}"
        )));
    }

    let info: VersionInfo = response.json().await?;
    let ws_url = info.web_socket_debugger_url.trim();
    if ws_url.is_empty() {
        return Err(Error::cdp_connect(
            "version info carries no webSocketDebuggerUrl",
        ));
    }

    let parsed =
        Url::parse(ws_url).map_err(|e| Error::cdp_connect(format!("bad debugger url: {e}")))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(Error::cdp_connect(format!(
            "debugger url has scheme {}, expected ws or wss",
            parsed.scheme()
        )));
    }

    if !info.browser.is_empty() {
        debug!(browser = %info.browser, "browser identified itself");
    }
    Ok(ws_url.to_owned())
}

// ============================================================================
// Tests
// ============================================================================
