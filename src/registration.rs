//! Panel registration over HTTP.
//!
//! A browser node authenticates its relay tunnel with a panel-issued api
//! key. This module covers the one-time acquisition of that key: a health
//! probe of the panel, the `/auth/register` exchange, and the
//! [`ensure_registered`] convenience used by shells that want the node to
//! self-register on first run.
//!
//! Every request carries the `X-Prizm-Panel: true` header the panel uses to
//! distinguish client traffic from browser traffic.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{AppConfig, DEFAULT_SERVER_PORT};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header marking requests as panel-client traffic.
const PANEL_HEADER: &str = "x-prizm-panel";

/// Panel health endpoint.
const HEALTH_PATH: &str = "/health";

/// Panel registration endpoint.
const REGISTER_PATH: &str = "/auth/register";

/// Overall timeout for each panel request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    requested_scopes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    client_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Credentials issued by the panel at registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Panel-assigned client id; becomes the relay `clientId`.
    pub client_id: String,
    /// Api key authenticating the relay tunnel.
    pub api_key: String,
}

// ============================================================================
// Operations
// ============================================================================

/// Probes the panel health endpoint.
///
/// Returns `true` only for a 2xx response whose body reports
/// `{"status":"ok"}`.
///
/// # Errors
///
/// Returns [`Error::Http`] when the panel is unreachable or the body is not
/// valid JSON.
pub async fn check_health(base_url: &str) -> Result<bool> {
    let client = panel_client()?;
    let response = client
        .get(format!("{base_url}{HEALTH_PATH}"))
        .send()
        .await?;
    if !response.status().is_success() {
        debug!(status = %response.status(), "panel health probe failed");
        return Ok(false);
    }
    let health: HealthResponse = response.json().await?;
    Ok(health.status == "ok")
}

/// Registers this client with the panel.
///
/// The call is health-gated: an unhealthy panel fails the registration
/// before any credentials are requested.
///
/// # Errors
///
/// Returns [`Error::Registration`] when the panel is unhealthy or rejects
/// the request, [`Error::Http`] on transport failures.
pub async fn register_client(
    base_url: &str,
    name: &str,
    requested_scopes: &[String],
) -> Result<Registration> {
    if !check_health(base_url).await? {
        return Err(Error::registration("panel health check failed"));
    }

    let client = panel_client()?;
    let response = client
        .post(format!("{base_url}{REGISTER_PATH}"))
        .json(&RegisterRequest {
            name,
            requested_scopes,
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::registration(format!(
            "panel returned status {status}: {body}"
        )));
    }

    let issued: RegisterResponse = response.json().await?;
    info!(client_id = %issued.client_id, "registered with panel");
    Ok(Registration {
        client_id: issued.client_id,
        api_key: issued.api_key,
    })
}

/// Registers when the config has no api key yet and auto-registration is
/// enabled.
///
/// On success the panel-issued `client_id` and `api_key`, plus the host and
/// port parsed from `base_url`, are folded back into `config`. The caller
/// persists the config. Returns whether a registration happened.
///
/// # Errors
///
/// Same failure modes as [`register_client`], plus [`Error::Config`] for an
/// unparseable `base_url`.
pub async fn ensure_registered(config: &mut AppConfig, base_url: &str) -> Result<bool> {
    if !config.api_key.trim().is_empty() {
        return Ok(false);
    }
    if !config.client.auto_register {
        debug!("auto-registration disabled; leaving config untouched");
        return Ok(false);
    }

    let issued = register_client(base_url, &config.client.name, &config.client.requested_scopes)
        .await?;
    let (host, port) = host_port_of(base_url)?;

    config.server.host = host;
    config.server.port = port;
    config.client.name = issued.client_id;
    config.api_key = issued.api_key;
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

fn panel_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(PANEL_HEADER),
        HeaderValue::from_static("true"),
    );
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .build()?)
}

/// Splits a panel base URL into host and port, defaulting the port to
/// [`DEFAULT_SERVER_PORT`] when the URL does not name one.
///
/// The port comes from the authority text rather than [`Url::port`], which
/// hides ports matching the scheme default; `http://panel:80` names port 80
/// and must keep it.
fn host_port_of(base_url: &str) -> Result<(String, u16)> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::config(format!("invalid panel url {base_url}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::config(format!("panel url {base_url} has no host")))?;
    let port = explicit_port(base_url).unwrap_or(DEFAULT_SERVER_PORT);
    Ok((host.to_string(), port))
}

/// The port as written in the URL's authority, if any.
fn explicit_port(base_url: &str) -> Option<u16> {
    let rest = base_url.split_once("://").map_or(base_url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let (head, tail) = authority.rsplit_once(':')?;
    // A colon inside an IPv6 literal is not a port separator.
    if head.contains('[') && !head.ends_with(']') {
        return None;
    }
    tail.parse().ok()
}

// ============================================================================
// Tests
// ============================================================================
