//! Error types for the browser node.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use prizm_browser_node::{Result, Error};
//!
//! async fn example(store: &dyn ConfigStore) -> Result<()> {
//!     let config = store.node_config()?;
//!     let url = relay_url(&config)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Registration`] |
//! | Browser | [`Error::BrowserNotFound`], [`Error::ProcessLaunchFailed`], [`Error::SurfaceUnavailable`] |
//! | Startup | [`Error::DiscoveryTimeout`], [`Error::StartupCancelled`], [`Error::AlreadyRunning`] |
//! | Local CDP | [`Error::CdpConnect`], [`Error::ConnectTimeout`] |
//! | Tunnel | [`Error::TunnelConnect`], [`Error::TunnelClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. The split between
/// recoverable and fatal variants mirrors the relay's reliability contract:
/// local CDP failures are survivable, tunnel failures are not.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the node configuration is missing, invalid, or cannot
    /// be persisted.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Panel registration failed.
    ///
    /// Returned when the panel server rejects a health check or a
    /// registration request.
    #[error("Registration failed: {message}")]
    Registration {
        /// Description of the registration failure.
        message: String,
    },

    // ========================================================================
    // Browser Errors
    // ========================================================================
    /// No supported browser installation exists on this machine.
    ///
    /// Returned when none of the Chrome or Edge candidate paths exist.
    #[error("No Chrome or Microsoft Edge installation found")]
    BrowserNotFound,

    /// Failed to launch the browser process.
    ///
    /// Returned when the browser binary exists but the process fails to
    /// start.
    #[error("Failed to launch browser: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// Embedded surface cannot be created.
    ///
    /// Returned in internal mode when no surface factory is registered or
    /// surface creation fails.
    #[error("Embedded surface unavailable: {message}")]
    SurfaceUnavailable {
        /// Description of the surface failure.
        message: String,
    },

    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// CDP endpoint discovery exhausted its polling schedule.
    ///
    /// Returned when `http://127.0.0.1:<port>/json/version` never produced
    /// a debugger URL before the configured attempts ran out.
    #[error("CDP endpoint on port {port} not ready after {attempts} attempts")]
    DiscoveryTimeout {
        /// Local debugging port that was polled.
        port: u16,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Startup was cancelled by a shutdown request.
    ///
    /// Returned when `stop()` arrives while `start()` is still in flight.
    #[error("Startup cancelled by shutdown request")]
    StartupCancelled,

    /// A session already exists.
    ///
    /// Returned when `start()` is called while the node is not idle.
    #[error("Browser node is already running")]
    AlreadyRunning,

    // ========================================================================
    // Local CDP Errors
    // ========================================================================
    /// Local CDP connection failed.
    ///
    /// Returned when the WebSocket connection to the local browser cannot
    /// be established, on the initial connect or on a reconnect attempt.
    #[error("Local CDP connection failed: {message}")]
    CdpConnect {
        /// Description of the connection failure.
        message: String,
    },

    /// Connection attempt exceeded its time bound.
    ///
    /// Returned when a local CDP connect or reconnect does not complete
    /// within the timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Tunnel Errors
    // ========================================================================
    /// Relay tunnel handshake failed.
    ///
    /// Returned when the WebSocket connection to the panel server cannot be
    /// established. Fatal to the start attempt.
    #[error("Relay tunnel connection failed: {message}")]
    TunnelConnect {
        /// Description of the handshake failure.
        message: String,
    },

    /// Relay tunnel closed after establishment.
    ///
    /// Fatal to the session; the node tears down to idle.
    #[error("Relay tunnel closed")]
    TunnelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a registration error.
    #[inline]
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates an embedded surface error.
    #[inline]
    pub fn surface_unavailable(message: impl Into<String>) -> Self {
        Self::SurfaceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a discovery timeout error.
    #[inline]
    pub fn discovery_timeout(port: u16, attempts: u32) -> Self {
        Self::DiscoveryTimeout { port, attempts }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }

    /// Creates a local CDP connection error.
    #[inline]
    pub fn cdp_connect(message: impl Into<String>) -> Self {
        Self::CdpConnect {
            message: message.into(),
        }
    }

    /// Creates a tunnel connection error.
    #[inline]
    pub fn tunnel_connect(message: impl Into<String>) -> Self {
        Self::TunnelConnect {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryTimeout { .. } | Self::ConnectTimeout { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors are on the local CDP path; the relay session
    /// survives them and retries delivery after a reconnect.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CdpConnect { .. } | Self::ConnectTimeout { .. })
    }

    /// Returns `true` if this error ends a running session.
    ///
    /// Fatal errors come from the tunnel side; the node tears down to idle
    /// when one occurs.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TunnelConnect { .. } | Self::TunnelClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
