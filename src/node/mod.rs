//! Node lifecycle: modes, status, and the controller.
//!
//! A browser node makes one local browser reachable through the panel.
//! Starting it walks a fixed sequence; the relay then runs until the
//! tunnel drops, the browser dies, or the host asks for a stop.
//!
//! # Lifecycle
//!
//! ```text
//! start(mode)
//!   ├─ external: spawn Chrome/Edge with a debugging port
//!   └─ internal: request an embedded surface from the host
//!        │
//!        ▼
//! poll /json/version until the debugger endpoint appears
//!        │
//!        ▼
//! open the provider tunnel, dial the local endpoint, pump frames
//!        │
//!        ▼
//! stop() / tunnel lost / browser gone  →  teardown  →  idle
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | The public start/stop/status surface |
//! | `session` | Phase machine and session ownership |

// ============================================================================
// Submodules
// ============================================================================

/// The public start/stop/status surface.
pub mod controller;

/// Phase machine and session ownership.
pub(crate) mod session;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use controller::{NodeController, NodeControllerBuilder};

// ============================================================================
// NodeMode
// ============================================================================

/// Where the relayed browser comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// A separate Chrome or Edge process with an open debugging port.
    External,
    /// A browser surface embedded in the host application.
    Internal,
}

impl NodeMode {
    /// The wire spelling, as used in status payloads and host commands.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeMode::External => "external",
            NodeMode::Internal => "internal",
        }
    }
}

impl fmt::Display for NodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external" => Ok(NodeMode::External),
            "internal" => Ok(NodeMode::Internal),
            other => Err(Error::config(format!("unknown node mode: {other}"))),
        }
    }
}

// ============================================================================
// NodeStatus
// ============================================================================

/// Point-in-time snapshot of the node, shaped for host UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// True from an accepted start until teardown finishes.
    pub is_running: bool,
    /// Mode of the current session, if any.
    pub mode: Option<NodeMode>,
    /// Local debugger endpoint of the current session, once discovered.
    pub ws_endpoint: Option<String>,
}

// ============================================================================
// StartOutcome
// ============================================================================

/// What a start request produced, shaped for host UIs.
///
/// Start failures are ordinary outcomes, not panics or lost errors: the
/// message carries the user-facing explanation either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    /// True when the start attempt left the node running.
    pub success: bool,
    /// User-facing explanation of the outcome.
    pub message: String,
}

impl StartOutcome {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
