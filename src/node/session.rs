//! Node session state.
//!
//! One mutex-guarded [`NodeSession`] holds everything an active node
//! owns: its phase, the browser handle, the relay link, and the token
//! identifying the start attempt that created it. Startup stages and
//! background guards all go through this value, so stop requests and
//! failures racing a startup resolve to exactly one teardown.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use uuid::Uuid;

use crate::browser::launcher::BrowserHandle;
use crate::error::{Error, Result};
use crate::node::{NodeMode, NodeStatus};
use crate::relay::pump::RelayLink;

// ============================================================================
// NodePhase
// ============================================================================

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePhase {
    /// No session.
    Idle,
    /// Start accepted; acquiring a browser.
    Starting,
    /// Browser up; polling for its debugger endpoint.
    WaitingForCdp,
    /// Endpoint known; opening the tunnel and the local socket.
    ConnectingTunnel,
    /// Relay pumping frames.
    Running,
    /// Teardown claimed; resources being dismantled.
    ShuttingDown,
}

impl NodePhase {
    /// Legal transitions. Startup walks forward one phase at a time;
    /// teardown may cut in anywhere after `Idle`.
    pub(crate) fn may_enter(self, next: NodePhase) -> bool {
        matches!(
            (self, next),
            (NodePhase::Idle, NodePhase::Starting)
                | (NodePhase::Starting, NodePhase::WaitingForCdp)
                | (NodePhase::WaitingForCdp, NodePhase::ConnectingTunnel)
                | (NodePhase::ConnectingTunnel, NodePhase::Running)
                | (NodePhase::Starting, NodePhase::ShuttingDown)
                | (NodePhase::WaitingForCdp, NodePhase::ShuttingDown)
                | (NodePhase::ConnectingTunnel, NodePhase::ShuttingDown)
                | (NodePhase::Running, NodePhase::ShuttingDown)
                | (NodePhase::ShuttingDown, NodePhase::Idle)
        )
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodePhase::Idle => "idle",
            NodePhase::Starting => "starting",
            NodePhase::WaitingForCdp => "waiting-for-cdp",
            NodePhase::ConnectingTunnel => "connecting-tunnel",
            NodePhase::Running => "running",
            NodePhase::ShuttingDown => "shutting-down",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SessionToken
// ============================================================================

/// Identity of one start attempt.
///
/// Background guards hold a copy; a token that no longer matches the
/// session means the node was stopped, or stopped and restarted,
/// underneath them, and their finding belongs to a dead session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionToken(Uuid);

impl SessionToken {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

// ============================================================================
// NodeSession
// ============================================================================

/// What a torn-down session must dismantle, in teardown order.
pub(crate) struct TornSession {
    pub browser: Option<BrowserHandle>,
    pub relay: Option<RelayLink>,
}

/// State of the node, owned by the controller behind a mutex.
pub(crate) struct NodeSession {
    phase: NodePhase,
    mode: Option<NodeMode>,
    token: Option<SessionToken>,
    browser: Option<BrowserHandle>,
    local_ws_url: Option<String>,
    relay: Option<RelayLink>,
    /// Set by the teardown claim; live checks fail from then on even
    /// though the token still matches.
    shutting_down: bool,
}

impl NodeSession {
    pub(crate) fn idle() -> Self {
        Self {
            phase: NodePhase::Idle,
            mode: None,
            token: None,
            browser: None,
            local_ws_url: None,
            relay: None,
            shutting_down: false,
        }
    }

    #[inline]
    pub(crate) fn phase(&self) -> NodePhase {
        self.phase
    }

    /// Claims the idle session for a new start attempt.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] whenever a session exists, including one
    /// that is still shutting down.
    pub(crate) fn begin(&mut self, mode: NodeMode) -> Result<SessionToken> {
        if self.phase != NodePhase::Idle {
            return Err(Error::AlreadyRunning);
        }
        let token = SessionToken::fresh();
        self.phase = NodePhase::Starting;
        self.mode = Some(mode);
        self.token = Some(token);
        Ok(token)
    }

    /// True while `token` identifies the current, not-yet-stopping session.
    #[inline]
    #[must_use]
    pub(crate) fn is_live(&self, token: SessionToken) -> bool {
        self.token == Some(token) && !self.shutting_down
    }

    /// Moves a live session to its next startup phase.
    pub(crate) fn advance(&mut self, token: SessionToken, next: NodePhase) -> Result<()> {
        if !self.is_live(token) {
            return Err(Error::StartupCancelled);
        }
        debug_assert!(
            self.phase.may_enter(next),
            "illegal phase transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
        Ok(())
    }

    /// Hands the browser to the session, or back to the caller when the
    /// session is no longer live.
    pub(crate) fn attach_browser(
        &mut self,
        token: SessionToken,
        browser: BrowserHandle,
    ) -> std::result::Result<(), BrowserHandle> {
        if !self.is_live(token) {
            return Err(browser);
        }
        self.browser = Some(browser);
        Ok(())
    }

    /// Records the discovered local debugger endpoint.
    pub(crate) fn set_local_ws_url(&mut self, token: SessionToken, url: String) -> Result<()> {
        if !self.is_live(token) {
            return Err(Error::StartupCancelled);
        }
        self.local_ws_url = Some(url);
        Ok(())
    }

    /// Hands the relay link to the session, or back to the caller when the
    /// session is no longer live.
    pub(crate) fn attach_relay(
        &mut self,
        token: SessionToken,
        relay: RelayLink,
    ) -> std::result::Result<(), RelayLink> {
        if !self.is_live(token) {
            return Err(relay);
        }
        self.relay = Some(relay);
        Ok(())
    }

    /// Claims the session for teardown, returning what must be dismantled.
    ///
    /// `token` restricts the claim to one particular session; `None`
    /// claims whichever session is there. The claim is exclusive: a second
    /// caller gets `None`, so teardown runs at most once per session.
    ///
    /// Mode and endpoint stay visible until [`Self::complete_teardown`],
    /// so a status probe during teardown still reports the session.
    pub(crate) fn take_for_teardown(&mut self, token: Option<SessionToken>) -> Option<TornSession> {
        if self.shutting_down || self.phase == NodePhase::Idle {
            return None;
        }
        if let Some(token) = token
            && self.token != Some(token)
        {
            return None;
        }
        self.shutting_down = true;
        self.phase = NodePhase::ShuttingDown;
        Some(TornSession {
            browser: self.browser.take(),
            relay: self.relay.take(),
        })
    }

    /// Returns the session to idle once teardown finished.
    pub(crate) fn complete_teardown(&mut self) {
        *self = Self::idle();
    }

    /// Snapshot for the host UI.
    pub(crate) fn status(&self) -> NodeStatus {
        NodeStatus {
            is_running: self.mode.is_some(),
            mode: self.mode,
            ws_endpoint: self.local_ws_url.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
