//! Node lifecycle controller.
//!
//! [`NodeController`] is the crate's main entry point: `start`, `stop`,
//! `status`. It drives startup through the session phase machine,
//! spawns the guards that watch the browser and the relay, and funnels
//! every teardown through one exclusive claim so a stop request, a
//! dying browser, and a dropped tunnel cannot dismantle the same
//! session twice.
//!
//! # Concurrency
//!
//! The controller is a cheap [`Clone`] over shared state and is safe to
//! call from any task. `start` races cleanly with `stop`: whichever
//! claims the session first wins, and the loser releases whatever it
//! had already acquired.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::browser::NODE_DEBUG_PORT;
use crate::browser::launcher::{LaunchedBrowser, launch_external, launch_internal};
use crate::browser::surface::SurfaceFactory;
use crate::cdp::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, connect_cdp, resolve_browser_ws_url,
};
use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::node::session::{NodePhase, NodeSession, SessionToken, TornSession};
use crate::node::{NodeMode, NodeStatus, StartOutcome};
use crate::relay::pump::{PumpEnd, spawn_pump};
use crate::relay::tunnel::{connect_relay, relay_url};

// ============================================================================
// NodeControllerBuilder
// ============================================================================

/// Builder for a [`NodeController`].
///
/// Use [`NodeController::builder()`] to create one.
pub struct NodeControllerBuilder {
    config: Option<Arc<dyn ConfigStore>>,
    surfaces: Option<Arc<dyn SurfaceFactory>>,
    browser_path: Option<PathBuf>,
    debug_port: u16,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl NodeControllerBuilder {
    /// Creates a builder with the stock debugging port and discovery
    /// schedule.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            surfaces: None,
            browser_path: None,
            debug_port: NODE_DEBUG_PORT,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the source of panel connection settings. Required.
    #[must_use]
    pub fn config_store(mut self, store: impl ConfigStore + 'static) -> Self {
        self.config = Some(Arc::new(store));
        self
    }

    /// Registers the host's embedded surface factory.
    ///
    /// Without one, starting in [`NodeMode::Internal`] fails.
    #[must_use]
    pub fn surface_factory(mut self, factory: impl SurfaceFactory + 'static) -> Self {
        self.surfaces = Some(Arc::new(factory));
        self
    }

    /// Pins the external browser binary instead of locating one.
    #[must_use]
    pub fn browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_path = Some(path.into());
        self
    }

    /// Overrides the CDP debugging port used in external mode.
    #[must_use]
    pub fn debug_port(mut self, port: u16) -> Self {
        self.debug_port = port;
        self
    }

    /// Overrides how often and how long discovery polls `/json/version`.
    #[must_use]
    pub fn discovery_schedule(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// Builds the controller with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no config store was set
    /// - [`Error::Config`] if the discovery schedule has zero attempts
    pub fn build(self) -> Result<NodeController> {
        let config = self.config.ok_or_else(|| {
            Error::config("A config store is required. Use .config_store() to set one.")
        })?;
        if self.poll_attempts == 0 {
            return Err(Error::config(
                "Discovery needs at least one attempt. Use .discovery_schedule() with attempts >= 1.",
            ));
        }

        Ok(NodeController {
            inner: Arc::new(ControllerInner {
                config,
                surfaces: self.surfaces,
                browser_path: self.browser_path,
                debug_port: self.debug_port,
                poll_attempts: self.poll_attempts,
                poll_interval: self.poll_interval,
                session: Mutex::new(NodeSession::idle()),
            }),
        })
    }
}

impl Default for NodeControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// NodeController
// ============================================================================

/// Shared state behind every controller clone.
struct ControllerInner {
    config: Arc<dyn ConfigStore>,
    surfaces: Option<Arc<dyn SurfaceFactory>>,
    browser_path: Option<PathBuf>,
    debug_port: u16,
    poll_attempts: u32,
    poll_interval: Duration,
    session: Mutex<NodeSession>,
}

/// Starts, stops, and reports on the browser node.
#[derive(Clone)]
pub struct NodeController {
    inner: Arc<ControllerInner>,
}

impl fmt::Debug for NodeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeController")
            .field("phase", &self.inner.session.lock().phase())
            .finish_non_exhaustive()
    }
}

impl NodeController {
    /// Returns a builder for configuring a controller.
    #[inline]
    #[must_use]
    pub fn builder() -> NodeControllerBuilder {
        NodeControllerBuilder::new()
    }

    /// Starts the node in the given mode.
    ///
    /// Returns once the relay is running, or once startup has failed and
    /// everything acquired along the way is released again. Failures are
    /// reported in the outcome, not as an `Err`; a start while a session
    /// exists fails with an "already running" message.
    pub async fn start(&self, mode: NodeMode) -> StartOutcome {
        let begun = self.inner.session.lock().begin(mode);
        let token = match begun {
            Ok(token) => token,
            Err(error) => {
                debug!(%mode, error = %error, "Start rejected");
                return StartOutcome::failure(error.to_string());
            }
        };

        info!(%mode, "Starting browser node");
        match self.run_start(mode, token).await {
            Ok(ws_url) => {
                info!(%mode, url = %ws_url, "Browser node is running");
                StartOutcome::success(format!("browser node started in {mode} mode"))
            }
            Err(error) => {
                warn!(%mode, error = %error, "Browser node failed to start");
                self.teardown(Some(token), "start failed").await;
                StartOutcome::failure(error.to_string())
            }
        }
    }

    /// Stops the node and returns once teardown finished.
    ///
    /// Idempotent: stopping an idle node does nothing. A stop during
    /// startup cancels the start attempt; its resources are released by
    /// whichever side holds them.
    pub async fn stop(&self) {
        let torn = self.inner.session.lock().take_for_teardown(None);
        match torn {
            Some(torn) => self.dismantle(torn, "stop requested").await,
            None => debug!("Stop requested but the node is idle"),
        }
    }

    /// Snapshot of the node for the host UI.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.inner.session.lock().status()
    }

    /// The startup sequence. Every step checks the session is still live,
    /// so a concurrent stop aborts it between steps at the latest.
    async fn run_start(&self, mode: NodeMode, token: SessionToken) -> Result<String> {
        let inner = &self.inner;

        // Acquire a browser for the requested mode.
        let launched = match mode {
            NodeMode::External => {
                launch_external(inner.browser_path.as_deref(), inner.debug_port).await?
            }
            NodeMode::Internal => launch_internal(inner.surfaces.clone()).await?,
        };
        let LaunchedBrowser {
            handle,
            debug_port,
            exited,
        } = launched;

        let attached = inner.session.lock().attach_browser(token, handle);
        if let Err(mut handle) = attached {
            debug!(browser = handle.describe(), "Start overtaken by stop; releasing the browser");
            handle.shut_down().await;
            return Err(Error::StartupCancelled);
        }
        inner.session.lock().advance(token, NodePhase::WaitingForCdp)?;
        self.spawn_exit_guard(token, exited);

        // Wait for the browser to expose its debugger endpoint.
        let watch = Arc::clone(inner);
        let cancelled = move || !watch.session.lock().is_live(token);
        let ws_url =
            resolve_browser_ws_url(debug_port, inner.poll_attempts, inner.poll_interval, cancelled)
                .await?;

        inner.session.lock().set_local_ws_url(token, ws_url.clone())?;
        inner.session.lock().advance(token, NodePhase::ConnectingTunnel)?;

        // Open the tunnel, then the local socket, then pump.
        let node_config = inner.config.node_config()?;
        let url = relay_url(&node_config)?;
        let tunnel = connect_relay(&url).await?;
        let local = connect_cdp(&ws_url).await?;

        let (link, end_rx) = spawn_pump(tunnel, local, ws_url.clone());
        let attached = inner.session.lock().attach_relay(token, link);
        if let Err(link) = attached {
            debug!("Start overtaken by stop; releasing the relay");
            link.shut_down().await;
            return Err(Error::StartupCancelled);
        }
        inner.session.lock().advance(token, NodePhase::Running)?;
        self.spawn_pump_guard(token, end_rx);

        Ok(ws_url)
    }

    /// Tears down one specific session; no-op when it is already gone.
    async fn teardown(&self, token: Option<SessionToken>, reason: &str) {
        let torn = self.inner.session.lock().take_for_teardown(token);
        if let Some(torn) = torn {
            self.dismantle(torn, reason).await;
        }
    }

    /// Dismantles a claimed session: relay first, then the browser, then
    /// back to idle.
    async fn dismantle(&self, torn: TornSession, reason: &str) {
        if let Some(link) = torn.relay {
            link.shut_down().await;
        }
        if let Some(mut browser) = torn.browser {
            debug!(browser = browser.describe(), "Shutting the browser down");
            browser.shut_down().await;
        }
        self.inner.session.lock().complete_teardown();
        info!(reason, "Browser node stopped");
    }

    /// Tears the node down when the browser ends outside a node stop.
    fn spawn_exit_guard(&self, token: SessionToken, exited: oneshot::Receiver<String>) {
        let controller = self.clone();
        tokio::spawn(async move {
            match exited.await {
                Ok(reason) => {
                    warn!(reason = %reason, "Browser is gone; tearing the node down");
                    controller.teardown(Some(token), "browser exited").await;
                }
                // Sender dropped during a deliberate shutdown.
                Err(_) => {}
            }
        });
    }

    /// Tears the node down when the pump dies on a tunnel failure.
    fn spawn_pump_guard(&self, token: SessionToken, end_rx: oneshot::Receiver<PumpEnd>) {
        let controller = self.clone();
        tokio::spawn(async move {
            match end_rx.await {
                Ok(PumpEnd::Failed(error)) => {
                    warn!(error = %error, "Relay failed; tearing the node down");
                    controller.teardown(Some(token), "tunnel lost").await;
                }
                Ok(PumpEnd::Shutdown) | Err(_) => {}
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
