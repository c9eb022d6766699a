//! The relay pump: one task that owns both sides of the relay.
//!
//! Frames from the panel tunnel go to the local browser and replies go
//! back, unchanged. The tunnel is the session: when it closes or errors
//! the pump reports failure and the node tears down. The local browser
//! socket is expendable: on loss the pump buffers tunnel frames, dials
//! the browser again, and replays the queue in order.
//!
//! # Delivery guarantees
//!
//! Frames are delivered at most once and in order. Only one reconnect
//! attempt runs at a time; while it runs, tunnel frames queue in a
//! bounded buffer that drops its oldest entry when full. A failed
//! attempt forfeits the whole queue so a recovered browser never sees
//! a stale half of a conversation.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, trace, warn};

use crate::cdp::connect_cdp;
use crate::error::{Error, Result};
use crate::relay::WsStream;
use crate::relay::buffer::PendingOutbound;
use crate::relay::frame::RelayFrame;

// ============================================================================
// Constants
// ============================================================================

/// How long a shutdown request may take before the pump task is abandoned.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// PumpCommand
// ============================================================================

/// Control messages for the pump task.
#[derive(Debug)]
enum PumpCommand {
    /// Close both sockets and stop.
    Shutdown,
}

// ============================================================================
// PumpEnd
// ============================================================================

/// Why the pump stopped. Sent once, after both sockets are closed.
#[derive(Debug)]
pub(crate) enum PumpEnd {
    /// Stopped on request; not an error.
    Shutdown,
    /// The tunnel is gone and the session cannot continue.
    Failed(Error),
}

// ============================================================================
// RelayLink
// ============================================================================

/// Handle to a running pump task.
#[derive(Debug)]
pub(crate) struct RelayLink {
    command_tx: mpsc::UnboundedSender<PumpCommand>,
    task: JoinHandle<()>,
}

impl RelayLink {
    /// Stops the pump and waits for both sockets to close.
    pub(crate) async fn shut_down(self) {
        let _ = self.command_tx.send(PumpCommand::Shutdown);
        let mut task = self.task;
        if timeout(SHUTDOWN_WAIT, &mut task).await.is_err() {
            warn!("relay pump did not stop in time; aborting it");
            task.abort();
        }
    }
}

/// Starts the relay over an established tunnel and local browser socket.
///
/// Returns the control handle and a receiver that reports why the pump
/// stopped. The receiver fires only after both sockets are closed.
pub(crate) fn spawn_pump(
    tunnel: WsStream,
    local: WsStream,
    local_ws_url: String,
) -> (RelayLink, oneshot::Receiver<PumpEnd>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (end_tx, end_rx) = oneshot::channel();

    let pump = Pump {
        command_rx,
        tunnel,
        local: Some(local),
        local_ws_url,
        pending: PendingOutbound::new(),
        reconnect: None,
    };
    let task = tokio::spawn(pump.run(end_tx));

    (RelayLink { command_tx, task }, end_rx)
}

// ============================================================================
// Forward policy
// ============================================================================

/// What to do with a tunnel frame given the local link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardDisposition {
    /// Local socket open: deliver everything queued now.
    Flush,
    /// Reconnect in flight: leave the frame queued for it.
    Hold,
    /// No socket and no attempt: queue the frame and start one.
    Reconnect,
}

fn dispose_forward(local_open: bool, reconnect_in_flight: bool) -> ForwardDisposition {
    if local_open {
        ForwardDisposition::Flush
    } else if reconnect_in_flight {
        ForwardDisposition::Hold
    } else {
        ForwardDisposition::Reconnect
    }
}

// ============================================================================
// Pump
// ============================================================================

/// Single task owning the tunnel, the local socket, and the frame queue.
struct Pump {
    command_rx: mpsc::UnboundedReceiver<PumpCommand>,
    /// Panel tunnel; its loss ends the pump.
    tunnel: WsStream,
    /// Local browser socket; `None` between a loss and a reconnect.
    local: Option<WsStream>,
    /// Endpoint reconnect attempts dial.
    local_ws_url: String,
    /// Frames held for the local side while it is away.
    pending: PendingOutbound,
    /// At most one reconnect attempt at a time.
    reconnect: Option<JoinHandle<Result<WsStream>>>,
}

impl Pump {
    async fn run(mut self, end_tx: oneshot::Sender<PumpEnd>) {
        let end = self.drive().await;
        self.close_links().await;
        match &end {
            PumpEnd::Shutdown => debug!("relay pump stopped"),
            PumpEnd::Failed(error) => debug!(error = %error, "relay pump failed"),
        }
        let _ = end_tx.send(end);
    }

    async fn drive(&mut self) -> PumpEnd {
        loop {
            // Borrow the optional sockets as locals so the disabled arms
            // can hold them without blocking the rest of the select.
            let Pump {
                command_rx,
                tunnel,
                local,
                reconnect,
                ..
            } = self;

            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(PumpCommand::Shutdown) | None => return PumpEnd::Shutdown,
                },

                message = tunnel.next() => {
                    if let Some(end) = self.handle_tunnel_message(message).await {
                        return end;
                    }
                }

                message = async {
                    match local.as_mut() {
                        Some(ws) => ws.next().await,
                        None => std::future::pending().await,
                    }
                }, if local.is_some() => {
                    if let Some(end) = self.handle_local_message(message).await {
                        return end;
                    }
                }

                outcome = async {
                    match reconnect.as_mut() {
                        Some(attempt) => attempt.await,
                        None => std::future::pending().await,
                    }
                }, if reconnect.is_some() => {
                    self.reconnect = None;
                    self.finish_reconnect(outcome).await;
                }
            }
        }
    }

    /// Returns `Some` when the pump must stop.
    async fn handle_tunnel_message(
        &mut self,
        message: Option<std::result::Result<Message, WsError>>,
    ) -> Option<PumpEnd> {
        match message {
            Some(Ok(Message::Close(_))) | None => Some(PumpEnd::Failed(Error::TunnelClosed)),
            Some(Err(error)) => Some(PumpEnd::Failed(error.into())),
            Some(Ok(message)) => {
                if let Some(frame) = RelayFrame::from_message(message) {
                    self.forward_to_local(frame).await;
                }
                None
            }
        }
    }

    /// Returns `Some` when the pump must stop. Local losses never stop it.
    async fn handle_local_message(
        &mut self,
        message: Option<std::result::Result<Message, WsError>>,
    ) -> Option<PumpEnd> {
        match message {
            Some(Ok(Message::Close(_))) | None => {
                self.drop_local("connection closed");
                None
            }
            Some(Err(error)) => {
                self.drop_local(&error.to_string());
                None
            }
            Some(Ok(message)) => {
                let Some(frame) = RelayFrame::from_message(message) else {
                    return None;
                };
                trace!(bytes = frame.len(), "forwarding browser frame to tunnel");
                match self.tunnel.send(frame.into_message()).await {
                    Ok(()) => None,
                    Err(error) => Some(PumpEnd::Failed(error.into())),
                }
            }
        }
    }

    /// Queues a tunnel frame and delivers it according to the link state.
    async fn forward_to_local(&mut self, frame: RelayFrame) {
        trace!(bytes = frame.len(), "forwarding tunnel frame to browser");
        if let Some(evicted) = self.pending.push(frame) {
            warn!(
                bytes = evicted.len(),
                dropped_total = self.pending.dropped_total(),
                "pending frame buffer is full; dropped the oldest frame"
            );
        }
        match dispose_forward(self.local.is_some(), self.reconnect.is_some()) {
            ForwardDisposition::Flush => self.flush_pending().await,
            ForwardDisposition::Hold => {}
            ForwardDisposition::Reconnect => self.begin_reconnect(),
        }
    }

    /// Sends every queued frame to the local socket in arrival order.
    ///
    /// A write failure abandons the socket and the rest of the queue;
    /// the next tunnel frame starts a fresh reconnect attempt.
    async fn flush_pending(&mut self) {
        let mut failure: Option<WsError> = None;
        if let Some(local) = self.local.as_mut() {
            while let Some(frame) = self.pending.pop() {
                if let Err(error) = local.send(frame.into_message()).await {
                    failure = Some(error);
                    break;
                }
            }
        }
        if let Some(error) = failure {
            let discarded = self.pending.clear();
            warn!(
                error = %error,
                discarded,
                "failed to deliver to the local browser; queued frames discarded"
            );
            self.local = None;
        }
    }

    /// Abandons the local socket and starts a reconnect attempt.
    fn drop_local(&mut self, reason: &str) {
        self.local = None;
        warn!(reason, "local browser connection lost; buffering tunnel frames");
        self.begin_reconnect();
    }

    /// Starts a reconnect attempt unless one is already running.
    fn begin_reconnect(&mut self) {
        if self.reconnect.is_some() {
            return;
        }
        debug!(url = %self.local_ws_url, "reconnecting to the local browser");
        let url = self.local_ws_url.clone();
        self.reconnect = Some(tokio::spawn(async move { connect_cdp(&url).await }));
    }

    /// Installs a fresh local socket, or forfeits the queue when the
    /// attempt failed.
    async fn finish_reconnect(
        &mut self,
        outcome: std::result::Result<Result<WsStream>, JoinError>,
    ) {
        match outcome {
            Ok(Ok(ws)) => {
                info!(queued = self.pending.len(), "local browser reconnected");
                self.local = Some(ws);
                self.flush_pending().await;
            }
            Ok(Err(error)) => self.fail_reconnect(&error.to_string()),
            Err(error) => self.fail_reconnect(&error.to_string()),
        }
    }

    /// One failed attempt forfeits the queue; delivery stays at most once.
    fn fail_reconnect(&mut self, error: &str) {
        let discarded = self.pending.clear();
        warn!(
            error,
            discarded,
            "could not reconnect to the local browser; stop and start the node to attach a fresh one"
        );
    }

    /// Aborts any reconnect attempt and closes both sockets.
    async fn close_links(&mut self) {
        if let Some(attempt) = self.reconnect.take() {
            attempt.abort();
        }
        if let Some(mut local) = self.local.take() {
            let _ = local.close(None).await;
        }
        let _ = self.tunnel.close(None).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
