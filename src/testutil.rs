//! Shared test fixtures.
//!
//! In-process peers built from real sockets: a canned HTTP/1.1 responder
//! for the discovery and registration endpoints, and WebSocket acceptors
//! for tunnel and local CDP fakes. Compiled only for tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

/// Client-side WebSocket stream, as produced by `connect_async`.
pub(crate) type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Server-side WebSocket stream, as produced by `accept_async`.
pub(crate) type ServerWs = WebSocketStream<TcpStream>;

// ============================================================================
// HTTP Fake
// ============================================================================

/// One canned HTTP response.
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub(crate) fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    fn render(&self) -> String {
        let reason = match self.status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Status",
        };
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason,
            self.body.len(),
            self.body
        )
    }
}

/// A request the fake served, raw head and body.
#[derive(Debug)]
pub(crate) struct RecordedRequest {
    pub raw: String,
}

impl RecordedRequest {
    /// Request path from the start line.
    pub(crate) fn path(&self) -> &str {
        self.raw.split_whitespace().nth(1).unwrap_or("")
    }

    /// Case-insensitive header presence check against `name: value`.
    pub(crate) fn has_header(&self, name: &str, value: &str) -> bool {
        let needle = format!("{}: {}", name.to_ascii_lowercase(), value.to_ascii_lowercase());
        self.raw
            .lines()
            .any(|line| line.to_ascii_lowercase() == needle)
    }

    /// Body text following the blank line.
    pub(crate) fn body(&self) -> &str {
        self.raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }
}

/// Serves canned responses in order, repeating the final one; records every
/// request it answers.
pub(crate) struct HttpFake {
    pub addr: SocketAddr,
    pub requests: mpsc::UnboundedReceiver<RecordedRequest>,
}

impl HttpFake {
    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) async fn next_request(&mut self) -> RecordedRequest {
        timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for an http request")
            .expect("http fake stopped")
    }
}

pub(crate) async fn spawn_http_fake(responses: Vec<HttpResponse>) -> HttpFake {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (req_tx, requests) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut queue: VecDeque<HttpResponse> = responses.into();
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let raw = read_request(&mut stream).await;
            if req_tx.send(RecordedRequest { raw }).is_err() {
                break;
            }
            let response = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| HttpResponse::json(404, "{}"))
            };
            let _ = stream.write_all(response.render().as_bytes()).await;
            let _ = stream.flush().await;
        }
    });

    HttpFake { addr, requests }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let header_end = pos + 4;
            let head = String::from_utf8_lossy(&buf[..header_end]);
            let needed = content_length(&head);
            while buf.len() < header_end + needed {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0)
}

// ============================================================================
// WebSocket Fakes
// ============================================================================

/// Accepts WebSocket connections, handing each accepted socket to the test
/// and counting accepts. Can be stopped (closing the listener) and later
/// respawned on the same address to simulate an endpoint going away and
/// coming back.
pub(crate) struct WsAcceptor {
    pub url: String,
    pub addr: SocketAddr,
    pub accepted: mpsc::UnboundedReceiver<ServerWs>,
    pub count: Arc<AtomicUsize>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WsAcceptor {
    pub(crate) fn accept_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn next_accepted(&mut self) -> ServerWs {
        timeout(Duration::from_secs(5), self.accepted.recv())
            .await
            .expect("timed out waiting for a websocket accept")
            .expect("acceptor stopped")
    }

    /// Closes the listener; further connection attempts are refused.
    pub(crate) async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

pub(crate) async fn spawn_ws_acceptor() -> WsAcceptor {
    spawn_ws_acceptor_at("127.0.0.1:0".parse().unwrap()).await
}

pub(crate) async fn spawn_ws_acceptor_at(bind: SocketAddr) -> WsAcceptor {
    let listener = TcpListener::bind(bind).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, accepted) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let count = Arc::new(AtomicUsize::new(0));
    let task_count = Arc::clone(&count);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                incoming = listener.accept() => {
                    let Ok((stream, _)) = incoming else { break };
                    if let Ok(ws) = accept_async(stream).await {
                        task_count.fetch_add(1, Ordering::SeqCst);
                        if tx.send(ws).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    WsAcceptor {
        url: format!("ws://{addr}"),
        addr,
        accepted,
        count,
        stop_tx: Some(stop_tx),
        task: Some(task),
    }
}

/// Binds `bind` and accepts a single WebSocket, hanging up as soon as the
/// handshake completes and freeing the port. Callers get a connection that
/// is dead before the first frame crosses it.
pub(crate) async fn spawn_hangup_ws_acceptor_at(bind: SocketAddr) -> JoinHandle<()> {
    let listener = TcpListener::bind(bind).await.unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let _ = accept_async(stream).await;
        }
    })
}

/// A connected client/server WebSocket pair over a loopback socket.
pub(crate) async fn ws_pair() -> (ClientWs, ServerWs) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    });
    let (client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    let server = accept.await.unwrap();
    (client, server)
}

/// Next data or close message, panicking after five seconds.
pub(crate) async fn next_message<S>(ws: &mut S, what: &str) -> Message
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .unwrap_or_else(|| panic!("stream ended waiting for {what}"))
        .unwrap_or_else(|e| panic!("stream error waiting for {what}: {e}"))
}

/// True once the peer observes the end of the stream (close or EOF).
pub(crate) async fn stream_ended<S>(ws: &mut S) -> bool
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match timeout(Duration::from_secs(5), ws.next()).await {
            Ok(None) => return true,
            Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => return true,
            Err(_) => return false,
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `cond` until it holds, panicking after the deadline.
pub(crate) async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting until {what}");
}
