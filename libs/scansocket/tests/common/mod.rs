//! Common test utilities for scansocket integration tests
//!
//! Provides a scriptable mock notification backend plus polling helpers.

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use scansocket::{ClientEvent, NotificationClient};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How the mock server treats accepted connections
#[derive(Debug, Clone, Copy)]
pub enum CloseBehavior {
    /// Keep connections open until the server shuts down
    Hold,
    /// Complete the handshake, then close with the given code
    CloseAfterAccept(u16),
    /// Complete the handshake, then drop TCP without a close frame
    DropAfterAccept,
    /// Drop the first n connections right after the handshake, hold the rest
    DropFirst(usize),
}

struct ServerState {
    behavior: CloseBehavior,
    uris: Mutex<Vec<String>>,
    received: Mutex<Vec<String>>,
    close_codes: Mutex<Vec<Option<u16>>>,
    connections: AtomicUsize,
    push_tx: broadcast::Sender<String>,
}

/// Mock notification backend
///
/// Accepts WebSocket connections on `/ws/notifications`, records the
/// request URI and every text frame, answers heartbeat pings with pongs,
/// sends the connection-confirmed control frame on open, and relays pushed
/// notifications to all live connections.
pub struct MockNotifyServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    state: Arc<ServerState>,
}

impl MockNotifyServer {
    pub async fn start() -> Self {
        Self::start_with(CloseBehavior::Hold).await
    }

    pub async fn start_with(behavior: CloseBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener, behavior)
    }

    /// Bind a specific address, for tests that bring the backend back up on
    /// a port a client already knows
    #[allow(dead_code)]
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        Self::serve(listener, CloseBehavior::Hold)
    }

    fn serve(listener: TcpListener, behavior: CloseBehavior) -> Self {
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (push_tx, _) = broadcast::channel(64);
        let state = Arc::new(ServerState {
            behavior,
            uris: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            close_codes: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            push_tx,
        });

        let shutdown_clone = shutdown.clone();
        let state_clone = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = state_clone.clone();
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, state, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            state,
        }
    }

    async fn handle_connection(stream: TcpStream, state: Arc<ServerState>, shutdown: Arc<Notify>) {
        let mut uri = String::new();
        let callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
            uri = req.uri().to_string();
            Ok(response)
        };
        let ws_stream = match accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };
        state.uris.lock().push(uri);
        let connection_number = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = state.behavior;

        let (mut write, mut read) = ws_stream.split();
        // Subscribe before the first await so a push sent right after the
        // client observes Open cannot be missed
        let mut push_rx = state.push_tx.subscribe();

        match behavior {
            CloseBehavior::CloseAfterAccept(code) => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                // Drain until the peer echoes the close so the frame flushes
                while let Some(msg) = read.next().await {
                    if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                        break;
                    }
                }
                return;
            }
            CloseBehavior::DropAfterAccept => {
                // Dropping both halves kills TCP with no close frame
                return;
            }
            CloseBehavior::DropFirst(n) if connection_number <= n => {
                return;
            }
            _ => {}
        }

        // The real backend confirms the connection in-band
        if write
            .send(Message::Text(r#"{"type":"connected"}"#.to_string()))
            .await
            .is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            state.received.lock().push(text.clone());
                            if text.contains("\"ping\"") {
                                let pong = Message::Text(r#"{"type":"pong"}"#.to_string());
                                if write.send(pong).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            state
                                .close_codes
                                .lock()
                                .push(frame.as_ref().map(|f| u16::from(f.code)));
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                push = push_rx.recv() => {
                    if let Ok(text) = push {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Backend base URL; the client derives the ws scheme from it
    pub fn backend_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push a notification to every live connection
    pub fn push(&self, text: &str) {
        let _ = self.state.push_tx.send(text.to_string());
    }

    /// Number of completed handshakes so far
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Request URIs in handshake order
    pub fn uris(&self) -> Vec<String> {
        self.state.uris.lock().clone()
    }

    /// Text frames received from clients, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    /// Close codes clients closed with, in arrival order
    pub fn close_codes(&self) -> Vec<Option<u16>> {
        self.state.close_codes.lock().clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockNotifyServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll the client's event channel until a matching event arrives
#[allow(dead_code)]
pub async fn wait_for_event<F>(
    client: &NotificationClient,
    timeout: Duration,
    mut predicate: F,
) -> Option<ClientEvent>
where
    F: FnMut(&ClientEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        while let Some(event) = client.try_recv_event() {
            if predicate(&event) {
                return Some(event);
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

/// Poll until the condition holds; false on timeout
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
