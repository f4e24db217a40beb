use crate::builder::states::{NoBackend, NoConsumer};
use crate::builder::NotificationClientBuilder;
use crate::config::ClientConfig;
use crate::connection_state::{
    AtomicConnectionState, AtomicMetrics, ConnectionDiagnostics, ConnectionState, Diagnostics,
};
use crate::endpoint::notification_url;
use crate::heartbeat::{spawn_heartbeat, PING_PAYLOAD};
use crate::reconnect::ReconnectPolicy;
use crate::router::NotificationRouter;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Close code for intentional disconnects; every other code is abnormal
pub const CLOSE_NORMAL: u16 = 1000;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Internal command messages for driver control
#[derive(Debug)]
enum DriverCommand {
    /// Transmit a serialized payload on the open channel
    Send(String),
    /// Close with the normal code and stop the driver
    Stop,
}

/// Lifecycle events emitted by the client
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Channel opened and ready
    Connected,
    /// Channel went down; the close code observed on the wire, if any
    Disconnected { code: Option<u16> },
    /// A retry attempt is starting (1-based within the current failure chain)
    Reconnecting(usize),
    /// connect() was called but no auth token was available
    AuthMissing,
    /// Retry ceiling hit; the channel stays down until connect() runs again
    ReconnectExhausted { attempts: usize },
    /// Transport-level diagnostic; does not itself change the channel state
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct ClientMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Everything a driver task shares with its owning client
struct DriverShared {
    config: Arc<ClientConfig>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    diagnostics: Arc<ConnectionDiagnostics>,
    consumer: Arc<Mutex<Box<dyn NotificationConsumer>>>,
    event_tx: Sender<ClientEvent>,
    run_flag: Arc<AtomicBool>,
}

/// Handle to the driver task behind one `connect()` call
struct DriverHandle {
    command_tx: mpsc::UnboundedSender<DriverCommand>,
    run_flag: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

/// Real-time notification client
///
/// Owns at most one live transport at a time. A driver task dials the
/// endpoint, feeds inbound frames through the router to the single
/// registered consumer, keeps the channel alive with heartbeats, and retries
/// abnormal closes on a fixed interval up to the attempt ceiling.
///
/// Lifecycle methods take `&mut self`: the owning context is the only place
/// a connection is opened or closed, so exclusive access is enforced at
/// compile time instead of with locks. `send` and the observers take
/// `&self` and are safe to call from anywhere the client is reachable.
pub struct NotificationClient {
    config: Arc<ClientConfig>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    diagnostics: Arc<ConnectionDiagnostics>,
    consumer: Arc<Mutex<Box<dyn NotificationConsumer>>>,
    event_tx: Sender<ClientEvent>,
    event_rx: Receiver<ClientEvent>,
    driver: Option<DriverHandle>,
}

impl NotificationClient {
    /// Create a client from configuration
    ///
    /// Called by the builder's `build()`. Use [`NotificationClient::builder`]
    /// to construct one.
    pub(crate) fn new(config: ClientConfig, consumer: Box<dyn NotificationConsumer>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            config: Arc::new(config),
            state: Arc::new(AtomicConnectionState::new(ConnectionState::Idle)),
            metrics: Arc::new(AtomicMetrics::new()),
            diagnostics: Arc::new(ConnectionDiagnostics::new()),
            consumer: Arc::new(Mutex::new(consumer)),
            event_tx,
            event_rx,
            driver: None,
        }
    }

    pub fn builder() -> NotificationClientBuilder<NoBackend, NoConsumer> {
        NotificationClientBuilder::new()
    }

    /// Open the notification channel
    ///
    /// Any prior driver (a live channel, or one sitting in a retry wait) is
    /// fully stopped first, closing its transport with the normal code; only
    /// then is the new transport created. A silent no-op when no auth token
    /// is available, observable through [`status`](Self::status) staying
    /// down and a [`ClientEvent::AuthMissing`] event.
    ///
    /// # Returns
    /// Whether a new connection chain was launched.
    pub async fn connect(&mut self) -> bool {
        let Some(token) = self.config.token_provider.token().await else {
            debug!("No auth token available, skipping connection");
            let _ = self.event_tx.send(ClientEvent::AuthMissing);
            return false;
        };

        // Close-before-replace: the previous transport must be gone before a
        // new one exists
        self.stop_driver().await;

        self.state.set(ConnectionState::Connecting);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let run_flag = Arc::new(AtomicBool::new(true));
        let shared = DriverShared {
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
            diagnostics: Arc::clone(&self.diagnostics),
            consumer: Arc::clone(&self.consumer),
            event_tx: self.event_tx.clone(),
            run_flag: Arc::clone(&run_flag),
        };

        let task = tokio::spawn(async move {
            run_driver(shared, token, command_rx).await;
        });

        self.driver = Some(DriverHandle {
            command_tx,
            run_flag,
            task,
        });
        true
    }

    /// Close the channel intentionally
    ///
    /// Sends close code 1000, cancels the heartbeat and any scheduled retry,
    /// and waits for the driver to finish. Idempotent: disconnecting an
    /// idle or already-closed client does nothing.
    pub async fn disconnect(&mut self) {
        self.stop_driver().await;
    }

    async fn stop_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.run_flag.store(false, Ordering::Release);
            let _ = driver.command_tx.send(DriverCommand::Stop);
            let _ = driver.task.await;
            // The driver can exit before its first poll, or die mid-serve,
            // without touching the state; a stopped client must read Closed
            self.state.set(ConnectionState::Closed);
        }
    }

    /// Serialize and transmit a message if the channel is open
    ///
    /// Returns whether the message was accepted for transmission. Nothing is
    /// ever queued for later delivery: a message accepted just as the
    /// transport fails is dropped with it.
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        if !self.state.is_open() {
            return false;
        }
        let Some(driver) = self.driver.as_ref() else {
            return false;
        };
        let Ok(text) = serde_json::to_string(message) else {
            return false;
        };
        driver.command_tx.send(DriverCommand::Send(text)).is_ok()
    }

    /// Current connection state
    #[inline]
    pub fn status(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the channel is open right now
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_open()
    }

    /// Snapshot of the most recent failure diagnostics
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.snapshot()
    }

    /// Current metrics
    pub fn metrics(&self) -> ClientMetrics {
        ClientMetrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive a lifecycle event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a lifecycle event (blocking; for plain threads, not tasks)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        // Best-effort teardown; the driver notices promptly and closes with
        // the normal code
        if let Some(driver) = self.driver.take() {
            driver.run_flag.store(false, Ordering::Release);
            let _ = driver.command_tx.send(DriverCommand::Stop);
        }
    }
}

/// Driver task: one connection chain from `connect()` until intentional
/// close, normal peer close, auth loss, or retry exhaustion
async fn run_driver(
    shared: DriverShared,
    first_token: String,
    mut command_rx: mpsc::UnboundedReceiver<DriverCommand>,
) {
    let mut policy = ReconnectPolicy::new(
        shared.config.reconnect_interval,
        shared.config.max_reconnect_attempts,
    );
    let mut next_token = Some(first_token);

    loop {
        if !shared.run_flag.load(Ordering::Acquire) {
            break;
        }

        // Credentials are re-resolved for every attempt, never cached; a
        // token that disappears mid-chain ends the chain
        let token = match next_token.take() {
            Some(token) => token,
            None => match shared.config.token_provider.token().await {
                Some(token) => token,
                None => {
                    debug!("Auth token no longer available, abandoning reconnection");
                    shared.diagnostics.record_error("auth token unavailable");
                    let _ = shared.event_tx.send(ClientEvent::AuthMissing);
                    break;
                }
            },
        };

        let url = notification_url(
            &shared.config.backend_url,
            &token,
            shared.config.scan_id.as_deref(),
        );

        shared.state.set(ConnectionState::Connecting);
        if policy.attempts() > 0 {
            let _ = shared
                .event_tx
                .send(ClientEvent::Reconnecting(policy.attempts()));
            shared.metrics.increment_reconnects();
        }

        // Dial while staying responsive to a stop arriving mid-handshake
        let dial = connect_async(url);
        tokio::pin!(dial);
        let handshake = loop {
            tokio::select! {
                result = &mut dial => break Some(result),
                cmd = command_rx.recv() => match cmd {
                    Some(DriverCommand::Send(_)) => {
                        debug!("Dropping outbound message, channel not open yet");
                    }
                    Some(DriverCommand::Stop) | None => break None,
                }
            }
        };
        let was_open = matches!(handshake, Some(Ok(_)));

        let outcome = match handshake {
            None => {
                // Stopped while dialing; nothing was opened
                shared.state.set(ConnectionState::Closed);
                break;
            }
            Some(Ok((ws_stream, _response))) => {
                policy.mark_open();
                shared.diagnostics.clear();
                shared.state.set(ConnectionState::Open);
                let _ = shared.event_tx.send(ClientEvent::Connected);
                info!("Notification channel open");
                serve_connection(ws_stream, &shared, &mut command_rx).await
            }
            Some(Err(e)) => {
                // A failed handshake counts as an abnormal close
                warn!("Handshake failed: {}", e);
                shared.diagnostics.record_error(e.to_string());
                let _ = shared.event_tx.send(ClientEvent::Error(e.to_string()));
                CloseOutcome::Remote(None)
            }
        };

        shared.state.set(ConnectionState::Closed);

        match outcome {
            CloseOutcome::Intentional => {
                policy.reset();
                let _ = shared.event_tx.send(ClientEvent::Disconnected {
                    code: Some(CLOSE_NORMAL),
                });
                break;
            }
            CloseOutcome::Remote(code) => {
                if let Some(code) = code {
                    shared.diagnostics.record_close_code(code);
                }
                if was_open {
                    let _ = shared.event_tx.send(ClientEvent::Disconnected { code });
                }

                if code == Some(CLOSE_NORMAL) {
                    // The peer closed intentionally; stay down without a retry
                    debug!("Peer closed with normal code, not reconnecting");
                    break;
                }

                match policy.on_abnormal_close() {
                    Some(delay) => {
                        info!(
                            "Reconnecting in {:?} (attempt {}/{})",
                            delay,
                            policy.attempts(),
                            shared.config.max_reconnect_attempts
                        );
                        if !wait_for_retry(delay, &mut command_rx, &shared.run_flag).await {
                            debug!("Stop requested during retry wait");
                            policy.reset();
                            break;
                        }
                    }
                    None => {
                        let attempts = policy.attempts();
                        error!("Giving up after {} reconnection attempts", attempts);
                        shared
                            .diagnostics
                            .record_error(NotifyError::ReconnectExhausted { attempts }.to_string());
                        let _ = shared
                            .event_tx
                            .send(ClientEvent::ReconnectExhausted { attempts });
                        break;
                    }
                }
            }
        }
    }

    debug!("Connection driver exiting");
}

/// How one served connection ended
enum CloseOutcome {
    /// We sent the close frame with the normal code
    Intentional,
    /// Close frame or stream end from the peer; the code, if one arrived
    Remote(Option<u16>),
}

/// Serve one open connection until it closes
async fn serve_connection(
    ws_stream: WsStream,
    shared: &DriverShared,
    command_rx: &mut mpsc::UnboundedReceiver<DriverCommand>,
) -> CloseOutcome {
    let (mut write, mut read) = ws_stream.split();

    let (_hb_handle, hb_stop, mut heartbeat_rx) =
        spawn_heartbeat(shared.config.heartbeat_interval, PING_PAYLOAD.to_string());

    let outcome = loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    shared.metrics.increment_received();
                    let mut consumer = shared.consumer.lock();
                    NotificationRouter::route(&text, consumer.as_mut());
                }
                Some(Ok(Message::Binary(_))) => {
                    shared.metrics.increment_received();
                    warn!("Dropping binary frame, notification channel is JSON text only");
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    debug!("Peer closed the channel (code {:?})", code);
                    break CloseOutcome::Remote(code);
                }
                Some(Ok(_)) => {
                    // Protocol-level ping/pong frames are answered by the
                    // transport itself
                }
                Some(Err(e)) => {
                    warn!("Transport error: {}", e);
                    shared.diagnostics.record_error(e.to_string());
                    let _ = shared.event_tx.send(ClientEvent::Error(e.to_string()));
                    break CloseOutcome::Remote(None);
                }
                None => {
                    debug!("Stream ended without a close frame");
                    break CloseOutcome::Remote(None);
                }
            },

            Some(payload) = heartbeat_rx.recv() => {
                if let Err(e) = write.send(Message::Text(payload)).await {
                    shared.diagnostics.record_error(e.to_string());
                    break CloseOutcome::Remote(None);
                }
                shared.metrics.increment_sent();
            }

            cmd = command_rx.recv() => match cmd {
                Some(DriverCommand::Send(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        shared.diagnostics.record_error(e.to_string());
                        break CloseOutcome::Remote(None);
                    }
                    shared.metrics.increment_sent();
                }
                Some(DriverCommand::Stop) | None => {
                    shared.state.set(ConnectionState::Closing);
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    break CloseOutcome::Intentional;
                }
            }
        }
    };

    // The heartbeat stops on every exit from the open state
    let _ = hb_stop.send(());
    outcome
}

/// Wait out the reconnect delay
///
/// Returns false if a stop request arrived during the wait, in which case
/// the scheduled attempt is cancelled.
async fn wait_for_retry(
    delay: Duration,
    command_rx: &mut mpsc::UnboundedReceiver<DriverCommand>,
    run_flag: &AtomicBool,
) -> bool {
    if !run_flag.load(Ordering::Acquire) {
        return false;
    }

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = command_rx.recv() => match cmd {
                Some(DriverCommand::Send(_)) => {
                    debug!("Dropping outbound message, channel is down");
                }
                Some(DriverCommand::Stop) | None => return false,
            }
        }
    }
}
