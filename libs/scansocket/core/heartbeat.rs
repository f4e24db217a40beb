//! Heartbeat keep-alive for the notification channel
//!
//! # Architecture
//!
//! The heartbeat runs in a dedicated Tokio task for the lifetime of one open
//! connection:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. Send payload ───┼──> Channel ──> Driver select loop ──> WebSocket
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The task only produces payloads; the driver owns the socket and performs
//! the actual write. There is no pong deadline: a missing acknowledgment is
//! not treated as failure, liveness is inferred solely from transport-level
//! close events. The task stops when the driver drops the payload receiver
//! or fires the stop signal, which happens on every exit from the open
//! state.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Keep-alive payload expected by the backend
pub const PING_PAYLOAD: &str = r#"{"type":"ping"}"#;

/// Heartbeat task body
///
/// Skips the immediate first tick, so the first payload goes out one full
/// interval after the connection opens. Missed ticks are skipped rather than
/// bursted.
///
/// # Arguments
/// * `interval` - Duration between heartbeat payloads
/// * `payload` - The message produced on each tick
/// * `heartbeat_tx` - Channel draining into the driver's select loop
/// * `stop_rx` - One-shot stop signal
pub async fn heartbeat_task(
    interval: Duration,
    payload: String,
    heartbeat_tx: mpsc::UnboundedSender<String>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!("Heartbeat task received stop signal");
                break;
            }
            _ = ticker.tick() => {
                if heartbeat_tx.send(payload.clone()).is_err() {
                    debug!("Heartbeat channel closed, stopping heartbeat task");
                    break;
                }
            }
        }
    }

    debug!("Heartbeat task exiting");
}

/// Spawn a heartbeat task
///
/// Returns the task handle, the stop signal sender, and the payload receiver
/// for the driver to drain.
pub fn spawn_heartbeat(
    interval: Duration,
    payload: String,
) -> (
    tokio::task::JoinHandle<()>,
    oneshot::Sender<()>,
    mpsc::UnboundedReceiver<String>,
) {
    let (stop_tx, stop_rx) = oneshot::channel();
    let (heartbeat_tx, heartbeat_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        heartbeat_task(interval, payload, heartbeat_tx, stop_rx).await;
    });

    (handle, stop_tx, heartbeat_rx)
}
