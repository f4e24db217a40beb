//! Inbound frame classification and dispatch
//!
//! Every text frame is parsed as JSON and classified by its `type` field.
//! `pong` and `connected` are control traffic and are consumed here; every
//! other payload is handed to the registered consumer exactly once, from the
//! driver task, in receipt order. A frame that fails to parse is logged and
//! dropped; routing never errors out to the connection.

use crate::traits::{NotificationConsumer, NotifyError, Result};
use serde_json::Value;
use tracing::{debug, error, warn};

/// Classification of one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `{"type":"pong"}`, heartbeat acknowledgment
    Pong,
    /// `{"type":"connected"}`, server confirmed the channel
    Ready,
    /// Anything else, forwarded to the consumer verbatim
    Notification(Value),
}

/// Stateless router for the notification wire format
pub struct NotificationRouter;

impl NotificationRouter {
    /// Parse and classify a raw text frame
    ///
    /// Payloads that parse but carry no recognized control `type` (including
    /// non-object JSON) are notifications; the consumer decides what they
    /// mean.
    pub fn classify(text: &str) -> Result<Inbound> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| NotifyError::Malformed(e.to_string()))?;

        match value.get("type").and_then(Value::as_str) {
            Some("pong") => Ok(Inbound::Pong),
            Some("connected") => Ok(Inbound::Ready),
            _ => Ok(Inbound::Notification(value)),
        }
    }

    /// Route a raw frame to its destination
    ///
    /// Malformed frames and consumer errors are contained here; the caller
    /// keeps the connection open either way.
    pub fn route(text: &str, consumer: &mut dyn NotificationConsumer) {
        match Self::classify(text) {
            Ok(Inbound::Pong) => debug!("Heartbeat acknowledged"),
            Ok(Inbound::Ready) => debug!("Server confirmed notification channel"),
            Ok(Inbound::Notification(value)) => {
                if let Err(e) = consumer.deliver(value) {
                    error!("Notification consumer error: {}", e);
                }
            }
            Err(e) => warn!("Dropping inbound frame: {}", e),
        }
    }
}
