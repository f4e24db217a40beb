use crate::error::{NotifyError, Result};
use serde_json::Value;

/// Single consumer for application notifications
///
/// The router invokes `deliver` synchronously from the connection's driver
/// task, once per forwarded payload, in the order frames arrived. Control
/// frames (`pong`, `connected`) never reach the consumer. A consumer survives
/// reconnections: the same instance keeps receiving after the channel is
/// re-established.
///
/// # Errors
/// A `deliver` error is logged and the connection stays up; one misbehaving
/// consumer must not take the channel down.
pub trait NotificationConsumer: Send + 'static {
    fn deliver(&mut self, notification: Value) -> Result<()>;
}

impl<F> NotificationConsumer for F
where
    F: FnMut(Value) + Send + 'static,
{
    fn deliver(&mut self, notification: Value) -> Result<()> {
        self(notification);
        Ok(())
    }
}

/// Consumer that discards every notification
pub struct NullConsumer;

impl NotificationConsumer for NullConsumer {
    fn deliver(&mut self, _notification: Value) -> Result<()> {
        Ok(())
    }
}

/// Consumer that forwards notifications into a crossbeam channel
///
/// Useful when the receiving side lives on a plain thread or wants to poll
/// with `try_recv` from its own loop.
pub struct ChannelConsumer {
    tx: crossbeam_channel::Sender<Value>,
}

impl ChannelConsumer {
    pub fn new(tx: crossbeam_channel::Sender<Value>) -> Self {
        Self { tx }
    }

    /// Create a consumer together with the receiving end of its channel
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<Value>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl NotificationConsumer for ChannelConsumer {
    fn deliver(&mut self, notification: Value) -> Result<()> {
        self.tx
            .send(notification)
            .map_err(|e| NotifyError::ChannelSend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn closure_consumer_receives_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut consumer = move |n: Value| sink.lock().push(n);
        consumer
            .deliver(json!({"type": "scan_progress", "progress": 10}))
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["progress"], 10);
    }

    #[test]
    fn channel_consumer_forwards_and_reports_closure() {
        let (mut consumer, rx) = ChannelConsumer::unbounded();
        consumer.deliver(json!({"type": "x"})).unwrap();
        assert_eq!(rx.try_recv().unwrap()["type"], "x");

        drop(rx);
        let err = consumer.deliver(json!({"type": "y"})).unwrap_err();
        assert!(matches!(err, NotifyError::ChannelSend(_)));
    }
}
