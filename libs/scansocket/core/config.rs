use crate::traits::TokenProvider;
use std::sync::Arc;
use std::time::Duration;

/// Default backend base URL when none is configured in the environment
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Keep-alive cadence while a connection is open
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Fixed wait between reconnection attempts
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(3_000);

/// Reconnection attempts allowed before giving up
pub const MAX_RECONNECT_ATTEMPTS: usize = 5;

/// Configuration for a [`NotificationClient`](crate::client::NotificationClient)
///
/// Built through the type-state builder; holds everything a driver task
/// needs to dial and maintain the channel. The token provider is consulted
/// per attempt, never cached.
pub struct ClientConfig {
    /// Backend base URL (http/https); the ws scheme is derived from it
    pub(crate) backend_url: String,

    /// Credential source, re-resolved on every connection attempt
    pub(crate) token_provider: Arc<dyn TokenProvider>,

    /// Optional job scope appended to the endpoint query string
    pub(crate) scan_id: Option<String>,

    /// Keep-alive cadence
    pub(crate) heartbeat_interval: Duration,

    /// Fixed delay between reconnection attempts
    pub(crate) reconnect_interval: Duration,

    /// Retry ceiling per failure chain
    pub(crate) max_reconnect_attempts: usize,
}

impl ClientConfig {
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.scan_id.as_deref()
    }

    /// Whether this client is scoped to a single background job
    pub fn is_scan_scoped(&self) -> bool {
        self.scan_id.is_some()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    pub fn max_reconnect_attempts(&self) -> usize {
        self.max_reconnect_attempts
    }
}
