pub mod states;

use crate::client::NotificationClient;
use crate::config::{
    ClientConfig, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL,
};
use crate::traits::{NoToken, NotificationConsumer, TokenProvider};
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`NotificationClient`]
///
/// The backend URL and the notification consumer are required and enforced
/// by the type system; everything else has working defaults. Without a token
/// provider the client defaults to [`NoToken`], which makes every `connect`
/// a silent no-op, matching a user who is not logged in.
pub struct NotificationClientBuilder<B, C>
where
    B: BackendState,
    C: ConsumerState,
{
    _state: TypeState<B, C>,
    backend_url: Option<String>,
    consumer: Option<Box<dyn NotificationConsumer>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    scan_id: Option<String>,
    heartbeat_interval: Duration,
    reconnect_interval: Duration,
    max_reconnect_attempts: usize,
}

impl NotificationClientBuilder<NoBackend, NoConsumer> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            backend_url: None,
            consumer: None,
            token_provider: None,
            scan_id: None,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            reconnect_interval: RECONNECT_INTERVAL,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl Default for NotificationClientBuilder<NoBackend, NoConsumer> {
    fn default() -> Self {
        Self::new()
    }
}

// Backend URL setting
impl<C> NotificationClientBuilder<NoBackend, C>
where
    C: ConsumerState,
{
    pub fn backend_url(
        self,
        url: impl Into<String>,
    ) -> NotificationClientBuilder<HasBackend, C> {
        NotificationClientBuilder {
            _state: TypeState::new(),
            backend_url: Some(url.into()),
            consumer: self.consumer,
            token_provider: self.token_provider,
            scan_id: self.scan_id,
            heartbeat_interval: self.heartbeat_interval,
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

// Consumer setting
impl<B> NotificationClientBuilder<B, NoConsumer>
where
    B: BackendState,
{
    pub fn consumer(
        self,
        consumer: impl NotificationConsumer,
    ) -> NotificationClientBuilder<B, HasConsumer> {
        NotificationClientBuilder {
            _state: TypeState::new(),
            backend_url: self.backend_url,
            consumer: Some(Box::new(consumer)),
            token_provider: self.token_provider,
            scan_id: self.scan_id,
            heartbeat_interval: self.heartbeat_interval,
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

// Optional configuration methods
impl<B, C> NotificationClientBuilder<B, C>
where
    B: BackendState,
    C: ConsumerState,
{
    /// Set the credential source consulted on every connection attempt
    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Scope this client to one background job
    ///
    /// The job id rides in the endpoint query string as `scan_id`.
    pub fn scan_id(mut self, id: impl Into<String>) -> Self {
        self.scan_id = Some(id.into());
        self
    }

    /// Override the keep-alive cadence (default 30s)
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Override the fixed reconnect delay (default 3s)
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Override the retry ceiling (default 5)
    pub fn max_reconnect_attempts(mut self, max: usize) -> Self {
        self.max_reconnect_attempts = max;
        self
    }
}

// Build method - only available when all required fields are set
impl NotificationClientBuilder<HasBackend, HasConsumer> {
    pub fn build(self) -> NotificationClient {
        let config = ClientConfig {
            backend_url: self.backend_url.expect("backend URL must be set"),
            token_provider: self
                .token_provider
                .unwrap_or_else(|| Arc::new(NoToken)),
            scan_id: self.scan_id,
            heartbeat_interval: self.heartbeat_interval,
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
        };

        NotificationClient::new(config, self.consumer.expect("consumer must be set"))
    }
}
