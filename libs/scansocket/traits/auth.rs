use async_trait::async_trait;
use std::sync::Arc;

/// Trait for supplying the auth token embedded in the notification endpoint
///
/// The provider is consulted on every connection attempt, including each
/// automatic reconnection, so tokens that rotate between attempts are always
/// picked up fresh rather than cached from the first connect.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Resolve the current auth token
    ///
    /// # Returns
    /// * `Some(token)` - Embed this token in the endpoint query string
    /// * `None` - No credential available; the client must not open a
    ///   connection and treats the call as a silent no-op
    async fn token(&self) -> Option<String>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn token(&self) -> Option<String> {
        (**self).token().await
    }
}

/// A provider that always returns the same token
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// A provider that reads the token from an environment variable on every call
///
/// Empty values count as absent, so unsetting or blanking the variable between
/// attempts ends a reconnection chain the same way a missing token does.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|t| !t.is_empty())
    }
}

/// A provider with no credential; connect attempts become silent no-ops
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn token(&self) -> Option<String> {
        None
    }
}
