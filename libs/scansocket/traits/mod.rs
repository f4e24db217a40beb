//! # Scansocket Traits
//!
//! Core traits and types for the scansocket notification client.
//!
//! These are the seams an application plugs into:
//!
//! - **TokenProvider**: Resolve the auth credential for each connection attempt
//! - **NotificationConsumer**: Receive forwarded application notifications
//! - **NotifyError**: Error taxonomy shared across the crate
//!
//! ## Example
//!
//! ```rust,ignore
//! use scansocket::*;
//!
//! // Tokens are re-resolved on every attempt, so rotation just works
//! struct SessionToken;
//!
//! #[async_trait]
//! impl TokenProvider for SessionToken {
//!     async fn token(&self) -> Option<String> {
//!         read_session_cookie("auth_token")
//!     }
//! }
//! ```

pub mod auth;
pub mod consumer;
pub mod error;

// Re-export commonly used types
pub use auth::{EnvToken, NoToken, StaticToken, TokenProvider};
pub use consumer::{ChannelConsumer, NotificationConsumer, NullConsumer};
pub use error::{NotifyError, Result};
