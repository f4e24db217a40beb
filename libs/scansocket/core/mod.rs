//! Core client machinery
//!
//! - **Lock-free status**: atomic connection state and counters, readable
//!   from any thread without blocking the driver
//! - **Type-state builder**: backend URL and consumer are required at
//!   compile time
//! - **Single driver task**: one transport per client, close-before-replace
//! - **Fixed-interval reconnection**: abnormal closes retry on a flat delay
//!   up to a hard ceiling; intentional closes never retry

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod endpoint;
pub mod heartbeat;
pub mod reconnect;
pub mod router;

// Re-export main types
pub use builder::{states, NotificationClientBuilder};
pub use client::{ClientEvent, ClientMetrics, NotificationClient, CLOSE_NORMAL};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Diagnostics};
pub use endpoint::{notification_url, NOTIFICATIONS_PATH};
pub use heartbeat::PING_PAYLOAD;
pub use reconnect::{ReconnectPolicy, RetryState};
pub use router::{Inbound, NotificationRouter};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new notification client builder
///
/// Convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = scansocket::builder()
///     .backend_url("https://dashboard.example.com")
///     .consumer(|notification| println!("{}", notification))
///     .token_provider(EnvToken::new("AUTH_TOKEN"))
///     .build();
/// ```
pub fn builder() -> NotificationClientBuilder<states::NoBackend, states::NoConsumer> {
    NotificationClientBuilder::new()
}
