//! # ScanSocket
//!
//! Real-time notification client for the vulnscope dashboard backend.
//!
//! ## Features
//!
//! - **Lock-free status**: atomic connection state and counters readable
//!   from any thread while the driver task owns the transport
//! - **Type-state builder**: backend URL and consumer required at compile
//!   time
//! - **Single consumer, in order**: application notifications delivered
//!   exactly once, synchronously, in arrival order; control frames consumed
//!   internally
//! - **Fixed-interval reconnection**: abnormal closes retry every 3 s up to
//!   5 attempts; intentional closes (code 1000) never retry
//! - **Scan affinity**: at most one scoped socket per background job, with
//!   in-band completion detection
//!
//! ## Example
//!
//! ```rust,ignore
//! use scansocket::{EnvToken, NotificationClient};
//!
//! let mut client = NotificationClient::builder()
//!     .backend_url("https://dashboard.example.com")
//!     .consumer(|notification| println!("{notification}"))
//!     .token_provider(EnvToken::new("AUTH_TOKEN"))
//!     .build();
//!
//! client.connect().await;
//! // the consumer runs on the driver task as frames arrive
//! client.disconnect().await;
//! ```

pub mod core;
pub mod scan;
pub mod traits;
pub mod util;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, endpoint, heartbeat, reconnect, router,
    builder::{states, NotificationClientBuilder},
    client::{ClientEvent, ClientMetrics, NotificationClient, CLOSE_NORMAL},
    config::{
        ClientConfig, DEFAULT_BACKEND_URL, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS,
        RECONNECT_INTERVAL,
    },
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Diagnostics},
    endpoint::{notification_url, NOTIFICATIONS_PATH},
    heartbeat::PING_PAYLOAD,
    reconnect::{ReconnectPolicy, RetryState},
    router::{Inbound, NotificationRouter},
};

// Re-export scan affinity
pub use scan::{CompletionWatcher, ScanAffinityController, ScanOutcome};

// Re-export runtime helpers
pub use util::{init_tracing, ShutdownManager};

// Convenience function
pub use self::core::builder as client_builder;

/// Type alias for Result with NotifyError
pub type Result<T> = std::result::Result<T, traits::NotifyError>;
