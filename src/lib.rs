//! Vulnscope real-time client library
//!
//! Re-exports the workspace members so binaries and downstream code can
//! depend on a single crate.
//!
//! - **scansocket**: WebSocket notification client for the dashboard backend

// Re-export workspace libraries for convenience
pub use scansocket;
