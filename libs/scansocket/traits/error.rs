use thiserror::Error;

/// Main error type for scansocket
#[derive(Error, Debug)]
pub enum NotifyError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// No auth token available for the connection attempt
    #[error("Auth token unavailable")]
    MissingAuthToken,

    /// Inbound frame could not be parsed as JSON
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reconnection gave up after hitting the attempt ceiling
    #[error("Reconnection abandoned after {attempts} attempts")]
    ReconnectExhausted { attempts: usize },
}

/// Result type for scansocket operations
pub type Result<T> = std::result::Result<T, NotifyError>;
