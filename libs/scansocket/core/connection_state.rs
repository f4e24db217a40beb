//! Connection state machine and lock-free counters
//!
//! The state lives in an atomic so the driver task mutates it while the
//! owning context reads `status()` without locking. Transitions are plain
//! stores; the driver is the only writer while it is alive, and the client
//! facade only writes between drivers.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a single notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Never connected
    Idle = 0,
    /// Handshake in flight
    Connecting = 1,
    /// Channel established, heartbeat running
    Open = 2,
    /// Intentional close in progress
    Closing = 3,
    /// Channel down; a retry may still be pending
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic wrapper around [`ConnectionState`]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }
}

/// Lock-free counters maintained by the driver task
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            reconnect_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic snapshot of the most recent failure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Close code observed on the wire, if the peer sent one
    pub last_close_code: Option<u16>,
    /// Last transport or handshake error message
    pub last_error: Option<String>,
}

/// Shared failure diagnostics, cleared on every successful open
///
/// Close codes are stored in an atomic with 0 as the "none" sentinel; 0 is
/// not a valid wire code.
pub struct ConnectionDiagnostics {
    last_close_code: AtomicU32,
    last_error: RwLock<Option<String>>,
}

impl ConnectionDiagnostics {
    pub fn new() -> Self {
        Self {
            last_close_code: AtomicU32::new(0),
            last_error: RwLock::new(None),
        }
    }

    pub fn record_close_code(&self, code: u16) {
        self.last_close_code.store(code as u32, Ordering::Release);
    }

    pub fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    pub fn clear(&self) {
        self.last_close_code.store(0, Ordering::Release);
        *self.last_error.write() = None;
    }

    pub fn snapshot(&self) -> Diagnostics {
        let code = self.last_close_code.load(Ordering::Acquire);
        Diagnostics {
            last_close_code: if code == 0 { None } else { Some(code as u16) },
            last_error: self.last_error.read().clone(),
        }
    }
}

impl Default for ConnectionDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}
