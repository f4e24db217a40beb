//! Reconnection policy
//!
//! Fixed-interval retry with a hard attempt ceiling. The counter resets on
//! every successful open and on explicit disconnect; once exhausted, the
//! channel stays down until the owning context connects again.

use std::time::Duration;

/// Retry bookkeeping state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No retry pending
    Idle,
    /// A retry timer is armed (or its attempt is in flight)
    Scheduled,
    /// The attempt ceiling was hit; no further automatic retries
    Exhausted,
}

/// Decides whether and when to re-open after an abnormal close
///
/// An abnormal close is any close whose code is not the intentional code
/// 1000, including stream end without a close frame and failed handshakes.
/// Intentional closes never consult this policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    interval: Duration,
    max_attempts: usize,
    attempts: usize,
    state: RetryState,
}

impl ReconnectPolicy {
    /// Create a policy with a fixed delay and attempt ceiling
    ///
    /// # Arguments
    /// * `interval` - Fixed wait between attempts (not exponential)
    /// * `max_attempts` - Retries allowed before giving up
    pub fn new(interval: Duration, max_attempts: usize) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            state: RetryState::Idle,
        }
    }

    /// Consecutive failed attempts since the last successful open
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record an abnormal close
    ///
    /// # Returns
    /// * `Some(delay)` - Wait this long, then attempt to reconnect; the
    ///   attempt counter has been incremented
    /// * `None` - Ceiling reached, policy is now [`RetryState::Exhausted`]
    pub fn on_abnormal_close(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            self.state = RetryState::Exhausted;
            return None;
        }
        self.attempts += 1;
        self.state = RetryState::Scheduled;
        Some(self.interval)
    }

    /// Record a successful open; the counter starts over
    pub fn mark_open(&mut self) {
        self.attempts = 0;
        self.state = RetryState::Idle;
    }

    /// Explicit disconnect; any scheduled retry is considered cancelled
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.state = RetryState::Idle;
    }
}
