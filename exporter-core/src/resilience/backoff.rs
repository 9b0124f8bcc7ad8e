//! Fixed retry backoff
//!
//! Every retry waits the same interval: no jitter, no growth. The attempt
//! counter only feeds log lines.

use std::time::Duration;

use crate::config::constants::DEFAULT_RETRY_DELAY;

/// Fixed-interval retry schedule
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
    attempt: u64,
}

impl FixedBackoff {
    /// Create a backoff with the given delay
    pub fn new(delay: Duration) -> Self {
        Self { delay, attempt: 0 }
    }

    /// Get the next delay duration and advance the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        self.delay
    }

    /// Reset after a session was established
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Retries since the last established session
    pub fn attempt_number(&self) -> u64 {
        self.attempt
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}
