//! Linear reconnect backoff.

use std::time::Duration;

/// Delay unit between reconnect attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Attempts before the client gives up for good.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Bounded linear backoff: attempt `n` waits `base × n`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS)
    }
}

impl ReconnectPolicy {
    /// Create a policy with the given base delay and attempt budget.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempts: 0,
        }
    }

    /// Register a failure and get the delay before the next attempt.
    ///
    /// Returns `None` once the budget is spent; the counter stays at the
    /// maximum so later failures keep returning `None`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }

    /// Called after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the budget is spent.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
