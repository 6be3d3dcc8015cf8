//! Retry with exponential backoff for chat completion calls

use std::time::Duration;

/// Retry policy for chat completion requests
///
/// Controls how many times a failed request is attempted and how long to
/// wait between attempts using exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Compute the delay inserted before attempt `attempt` (zero-based)
    ///
    /// Attempt 0 runs immediately; attempt k (k >= 1) waits
    /// `initial_delay * 2^(k-1)`, capped at `max_delay`. With the defaults
    /// this gives the 1s, 2s, 4s schedule.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt - 1));

        delay.min(self.max_delay)
    }

    /// Upper bound on time spent sleeping across a full retry cycle
    ///
    /// Together with the per-attempt request timeout this bounds how long
    /// a query can stay unanswered before a terminal error is forced.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts)
            .map(|attempt| self.delay_before(attempt))
            .sum()
    }
}
