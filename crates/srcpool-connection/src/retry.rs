//! Retry policy for checkouts that hit a dead backend session
//!
//! Used by [`SourceRegistry::with_connection`](crate::SourceRegistry::with_connection):
//! when the work closure fails because the session was lost, the resource is
//! disconnected and returned, and a fresh checkout is attempted after the
//! policy's delay.

use std::time::Duration;

/// How many times to attempt a unit of work and how long to wait in between.
///
/// Delays grow exponentially from `initial_ms`, capped at `max_ms`. The
/// default makes two attempts with no delay.
///
/// # Example
///
/// ```
/// use srcpool_connection::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(4).with_backoff(100, 1_000);
///
/// assert_eq!(policy.delay(0), Duration::from_millis(100));
/// assert_eq!(policy.delay(1), Duration::from_millis(200));
/// assert_eq!(policy.delay(10), Duration::from_millis(1_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    max_attempts: u32,
    /// Delay before the first retry in milliseconds
    initial_ms: u64,
    /// Maximum delay in milliseconds
    max_ms: u64,
    /// Multiplier for exponential growth
    multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy making `max_attempts` attempts (at least one) with no delay
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_ms: 0,
            max_ms: 0,
            multiplier: 2.0,
        }
    }

    /// A single attempt, never retried
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Wait `initial_ms` before the first retry, growing up to `max_ms`
    pub fn with_backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_ms = initial_ms;
        self.max_ms = max_ms.max(initial_ms);
        self
    }

    /// Set the multiplier for exponential growth (at least 1.0)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (0 = first retry)
    pub fn delay(&self, retry: u32) -> Duration {
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(retry as i32);
        Duration::from_millis(delay_ms.min(self.max_ms as f64) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}
