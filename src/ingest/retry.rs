use std::time::Duration;

/// Bounded exponential-backoff policy for page fetches. The decision logic
/// lives in the ingestion loop; the transport call stays a plain fetch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows the given zero-based attempt:
    /// `base_delay * backoff_factor^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * self.backoff_factor.saturating_pow(attempt)
    }
}
