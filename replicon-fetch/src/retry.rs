//! Retry strategy for connection-level failures.

use std::time::Duration;

use replicon_core::RetryConfig;

use crate::error::HttpError;

/// Strategy for retrying failed requests.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Whether to use exponential backoff.
    pub exponential_backoff: bool,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl RetryStrategy {
    /// Creates a strategy with `max_attempts` and the default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::from(&RetryConfig::default())
        }
    }

    /// Retries immediately, without any delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::from(&RetryConfig::immediate(max_attempts))
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Calculates the delay after a failed `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }

    /// Determines if a failed attempt should be retried.
    pub fn should_retry(&self, error: &HttpError) -> bool {
        error.is_retryable()
    }
}

impl From<&RetryConfig> for RetryStrategy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.delay(),
            exponential_backoff: config.exponential_backoff,
            max_delay: config.max_delay(),
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_by_default() {
        let strategy = RetryStrategy::default();

        assert_eq!(strategy.max_attempts, 3);
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_secs(20));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_secs(20));
    }

    #[test]
    fn test_exponential_backoff() {
        let strategy = RetryStrategy::new(5)
            .with_base_delay(Duration::from_secs(1))
            .with_exponential_backoff(true);

        assert_eq!(strategy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(strategy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_max_delay_cap() {
        let strategy = RetryStrategy::new(10)
            .with_base_delay(Duration::from_secs(10))
            .with_exponential_backoff(true);

        // Capped at 60 seconds
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_secs(60));
        assert_eq!(strategy.delay_for_attempt(40), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryStrategy::new(0).max_attempts, 1);
        assert_eq!(RetryStrategy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_should_retry_connection_errors_only() {
        let strategy = RetryStrategy::immediate(3);

        assert!(strategy.should_retry(&HttpError::Connect("refused".into())));
        assert!(!strategy.should_retry(&HttpError::InvalidUrl("bad".into())));
    }
}
