//! Retry handling inside a step

use tokio::time::Duration;

use crate::errors::DriverError;
use crate::types::ExecutionSettings;

const MAX_BACKOFF_MS: u64 = 60_000;

/// Bounded retry policy applied to locate and interaction calls. The
/// step's own time bound still wraps every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl StepRetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_ms,
        }
    }

    pub fn from_settings(settings: &ExecutionSettings) -> Self {
        Self::new(
            settings.locate_attempts,
            settings.retry_backoff.as_millis() as u64,
        )
    }

    /// `attempt` is 1-based: the number of attempts already made.
    pub fn should_retry(&self, error: &DriverError, attempt: u32) -> bool {
        attempt < self.max_attempts && (error.is_retryable() || error.is_not_found())
    }

    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        // backoff_ms * 2^(attempt-1)
        let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
        let total_ms = self.backoff_ms.saturating_mul(multiplier);
        Duration::from_millis(total_ms.min(MAX_BACKOFF_MS))
    }
}

impl Default for StepRetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ExecutionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry() {
        let policy = StepRetryPolicy::new(3, 100);
        let stale = DriverError::StaleElement("x".into());
        let invalid = DriverError::InvalidSelector("x".into());

        assert!(policy.should_retry(&stale, 1));
        assert!(policy.should_retry(&stale, 2));
        assert!(!policy.should_retry(&stale, 3));
        assert!(!policy.should_retry(&invalid, 1));
        assert!(policy.should_retry(&DriverError::NoSuchElement("x".into()), 1));
    }

    #[test]
    fn test_calculate_backoff() {
        let policy = StepRetryPolicy::new(10, 100);
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(400));
        assert_eq!(policy.calculate_backoff(30), Duration::from_millis(60_000));
    }
}
