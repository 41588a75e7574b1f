use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Bounded exponential backoff for model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of calls, including the first. Never below one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// How a retried operation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a transient error.
    Exhausted { last_error: E, attempts: u32 },
    /// A non-transient error stopped the loop early.
    Aborted { error: E, attempts: u32 },
}

/// Run `op` until it succeeds, fails permanently, or the policy's attempt
/// budget is spent. `op` receives the 0-based attempt number. There is no
/// sleep after the final attempt.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    is_transient: impl Fn(&E) -> bool,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt + 1,
                }
            }
            Err(error) if !is_transient(&error) => {
                warn!(attempt = attempt + 1, %error, "non-retryable failure");
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt + 1,
                };
            }
            Err(error) => {
                if attempt + 1 >= max_attempts {
                    warn!(attempts = attempt + 1, %error, "retry budget exhausted");
                    return RetryOutcome::Exhausted {
                        last_error: error,
                        attempts: attempt + 1,
                    };
                }
                let delay = policy.backoff(attempt);
                debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
