use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ToolError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Bounded retry with linear backoff.
///
/// Attempt `n` that fails with a retryable error is followed by a wait of
/// `base_delay * n` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait applied after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Upper bound on the total time spent sleeping between attempts
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay_for(attempt)).sum()
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ToolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) if !err.retryable => {
                    tracing::debug!(kind = %err.kind, "Not retrying: {}", err.message);
                    return Err(err);
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        kind = %err.kind,
                        "Giving up after {} attempts: {}",
                        attempt,
                        err.message
                    );
                    return Err(ToolError::exhausted(attempt, &err));
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        kind = %err.kind,
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        delay,
                        err.message
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Run `operation` under a one-off [`RetryPolicy`]
pub async fn with_retry<T, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    RetryPolicy::new(max_attempts, base_delay).run(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_two_retryable_failures() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result = fast_policy(3)
            .run(move || async move {
                let n = calls_ref.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ToolError::new(ErrorKind::NetworkError, "connection reset"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_runs_once() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), ToolError> = fast_policy(5)
            .run(move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(ToolError::new(ErrorKind::PermissionDenied, "sign in required"))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert_eq!(err.message, "sign in required");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), ToolError> = fast_policy(3)
            .run(move || async move {
                let n = calls_ref.fetch_add(1, Ordering::SeqCst) + 1;
                Err(ToolError::unclassified(format!("failure {}", n)))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.kind, ErrorKind::Unclassified);
        assert!(!err.retryable);
        assert_eq!(err.message, "Operation failed after 3 attempts: failure 3");
    }

    #[tokio::test]
    async fn test_with_retry_single_attempt() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), ToolError> = with_retry(
            move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(ToolError::unclassified("boom"))
            },
            1,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().message, "Operation failed after 1 attempt: boom");
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let value = tokio_test::assert_ok!(fast_policy(3).run(|| async { Ok::<_, ToolError>(7) }).await);
        assert_eq!(value, 7);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.total_backoff(), Duration::from_millis(3000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
