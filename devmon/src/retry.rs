//! Bounded retry with linear backoff around a fetch operation

use crate::error::{MonitorError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Sleep before retry `n` is `n * backoff_unit`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self { max_retries, backoff_unit }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry `attempt`, saturating instead of overflowing.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. Failures come back as `RetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let wait = self.backoff(attempt);
                debug!("retry {} in {:?}", attempt, wait);
                tokio::time::sleep(wait).await;
            }
            attempt += 1;

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!("attempt {} failed, not retrying: {}", attempt, err);
                return Err(exhausted(attempt, err));
            }
            if attempt >= self.max_attempts() {
                warn!("attempt {} failed, giving up: {}", attempt, err);
                return Err(exhausted(attempt, err));
            }
            debug!("attempt {} failed: {}", attempt, err);
        }
    }
}

fn exhausted(attempts: u32, source: MonitorError) -> MonitorError {
    MonitorError::RetriesExhausted {
        attempts,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn api(status: u16) -> MonitorError {
        MonitorError::Api {
            status,
            endpoint: "ListPhysicalDevices".into(),
            body: String::new(),
        }
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_server_errors_use_every_attempt() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(api(503))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(matches!(err, MonitorError::RetriesExhausted { attempts: 3, .. }));
        assert!(err.to_string().contains("failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_client_errors_stop_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(api(404))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result.unwrap_err() {
            MonitorError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 1);
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_success_after_transient_failure() {
        let calls = &AtomicU32::new(0);
        let result = fast(2)
            .run(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(MonitorError::Transport {
                        endpoint: "ListPhysicalDevices".into(),
                        message: "connection refused".into(),
                    })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_linearly() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let _: Result<()> = policy.run(|| async { Err(api(500)) }).await;

        // 1s before the second attempt, 2s before the third
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::MAX);
        assert_eq!(policy.max_attempts(), u32::MAX);
        assert_eq!(policy.backoff(2), Duration::MAX);

        let policy = RetryPolicy::new(2, Duration::from_secs(u64::MAX / 2 + 1));
        assert_eq!(policy.backoff(1), Duration::from_secs(u64::MAX / 2 + 1));
        assert_eq!(policy.backoff(2), Duration::MAX);
        assert_eq!(policy.backoff(0), Duration::ZERO);
    }
}
