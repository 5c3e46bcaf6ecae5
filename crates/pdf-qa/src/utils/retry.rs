//! Bounded retry with exponential backoff for calls to remote services.

use crate::utils::error::PipelineError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Maximum delay cap (16 seconds)
const MAX_DELAY_MS: u64 = 16_000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    max_retries: u32,
    base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Run `operation`, retrying only errors reported as transient.
    pub async fn execute<F, Fut, T>(&self, op_name: &str, mut operation: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        op_name,
                        attempt,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Binary exponential backoff: base * 2^(attempt-1), capped
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(MAX_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn unavailable() -> PipelineError {
        PipelineError::Service {
            status: 503,
            body: "overloaded".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let policy = RetryPolicy::new(3, 1);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = policy
            .execute("completion", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, 1);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = policy
            .execute("completion", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(unavailable())
                }
            })
            .await;

        assert!(matches!(result, Err(PipelineError::Service { status: 503, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, 1);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = policy
            .execute("completion", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PipelineError::AnswerGeneration("missing answer field".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(10, 1_000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(MAX_DELAY_MS));
    }
}
