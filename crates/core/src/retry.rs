//! Retry mechanism with exponential backoff and jitter
//!
//! Every primitive call runs through [`RetryPolicy`]. Throttled and transient
//! failures are retried; any other kind returns after the first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::classify::classify;
use crate::config::RetryConfig;
use crate::error::{Operation, RawError, StorageError};

/// Attempt bookkeeping for one call under the policy
#[derive(Debug)]
struct RetryContext {
    attempt: u32,
    max_attempts: u32,
}

impl RetryContext {
    fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Bounded exponential backoff around backend calls
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `call` until it succeeds, fails with a non-retryable kind, or
    /// exhausts `max_attempts`.
    ///
    /// The returned [`StorageError`] carries the last classified kind and the
    /// number of attempts made.
    ///
    /// # Example
    /// ```ignore
    /// let data = policy
    ///     .call(Operation::GetObject, &key, || store.get_object(&key))
    ///     .await?;
    /// ```
    pub async fn call<T, F, Fut>(
        &self,
        operation: Operation,
        target: impl Display,
        mut call: F,
    ) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawError>>,
    {
        let mut ctx = RetryContext::new(self.config.max_attempts);

        loop {
            ctx.attempt += 1;

            let raw = match call().await {
                Ok(result) => return Ok(result),
                Err(raw) => raw,
            };

            let kind = classify(&raw);

            if !kind.is_retryable() || ctx.exhausted() {
                if kind.is_retryable() {
                    tracing::warn!(
                        operation = %operation,
                        target = %target,
                        attempts = ctx.attempt,
                        kind = %kind,
                        "Retries exhausted"
                    );
                }
                return Err(StorageError::new(
                    kind,
                    operation,
                    &target,
                    raw.to_string(),
                    ctx.attempt,
                ));
            }

            let backoff = calculate_backoff(&self.config, ctx.attempt);
            tracing::debug!(
                operation = %operation,
                target = %target,
                attempt = ctx.attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %raw,
                "Retrying after {kind} error"
            );

            tokio::time::sleep(backoff).await;
        }
    }
}

/// Calculate backoff duration with jitter
fn calculate_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    // Exponential backoff: initial * 2^(attempt-1)
    let base_ms = config
        .initial_backoff_ms
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
    let capped_ms = base_ms.min(config.max_backoff_ms);

    // Add jitter: random value between 0 and backoff
    let jitter_ms = rand_jitter(capped_ms);
    Duration::from_millis(capped_ms + jitter_ms)
}

/// Generate pseudo-random jitter without external RNG dependency
fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % max.max(1)
}

/// Retry configuration builder for easy customization
#[derive(Debug, Clone)]
pub struct RetryBuilder {
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryBuilder {
    pub fn new() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_backoff_ms: defaults.initial_backoff_ms,
            max_backoff_ms: defaults.max_backoff_ms,
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    pub fn max_backoff_ms(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
        }
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportFailure};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryBuilder::new()
                .max_attempts(max_attempts)
                .initial_backoff_ms(1) // Fast for tests
                .max_backoff_ms(10)
                .build(),
        )
    }

    fn timeout() -> RawError {
        RawError::transport(TransportFailure::Timeout, "timeout")
    }

    #[test]
    fn test_calculate_backoff() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        };

        // First attempt should have base backoff
        let b1 = calculate_backoff(&config, 1);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 200);

        // Second attempt doubles
        let b2 = calculate_backoff(&config, 2);
        assert!(b2.as_millis() >= 200 && b2.as_millis() < 400);

        // Third attempt quadruples
        let b3 = calculate_backoff(&config, 3);
        assert!(b3.as_millis() >= 400 && b3.as_millis() < 800);
    }

    #[test]
    fn test_backoff_cap() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 5000,
        };

        // Even with many attempts, should not exceed max
        let b = calculate_backoff(&config, 10);
        assert!(b.as_millis() <= 10000); // max + jitter
    }

    #[test]
    fn test_retry_builder() {
        let config = RetryBuilder::new()
            .max_attempts(7)
            .initial_backoff_ms(200)
            .max_backoff_ms(20000)
            .build();

        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.initial_backoff_ms, 200);
        assert_eq!(config.max_backoff_ms, 20000);
        assert_eq!(RetryBuilder::default().build(), RetryConfig::default());
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = fast_policy(3);
        let mut calls = 0;

        let result = policy
            .call(Operation::GetObject, "b/k", || {
                calls += 1;
                async { Ok::<_, RawError>(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failure() {
        let policy = fast_policy(3);
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = policy
            .call(Operation::PutObject, "b/k", || {
                let cc = call_count_clone.clone();
                async move {
                    let count = cc.fetch_add(1, Ordering::SeqCst);
                    if count < 2 { Err(timeout()) } else { Ok(42) }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let policy = fast_policy(4);
        let mut calls = 0;

        let result: Result<(), StorageError> = policy
            .call(Operation::DeleteObject, "b/k", || {
                calls += 1;
                async { Err(RawError::service("SlowDown", 503, "slow down")) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Throttled);
        assert_eq!(err.attempts, 4);
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_retry_non_retryable() {
        let policy = fast_policy(3);

        for (raw, kind) in [
            (RawError::service("NoSuchKey", 404, "missing"), ErrorKind::NotFound),
            (RawError::service("AccessDenied", 403, "denied"), ErrorKind::Unauthorized),
            (RawError::service("BucketNotEmpty", 409, "busy"), ErrorKind::Conflict),
            (RawError::other("mystery"), ErrorKind::Fatal),
        ] {
            let mut calls = 0;
            let result: Result<(), StorageError> = policy
                .call(Operation::GetObject, "b/k", || {
                    calls += 1;
                    let raw = raw.clone();
                    async move { Err(raw) }
                })
                .await;

            let err = result.unwrap_err();
            assert_eq!(err.kind, kind);
            assert_eq!(err.attempts, 1);
            assert_eq!(calls, 1); // Should not retry
        }
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_calls_once() {
        let policy = fast_policy(0);
        let mut calls = 0;

        let result: Result<(), StorageError> = policy
            .call(Operation::GetObject, "b/k", || {
                calls += 1;
                async { Err(timeout()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
