//! Retry policy for analyzer calls
//!
//! Retries a single idempotent call with exponential backoff. Validation
//! failures are returned immediately since they would fail the same way
//! on every attempt.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use esg_core::{ExtractionResult, RetryConfig};

use crate::{DocumentAnalyzer, Result};

/// Upper bound for a single backoff sleep
const MAX_DELAY: Duration = Duration::from_secs(300);

/// Exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Delay multiplier per further failure
    pub backoff: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: 2.0,
        }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff.max(1.0);
        self
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
            .with_backoff(config.backoff)
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {} failed: {}. Retrying in {:?}...",
                        attempt,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Analyzer wrapper that applies a retry policy to every call
pub struct RetryingAnalyzer<A> {
    inner: A,
    policy: RetryPolicy,
}

impl<A: DocumentAnalyzer> RetryingAnalyzer<A> {
    pub fn new(inner: A, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: DocumentAnalyzer> DocumentAnalyzer for RetryingAnalyzer<A> {
    async fn analyze(&self, content: &[u8], filename: &str) -> Result<ExtractionResult> {
        self.policy
            .run(|| self.inner.analyze(content, filename))
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalyzerError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails a fixed number of times before succeeding
    struct FlakyAnalyzer {
        failures: u32,
        calls: AtomicU32,
        validation_error: bool,
    }

    impl FlakyAnalyzer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                validation_error: false,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentAnalyzer for FlakyAnalyzer {
        async fn analyze(&self, _content: &[u8], filename: &str) -> Result<ExtractionResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.validation_error {
                return Err(AnalyzerError::FileTooLarge {
                    size_mb: 99.0,
                    max_mb: 50,
                });
            }
            if call <= self.failures {
                return Err(AnalyzerError::ExcelError(format!("transient failure {call}")));
            }
            Ok(ExtractionResult::new(filename))
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(60), MAX_DELAY);
    }

    #[test]
    fn test_policy_normalization() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10)).with_backoff(0.1);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, 1.0);
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let analyzer = RetryingAnalyzer::new(FlakyAnalyzer::new(2), instant_policy(3));

        let result = tokio_test::block_on(analyzer.analyze(b"x", "esg.xlsx")).unwrap();
        assert_eq!(result.filename, "esg.xlsx");
        assert_eq!(analyzer.inner().calls(), 3);
        assert_eq!(analyzer.name(), "flaky");
    }

    #[test]
    fn test_returns_last_error_when_exhausted() {
        let analyzer = RetryingAnalyzer::new(FlakyAnalyzer::new(5), instant_policy(3));

        let err = tokio_test::block_on(analyzer.analyze(b"x", "esg.xlsx")).unwrap_err();
        assert!(err.to_string().contains("transient failure 3"));
        assert_eq!(analyzer.inner().calls(), 3);
    }

    #[test]
    fn test_validation_errors_are_not_retried() {
        let mut flaky = FlakyAnalyzer::new(0);
        flaky.validation_error = true;
        let analyzer = RetryingAnalyzer::new(flaky, instant_policy(5));

        let err = tokio_test::block_on(analyzer.analyze(b"x", "esg.xlsx")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(analyzer.inner().calls(), 1);
    }

    #[test]
    fn test_run_with_closure() {
        let policy = instant_policy(4);
        let mut attempts = 0;

        let value = tokio_test::block_on(policy.run(|| {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 4 {
                    Err(AnalyzerError::TaskFailed("busy".to_string()))
                } else {
                    Ok(current)
                }
            }
        }))
        .unwrap();

        assert_eq!(value, 4);
    }
}
