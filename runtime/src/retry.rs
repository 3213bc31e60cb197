//! Retry logic with exponential backoff for effect execution.
//!
//! Only effects are retried. A reducer's state change is committed before any
//! effect runs, so retrying a publication can never apply an operation twice.
//!
//! # Example
//!
//! ```rust
//! use ticket_sale_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::new()
//!     .with_max_attempts(3)
//!     .with_initial_delay(Duration::from_millis(10));
//!
//! let value = retry_with_backoff(&policy, "example", || async { Ok::<_, String>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

/// Retry policy for handling transient failures
///
/// Exponential backoff, optionally with jitter, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,

    /// Delay before the first retry
    initial_delay: Duration,

    /// Cap on the delay between retries
    max_delay: Duration,

    /// Multiplier for exponential backoff (2.0 = double each time)
    backoff_multiplier: f64,

    /// Scale each delay by a random factor in `[0.5, 1.0]`
    jitter: bool,
}

impl RetryPolicy {
    /// Create a new retry policy with default settings
    ///
    /// Defaults:
    /// - `max_attempts`: 5
    /// - `initial_delay`: 100 milliseconds
    /// - `max_delay`: 10 seconds
    /// - `backoff_multiplier`: 2.0
    /// - `jitter`: enabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial delay before first retry
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay between retries
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier for exponential backoff
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate delay for a given attempt number (0-indexed)
    ///
    /// `delay = min(initial_delay * multiplier^attempt, max_delay)`, then
    /// multiplied by a random factor in `[0.5, 1.0]` when jitter is enabled.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        // Note: attempt counts stay tiny, the cast cannot wrap in practice
        #[allow(clippy::cast_possible_wrap)]
        let base_delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);

        let capped_secs = base_delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            capped_secs * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }

    /// Get maximum number of attempts
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Check if another attempt is allowed after `attempt` attempts were made
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `f` until it succeeds or the policy's attempts are exhausted.
///
/// Metrics are recorded under `store.retry.*` with the operation name as a label.
///
/// # Errors
///
/// Returns the last error once every attempt has failed.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    metrics::counter!(
                        "store.retry.success",
                        "operation" => operation_name.to_string()
                    )
                    .increment(1);
                    tracing::info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            },
            Err(error) => {
                if !policy.should_retry(attempt + 1) {
                    metrics::counter!(
                        "store.retry.exhausted",
                        "operation" => operation_name.to_string()
                    )
                    .increment(1);
                    tracing::error!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %error,
                        "Operation failed after exhausting retries"
                    );
                    return Err(error);
                }

                let delay = policy.delay_for_attempt(attempt);
                metrics::counter!(
                    "store.retry.attempt",
                    "operation" => operation_name.to_string()
                )
                .increment(1);
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Operation failed, retrying after delay"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delay_calculation_without_jitter() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(10))
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(10.0)
            .with_max_delay(Duration::from_secs(2))
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_within_half_and_full_delay() {
        let policy = RetryPolicy::new().with_initial_delay(Duration::from_millis(100));

        for _ in 0..50 {
            let delay = policy.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let policy = RetryPolicy::new()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_backoff(&policy, "test", || {
            let c = Arc::clone(&counter_clone);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(format!("Attempt {attempt} failed"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let policy = RetryPolicy::new()
            .with_max_attempts(2)
            .with_initial_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = retry_with_backoff(&policy, "test", || {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("Persistent failure")
            }
        })
        .await;

        assert_eq!(result, Err("Persistent failure"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
