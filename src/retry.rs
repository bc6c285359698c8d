//! Retry strategies and the retry executor.
//!
//! A [`RetryStrategy`] decides how long to wait before each retry.
//! A [`RetryPolicy`] runs an operation under a strategy, retrying on any
//! [`Error`] and stopping early when the caller cancels.
//!
//! Retries are driven only by errors. A response with a non-success status is
//! a successful attempt from the policy's point of view.

use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Defines when and how to retry failed attempts.
///
/// # Examples
///
/// ```
/// use governed_http::RetryStrategy;
/// use std::time::Duration;
///
/// // No retries
/// let no_retry = RetryStrategy::None;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Do not retry failed attempts.
    None,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(retry - 1)` (capped at `max_delay`).
    /// Optional jitter scales each delay by a random factor in `[0.5, 1.0]`.
    ExponentialBackoff {
        /// The initial delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Custom retry logic.
    ///
    /// The function takes the retry number (starting from 1) and returns
    /// `Some(delay)` to retry after the delay, or `None` to stop.
    Custom {
        /// Function that determines retry delay.
        delay_fn: fn(retry: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// The schedule used when a client is not given one: exponential backoff
    /// with jitter starting at 100ms, capped at 10s, for up to five attempts.
    pub const fn default_backoff() -> Self {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_retries: 4,
            jitter: true,
        }
    }

    /// Returns the delay before the given retry, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `retry` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, retry: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if retry > *max_retries {
                    return None;
                }

                let multiplier = 2u32.saturating_pow(retry.saturating_sub(1) as u32);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                if retry > *max_retries {
                    None
                } else {
                    Some(*delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(retry),
        }
    }

    /// Returns the maximum number of retries, if known.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::ExponentialBackoff { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::default_backoff()
    }
}

/// Executes an operation, retrying failed attempts according to a strategy.
///
/// Cancellation is checked around every attempt and every backoff wait.
/// When attempts are exhausted the error of the final attempt is returned as
/// is; errors of earlier attempts are logged and dropped.
///
/// # Examples
///
/// ```
/// use governed_http::{Error, RetryPolicy, RetryStrategy};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let policy = RetryPolicy::new(RetryStrategy::Linear {
///     delay: Duration::from_millis(1),
///     max_retries: 2,
/// });
///
/// let result = policy
///     .execute(&CancellationToken::new(), |attempt| async move {
///         if attempt < 3 {
///             Err(Error::Timeout)
///         } else {
///             Ok(attempt)
///         }
///     })
///     .await;
///
/// assert_eq!(result.unwrap(), 3);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
}

impl RetryPolicy {
    /// Creates a policy following `strategy`.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self { strategy }
    }

    /// The strategy this policy follows.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Runs `operation` until it succeeds, the strategy gives up, or `cancel` fires.
    ///
    /// `operation` receives the attempt number, starting at 1. An
    /// [`Error::Cancelled`] returned by the operation itself also ends the loop.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = operation(attempt) => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            let Some(delay) = self.strategy.delay_for_attempt(attempt) else {
                tracing::warn!(
                    error = %error,
                    attempts = attempt,
                    "Retries exhausted"
                );
                return Err(error);
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Attempt failed, retrying after delay"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
