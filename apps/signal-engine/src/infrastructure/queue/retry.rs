//! Retry policy for broker-facing operations.
//!
//! The policy is an explicit value object passed to [`with_retry`], so the
//! retry discipline is configured in one place instead of ad hoc at every
//! call site.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RetryDelay {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Exponentially growing delay, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Growth factor per retry.
        multiplier: f64,
        /// Upper bound on any delay.
        max: Duration,
    },
}

/// Retry policy: attempt budget plus delay schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub delay: RetryDelay,
}

impl RetryPolicy {
    /// Fixed-delay policy.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay: RetryDelay::Fixed(delay),
        }
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.delay {
            RetryDelay::Fixed(delay) => delay,
            RetryDelay::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                Duration::from_secs_f64((initial.as_secs_f64() * factor).min(max.as_secs_f64()))
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Two attempts, one second apart: the broker is either briefly flaky or
    /// genuinely down, and signal traffic goes stale fast.
    fn default() -> Self {
        Self::fixed(2, Duration::from_secs(1))
    }
}

/// Errors that can tell the retry loop whether another attempt is worthwhile.
pub trait Retryable {
    /// Whether retrying can possibly succeed.
    fn is_retryable(&self) -> bool;
}

/// Run `operation` under the retry policy.
///
/// Retries only errors whose [`Retryable::is_retryable`] returns true, up to
/// `policy.max_attempts` total attempts, sleeping the policy's delay between
/// them. The last error is returned when the budget is exhausted.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    error = %error,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
