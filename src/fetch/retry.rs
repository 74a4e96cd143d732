//! Retry policy and the retry loop

use crate::fetch::error::{is_retryable, retry_after, FetchError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Exponential backoff settings
///
/// Values are normalized at construction: zero fields fall back to the
/// defaults (3 retries, 1s, 30s, x2.0), a max interval below the initial
/// interval is raised to it, and a multiplier that is not finite or below
/// 1.0 becomes 2.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a normalized policy
    pub fn new(
        max_retries: u32,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Self {
        let max_retries = if max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            max_retries
        };

        let initial_interval = if initial_interval.is_zero() {
            DEFAULT_INITIAL_INTERVAL
        } else {
            initial_interval
        };

        let max_interval = if max_interval.is_zero() {
            DEFAULT_MAX_INTERVAL
        } else {
            max_interval
        }
        .max(initial_interval);

        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            DEFAULT_MULTIPLIER
        };

        Self {
            max_retries,
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Delay before retry number `attempt + 1` (attempt is 0-based)
    ///
    /// `min(max_interval, initial_interval * multiplier^attempt)`, no jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }

        Duration::from_secs_f64(secs)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of retries
///
/// The operation receives the 0-based attempt number. Only errors accepted by
/// [`is_retryable`] are retried. A retry hint carried by the error replaces
/// the computed backoff for that attempt. Cancellation is checked before
/// every attempt and interrupts the backoff sleep.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        if attempt >= policy.max_retries {
            tracing::debug!("Giving up after {} attempts: {}", attempt + 1, err);
            return Err(err);
        }

        let delay = retry_after(&err).unwrap_or_else(|| policy.backoff(attempt));
        tracing::debug!(
            "Attempt {} failed ({}), retrying in {:?}",
            attempt + 1,
            err,
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}
