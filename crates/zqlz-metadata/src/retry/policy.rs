use std::future::Future;

use zqlz_core::ProgressMonitor;

use super::BackoffStrategy;
use crate::error::{MetadataError, MetadataResult};

/// Bounded retry: at most `max_attempts` tries in total, sleeping according
/// to the backoff strategy between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, BackoffStrategy::default())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, BackoffStrategy::default())
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the policy runs out of attempts. The monitor is checked before every
/// attempt and the backoff sleep is cut short when it is cancelled; either
/// way the result is [`MetadataError::Cancelled`].
///
/// `op` receives the zero-based attempt number.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    monitor: &dyn ProgressMonitor,
    is_retryable: impl Fn(&MetadataError) -> bool,
    mut op: F,
) -> MetadataResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = MetadataResult<T>>,
{
    let mut attempt = 0;
    loop {
        if monitor.is_cancelled() {
            return Err(MetadataError::Cancelled);
        }

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) || attempt + 1 >= policy.max_attempts {
            tracing::debug!(attempt, error = %err, "giving up");
            return Err(err);
        }

        let delay = policy.backoff.calculate_delay(attempt);
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "metadata load failed, retrying"
        );

        match monitor.cancellation_token() {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(MetadataError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        attempt += 1;
    }
}
