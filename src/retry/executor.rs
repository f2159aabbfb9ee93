//! Retry executor
//!
//! Drives a restartable operation under a [`RetryPolicy`]. Each run ends in
//! exactly one of: the operation's value, [`RetryError::Exhausted`], or
//! [`RetryError::Cancelled`].
//!
//! ```text
//! Idle -> Attempting -> Succeeded
//!                    -> Waiting -> Attempting
//!                    -> Exhausted
//!                    -> Cancelled
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::RetryableError;
use crate::utils::cancel::CancelSignal;

use super::aggregate::{AggregatedFailure, AttemptRecord, RetryError};
use super::policy::RetryPolicy;

/// Retry executor that handles the actual retry logic
#[derive(Debug, Clone)]
pub struct RetryExecutor<E> {
    policy: RetryPolicy<E>,
}

impl<E: RetryableError> RetryExecutor<E> {
    /// Create a new retry executor
    pub const fn new(policy: RetryPolicy<E>) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Run `operation` until it succeeds, the policy runs out of attempts, or
    /// `cancel` fires.
    ///
    /// `operation` is called once per attempt and must start a fresh attempt each
    /// time. Attempts never overlap. Cancellation is checked before every attempt
    /// and raced against every backoff wait; an attempt already in flight is left
    /// to finish on its own.
    pub async fn run<F, Fut, T>(
        &self,
        mut operation: F,
        cancel: Option<&CancelSignal>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut failures: Vec<AttemptRecord<E>> = Vec::new();

        for attempt in 1..=max_attempts {
            if cancel.is_some_and(CancelSignal::is_cancelled) {
                tracing::debug!(attempt, max_attempts, "retry cancelled before attempt");
                return Err(RetryError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, max_attempts, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if error.is_cancellation() {
                tracing::debug!(attempt, error = %error, "attempt reported cancellation");
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            self.policy.notify_retry(&error, attempt);

            if attempt == max_attempts {
                tracing::warn!(attempt, max_attempts, error = %error, "final attempt failed");
                failures.push(AttemptRecord::new(attempt, error));
                break;
            }

            let delay = self.policy.delay_for(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "attempt failed, retrying"
            );
            failures.push(AttemptRecord::new(attempt, error));

            if !wait(delay, cancel).await {
                tracing::debug!(attempt, "retry cancelled during backoff");
                return Err(RetryError::Cancelled { attempts: attempt });
            }
        }

        Err(RetryError::Exhausted(AggregatedFailure::new(failures)))
    }
}

/// Sleep for `delay`, returning `false` if `cancel` fired first.
async fn wait(delay: Duration, cancel: Option<&CancelSignal>) -> bool {
    match cancel {
        Some(signal) => tokio::select! {
            biased;
            _ = signal.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        },
        None => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            true
        }
    }
}
