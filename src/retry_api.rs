//! Public Retry API Facade
//!
//! - `retry`: run an operation under a policy
//! - `maybe_retry`: same, but a missing policy means a single attempt
//! - `RetrySettings`: serde-friendly policy description for embedding in
//!   application config
//!
//! Example
//! ```rust,ignore
//! use instrument_retry::retry_api::{retry, RetrySettings};
//!
//! let policy = RetrySettings::default().to_policy()?;
//! let bytes = retry(|| device.read(Some(&signal)), &policy, Some(&signal)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, RetryableError};
use crate::utils::cancel::CancelSignal;

// Re-export core types for convenience
pub use crate::retry::{
    AggregatedFailure, AttemptRecord, Backoff, ExponentialBackoff, RetryError, RetryExecutor,
    RetryPolicy,
};

/// Backoff shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately
    None,
    /// Constant `delay_ms`
    #[default]
    Fixed,
    /// `delay_ms * attempt`
    Linear,
    /// `delay_ms * multiplier^(attempt - 1)`, capped at `max_delay_ms`
    Exponential,
}

/// Unified retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub strategy: BackoffStrategy,
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: BackoffStrategy::Fixed,
            delay_ms: 1000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl RetrySettings {
    /// Immediate retries
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            strategy: BackoffStrategy::None,
            delay_ms: 0,
            ..Default::default()
        }
    }

    /// Constant delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            strategy: BackoffStrategy::Fixed,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    pub fn backoff(&self) -> Backoff {
        let delay = Duration::from_millis(self.delay_ms);
        match self.strategy {
            BackoffStrategy::None => Backoff::NoDelay,
            BackoffStrategy::Fixed => Backoff::Fixed(delay),
            BackoffStrategy::Linear => Backoff::Linear(delay),
            BackoffStrategy::Exponential => Backoff::Exponential(
                ExponentialBackoff::new(delay, Duration::from_millis(self.max_delay_ms))
                    .with_multiplier(self.multiplier)
                    .with_jitter_factor(self.jitter_factor),
            ),
        }
    }

    /// Build a validated policy
    pub fn to_policy<E>(&self) -> Result<RetryPolicy<E>, PolicyError> {
        RetryPolicy::new(self.max_attempts)?.with_backoff(self.backoff())
    }
}

/// Run `operation` under `policy` until it succeeds, runs out of attempts, or
/// `cancel` fires.
pub async fn retry<F, Fut, T, E>(
    operation: F,
    policy: &RetryPolicy<E>,
    cancel: Option<&CancelSignal>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    RetryExecutor::new(policy.clone()).run(operation, cancel).await
}

/// Retry only when a policy is provided; otherwise make a single attempt.
///
/// Keeps call sites uniform when retry is opt-in. The single attempt still
/// reports through `RetryError`.
pub async fn maybe_retry<F, Fut, T, E>(
    policy: Option<&RetryPolicy<E>>,
    operation: F,
    cancel: Option<&CancelSignal>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    match policy {
        Some(policy) => retry(operation, policy, cancel).await,
        None => {
            RetryExecutor::new(RetryPolicy::single_attempt())
                .run(operation, cancel)
                .await
        }
    }
}
