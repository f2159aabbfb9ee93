//! Retry policy configuration
//!
//! A [`RetryPolicy`] fixes how many attempts a run may make, how long to wait
//! after each failed attempt, and an optional hook observing every failure.
//! Policies are built once per run and never change afterwards.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::{PolicyError, ReadError};

/// Delay function for custom backoff shapes.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Hook invoked with the error and 1-based attempt index after each failed attempt.
pub type RetryHook<E> = Arc<dyn Fn(&E, u32) + Send + Sync>;

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound before jitter
    pub max_delay: Duration,
    /// Growth factor per attempt, at least 1.0
    pub multiplier: f64,
    /// Maximum jitter as a fraction of the delay (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl ExponentialBackoff {
    pub const fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PolicyError::InvalidBackoff(format!(
                "multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(PolicyError::InvalidBackoff(format!(
                "initial delay {:?} exceeds max delay {:?}",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }

    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let max_ms = self.max_delay.as_millis() as f64;
        let delay = Duration::from_millis(base_ms.min(max_ms) as u64);

        if self.jitter_factor > 0.0 {
            add_jitter(delay, self.jitter_factor)
        } else {
            delay
        }
    }
}

fn add_jitter(delay: Duration, factor: f64) -> Duration {
    let jitter_range = delay.as_millis() as f64 * factor;
    if jitter_range <= 0.0 {
        return delay;
    }
    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
    let new_delay = delay.as_millis() as f64 + jitter;
    Duration::from_millis(new_delay.max(0.0) as u64)
}

/// Wait applied after a failed attempt, as a function of its 1-based index.
#[derive(Clone, Default)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    NoDelay,
    /// Same delay after every attempt.
    Fixed(Duration),
    /// `step * attempt`.
    Linear(Duration),
    /// Explicit per-attempt delays; the last entry repeats, an empty schedule is zero.
    Schedule(Arc<[Duration]>),
    /// `initial * multiplier^(attempt - 1)`, capped, with optional jitter.
    Exponential(ExponentialBackoff),
    /// Caller-defined shape.
    Custom(BackoffFn),
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDelay => f.write_str("NoDelay"),
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Linear(d) => f.debug_tuple("Linear").field(d).finish(),
            Self::Schedule(s) => f.debug_tuple("Schedule").field(s).finish(),
            Self::Exponential(e) => f.debug_tuple("Exponential").field(e).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Backoff {
    /// Build a schedule backoff from a list of delays.
    pub fn schedule<I>(delays: I) -> Self
    where
        I: IntoIterator<Item = Duration>,
    {
        Self::Schedule(delays.into_iter().collect())
    }

    /// Build a backoff from an arbitrary function of the attempt index.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::NoDelay => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Linear(step) => step.saturating_mul(attempt),
            Self::Schedule(delays) => {
                let idx = (attempt.max(1) as usize - 1).min(delays.len().saturating_sub(1));
                delays.get(idx).copied().unwrap_or(Duration::ZERO)
            }
            Self::Exponential(exp) => exp.delay(attempt),
            Self::Custom(f) => f(attempt),
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match self {
            Self::Exponential(exp) => exp.validate(),
            _ => Ok(()),
        }
    }
}

/// Retry policy configuration
pub struct RetryPolicy<E = ReadError> {
    max_attempts: NonZeroU32,
    backoff: Backoff,
    on_retry: Option<RetryHook<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("on_retry", &self.on_retry.as_ref().map(|_| ".."))
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    /// Three attempts, one second apart.
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            backoff: Backoff::Fixed(Duration::from_secs(1)),
            on_retry: None,
        }
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy retrying immediately, up to `max_attempts` attempts in total.
    pub fn new(max_attempts: u32) -> Result<Self, PolicyError> {
        let max_attempts =
            NonZeroU32::new(max_attempts).ok_or(PolicyError::InvalidMaxAttempts(max_attempts))?;
        Ok(Self {
            max_attempts,
            backoff: Backoff::NoDelay,
            on_retry: None,
        })
    }

    /// One attempt, no retries.
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN,
            backoff: Backoff::NoDelay,
            on_retry: None,
        }
    }

    pub fn no_delay(max_attempts: u32) -> Result<Self, PolicyError> {
        Self::new(max_attempts)
    }

    pub fn fixed_delay(max_attempts: u32, delay: Duration) -> Result<Self, PolicyError> {
        Self::new(max_attempts)?.with_backoff(Backoff::Fixed(delay))
    }

    /// Replace the backoff, validating its parameters.
    pub fn with_backoff(mut self, backoff: Backoff) -> Result<Self, PolicyError> {
        backoff.validate()?;
        self.backoff = backoff;
        Ok(self)
    }

    /// Set the hook called after every failed attempt, the last one included.
    pub fn with_on_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn(&E, u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Delay after failed attempt `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    pub(crate) fn notify_retry(&self, error: &E, attempt: u32) {
        if let Some(hook) = &self.on_retry {
            hook(error, attempt);
        }
    }
}
