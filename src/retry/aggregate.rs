//! Terminal outcomes of a retry run.

use std::fmt;

/// Summary message carried by every [`AggregatedFailure`].
pub const AGGREGATE_MESSAGE: &str = "Read fail!";

/// One failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord<E> {
    /// 1-based attempt index
    pub attempt: u32,
    pub error: E,
}

impl<E> AttemptRecord<E> {
    pub const fn new(attempt: u32, error: E) -> Self {
        Self { attempt, error }
    }
}

/// Every attempt's error, in attempt order, after the policy ran out of attempts.
///
/// Never empty: one record per attempt made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedFailure<E> {
    attempts: Vec<AttemptRecord<E>>,
}

impl<E> AggregatedFailure<E> {
    pub(crate) fn new(attempts: Vec<AttemptRecord<E>>) -> Self {
        debug_assert!(!attempts.is_empty(), "aggregated failure without attempts");
        Self { attempts }
    }

    pub fn message(&self) -> &'static str {
        AGGREGATE_MESSAGE
    }

    pub fn attempts(&self) -> &[AttemptRecord<E>] {
        &self.attempts
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &E> {
        self.attempts.iter().map(|record| &record.error)
    }

    pub fn last_error(&self) -> Option<&E> {
        self.attempts.last().map(|record| &record.error)
    }

    pub fn into_attempts(self) -> Vec<AttemptRecord<E>> {
        self.attempts
    }
}

impl<E: fmt::Display> fmt::Display for AggregatedFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(AGGREGATE_MESSAGE)?;
        for record in &self.attempts {
            write!(f, " (attempt {}: {})", record.attempt, record.error)?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregatedFailure<E> {}

/// Why a retry run ended without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// All attempts failed.
    Exhausted(AggregatedFailure<E>),

    /// The cancel signal fired, or an attempt reported a cancellation.
    /// `attempts` counts operation invocations made before stopping.
    Cancelled { attempts: u32 },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(failure) => failure.fmt(f),
            Self::Cancelled { attempts } => {
                write!(f, "Retry cancelled after {attempts} attempt(s)")
            }
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: fmt::Debug + fmt::Display + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted(failure) => Some(failure),
            Self::Cancelled { .. } => None,
        }
    }
}

impl<E> RetryError<E> {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn aggregated(&self) -> Option<&AggregatedFailure<E>> {
        match self {
            Self::Exhausted(failure) => Some(failure),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn into_aggregated(self) -> Option<AggregatedFailure<E>> {
        match self {
            Self::Exhausted(failure) => Some(failure),
            Self::Cancelled { .. } => None,
        }
    }

    /// Number of operation invocations made during the run.
    pub fn attempts_made(&self) -> u32 {
        match self {
            Self::Exhausted(failure) => failure.attempt_count() as u32,
            Self::Cancelled { attempts } => *attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;

    #[test]
    fn display_lists_attempts_in_order() {
        let failure = AggregatedFailure::new(vec![
            AttemptRecord::new(1, ReadError::Timeout),
            AttemptRecord::new(2, ReadError::device("nak")),
        ]);
        assert_eq!(
            failure.to_string(),
            "Read fail! (attempt 1: Read Time Out) (attempt 2: Device error: nak)"
        );
        assert_eq!(failure.message(), AGGREGATE_MESSAGE);
        assert_eq!(failure.last_error(), Some(&ReadError::device("nak")));
    }

    #[test]
    fn retry_error_accessors() {
        let exhausted: RetryError<ReadError> =
            RetryError::Exhausted(AggregatedFailure::new(vec![AttemptRecord::new(
                1,
                ReadError::Timeout,
            )]));
        assert!(!exhausted.is_cancelled());
        assert_eq!(exhausted.attempts_made(), 1);
        assert!(exhausted.to_string().starts_with("Read fail!"));

        let cancelled: RetryError<ReadError> = RetryError::Cancelled { attempts: 2 };
        assert!(cancelled.is_cancelled());
        assert!(cancelled.aggregated().is_none());
        assert_eq!(cancelled.to_string(), "Retry cancelled after 2 attempt(s)");
    }
}
