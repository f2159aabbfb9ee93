//! Core error types.

use thiserror::Error;

/// Errors produced by a single instrument read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The read deadline elapsed before the transport reported completion.
    #[error("Read Time Out")]
    Timeout,

    /// A caller-supplied cancellation signal fired.
    #[error("Read cancelled")]
    Cancelled,

    /// The transport reported a device-level failure.
    #[error("Device error: {0}")]
    Device(String),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(String),
}

impl ReadError {
    /// Create a device error
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }

    /// Whether this failure came from the read deadline.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Invalid retry policy configuration. Raised when a policy is built,
/// never from inside the retry loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(u32),

    #[error("invalid backoff: {0}")]
    InvalidBackoff(String),
}

/// Tracing subscriber setup failures.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry initialization error: {0}")]
    Init(String),
}

/// Classifies attempt failures for the retry executor.
///
/// A cancellation error terminates the retry loop immediately instead of being
/// recorded and retried.
pub trait RetryableError: std::fmt::Display {
    fn is_cancellation(&self) -> bool {
        false
    }
}

impl RetryableError for ReadError {
    fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl RetryableError for std::io::Error {}

/// Result type for single reads
pub type ReadResult<T> = std::result::Result<T, ReadError>;
