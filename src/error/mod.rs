//! Error Handling Module
//!
//! - Core error types (`ReadError`, `PolicyError`, `TelemetryError`)
//! - The `RetryableError` classification used by the retry executor
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use instrument_retry::error::{ReadError, RetryableError};
//!
//! assert!(ReadError::Cancelled.is_cancellation());
//! assert_eq!(ReadError::Timeout.to_string(), "Read Time Out");
//! ```

mod conversions;
pub mod types;

pub use types::*;
