//! instrument-retry
//!
//! Timeout-bounded instrument reads and a cancellable retry executor.
//!
//! - [`timeout`]: a single read that stops at a deadline or on cancellation
//! - [`retry`]: retry policies, backoff shapes and the executor
//! - [`device`]: an instrument wrapper combining both
//! - [`utils::cancel`]: cancel handles and composed cancel signals
#![deny(unsafe_code)]

pub mod device;
pub mod error;
pub mod retry;
pub mod retry_api;
pub mod telemetry;
pub mod timeout;
pub mod utils;

pub use device::{DeviceConfig, InstrumentDevice, SilentTransport};
pub use error::{PolicyError, ReadError, RetryableError};
pub use retry::{
    AggregatedFailure, AttemptRecord, Backoff, ExponentialBackoff, RetryError, RetryExecutor,
    RetryPolicy,
};
pub use timeout::{ByteSource, ReadStatus, TimedOperation, run_with_timeout};
pub use utils::cancel::{CancelHandle, CancelSignal, new_cancel_handle};
