//! Instrument device
//!
//! Binds a [`ByteSource`] transport to read settings and exposes single reads
//! and retried reads. The transport is locked for the duration of a read, so
//! concurrent callers on one device queue up instead of interleaving bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ReadError, ReadResult};
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};
use crate::timeout::{ByteSource, ReadStatus, TimedOperation};
use crate::utils::cancel::CancelSignal;

/// Read settings for an [`InstrumentDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Deadline for one read, in milliseconds
    pub read_timeout_ms: u64,
    /// How often the transport is polled, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 50,
            poll_interval_ms: 50,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = millis(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = millis(interval);
        self
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Stub transport: never produces bytes and never completes, so every read ends
/// in a timeout or a cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTransport;

#[async_trait]
impl ByteSource for SilentTransport {
    async fn read_available(&mut self, _buf: &mut BytesMut) -> ReadResult<ReadStatus> {
        Ok(ReadStatus::Pending)
    }
}

#[derive(Debug)]
pub struct InstrumentDevice<T> {
    transport: Mutex<T>,
    config: DeviceConfig,
}

impl<T: ByteSource> InstrumentDevice<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, DeviceConfig::default())
    }

    pub fn with_config(transport: T, config: DeviceConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            config,
        }
    }

    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// One read bounded by the configured timeout.
    pub async fn read(&self, cancel: Option<&CancelSignal>) -> ReadResult<Bytes> {
        self.read_with_timeout(self.config.read_timeout(), cancel)
            .await
    }

    /// One read bounded by `timeout`.
    pub async fn read_with_timeout(
        &self,
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> ReadResult<Bytes> {
        let mut transport = self.transport.lock().await;
        TimedOperation::new(self.config.poll_interval())
            .run(&mut *transport, timeout, cancel)
            .await
    }

    /// Reads until one succeeds, following `policy`. `cancel` stops both the
    /// current read and the retry loop.
    pub async fn read_with_retry(
        &self,
        policy: &RetryPolicy<ReadError>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Bytes, RetryError<ReadError>> {
        RetryExecutor::new(policy.clone())
            .run(|| self.read(cancel), cancel)
            .await
    }

    pub fn into_inner(self) -> T {
        self.transport.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cancel::CancelHandle;

    #[test]
    fn config_defaults_and_builders() {
        let config = DeviceConfig::new()
            .with_read_timeout(Duration::from_millis(250))
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(DeviceConfig::default().read_timeout_ms, 50);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: DeviceConfig = serde_json::from_str(r#"{"read_timeout_ms": 500}"#).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(500));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn oversized_durations_saturate() {
        let config = DeviceConfig::new()
            .with_read_timeout(Duration::MAX)
            .with_poll_interval(Duration::MAX);
        assert_eq!(config.read_timeout_ms, u64::MAX);
        assert_eq!(config.poll_interval_ms, u64::MAX);
    }

    /// Answers with a complete frame on every poll.
    struct ReadyTransport;

    #[async_trait]
    impl ByteSource for ReadyTransport {
        async fn read_available(&mut self, buf: &mut BytesMut) -> ReadResult<ReadStatus> {
            buf.extend_from_slice(b"OK");
            Ok(ReadStatus::Complete)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_config_reads_ready_transport() {
        let device = InstrumentDevice::new(ReadyTransport);
        let bytes = device.read(None).await.expect("ready transport answers");
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn default_config_retry_succeeds_first_time() {
        let device = InstrumentDevice::new(ReadyTransport);
        let policy = RetryPolicy::fixed_delay(5, Duration::from_millis(10)).unwrap();
        let bytes = device.read_with_retry(&policy, None).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_transport_times_out() {
        let device = InstrumentDevice::new(SilentTransport);
        assert_eq!(device.read(None).await, Err(ReadError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn retried_silent_reads_aggregate_timeouts() {
        let device = InstrumentDevice::new(SilentTransport);
        let policy = RetryPolicy::fixed_delay(3, Duration::from_millis(100)).unwrap();

        let err = device.read_with_retry(&policy, None).await.unwrap_err();
        let failure = err.into_aggregated().expect("exhausted");
        assert_eq!(failure.attempt_count(), 3);
        assert!(failure.errors().all(ReadError::is_timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_in_flight_read() {
        let device = InstrumentDevice::with_config(
            SilentTransport,
            DeviceConfig::new().with_read_timeout(Duration::from_secs(10)),
        );
        let handle = CancelHandle::new();
        let trigger = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            trigger.cancel();
        });

        let policy = RetryPolicy::fixed_delay(3, Duration::from_secs(1)).unwrap();
        let err = device
            .read_with_retry(&policy, Some(&handle.signal()))
            .await
            .unwrap_err();
        assert_eq!(err, RetryError::Cancelled { attempts: 1 });
    }
}
