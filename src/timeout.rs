//! Timeout-bounded reads
//!
//! A read polls its [`ByteSource`] once on entry and then every `poll_interval`
//! until the source reports completion, the deadline passes, or an external
//! [`CancelSignal`] fires. Every poll and wait is raced against the combined stop
//! signal, so a stop takes effect immediately rather than at the next poll
//! boundary.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::error::{ReadError, ReadResult};
use crate::utils::cancel::CancelSignal;

/// Poll interval used by [`run_with_timeout`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Progress reported by a [`ByteSource`] after each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// More bytes may follow.
    Pending,
    /// The response is complete; the accumulated buffer is the result.
    Complete,
}

/// Transport side of a read: appends whatever bytes are currently available.
#[async_trait]
pub trait ByteSource: Send {
    async fn read_available(&mut self, buf: &mut BytesMut) -> ReadResult<ReadStatus>;
}

#[async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    async fn read_available(&mut self, buf: &mut BytesMut) -> ReadResult<ReadStatus> {
        (**self).read_available(buf).await
    }
}

/// Runs reads against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOperation {
    poll_interval: Duration,
}

impl Default for TimedOperation {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl TimedOperation {
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Read from `source` until it completes, `timeout` elapses, or `external`
    /// fires.
    ///
    /// Returns [`ReadError::Timeout`] when the deadline fired and
    /// [`ReadError::Cancelled`] when only the external signal did. A zero
    /// timeout fails without polling the source.
    pub async fn run<S>(
        &self,
        source: &mut S,
        timeout: Duration,
        external: Option<&CancelSignal>,
    ) -> ReadResult<Bytes>
    where
        S: ByteSource + ?Sized,
    {
        if timeout.is_zero() {
            return Err(ReadError::Timeout);
        }

        let deadline = CancelSignal::after(timeout);
        let stop = match external {
            Some(signal) => deadline.or(signal),
            None => deadline.clone(),
        };

        let mut buffer = BytesMut::new();
        while !stop.is_cancelled() {
            let step: ReadResult<bool> = tokio::select! {
                biased;
                _ = stop.cancelled() => Ok(false),
                done = async {
                    match source.read_available(&mut buffer).await {
                        Ok(ReadStatus::Complete) => Ok(true),
                        Ok(ReadStatus::Pending) => {
                            tokio::time::sleep(self.poll_interval).await;
                            Ok(false)
                        }
                        Err(err) => Err(err),
                    }
                } => done,
            };
            if step? {
                return Ok(buffer.freeze());
            }
        }

        if deadline.is_cancelled() {
            Err(ReadError::Timeout)
        } else {
            Err(ReadError::Cancelled)
        }
    }
}

/// Single timeout-bounded read with the default poll interval.
pub async fn run_with_timeout<S>(
    source: &mut S,
    timeout: Duration,
    external: Option<&CancelSignal>,
) -> ReadResult<Bytes>
where
    S: ByteSource + ?Sized,
{
    TimedOperation::default()
        .run(source, timeout, external)
        .await
}
