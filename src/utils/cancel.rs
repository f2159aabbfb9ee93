//! Cancellation utilities
//!
//! `CancelHandle` is the write side owned by whoever may ask for a stop.
//! `CancelSignal` is the read side handed to reads and retry loops. A signal can
//! observe several sources at once (caller tokens, deadlines) and fires as soon as
//! any of them fires. Sources never revert, so neither does the signal.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Reads and retry loops observing a signal derived from
    /// this handle stop at their next suspension point. Calling this more than once
    /// has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Read-only view of this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal::from(self.token.clone())
    }
}

#[derive(Clone, Debug)]
enum Source {
    Token(CancellationToken),
    Deadline(Instant),
}

impl Source {
    fn has_fired(&self) -> bool {
        match self {
            Self::Token(token) => token.is_cancelled(),
            Self::Deadline(at) => Instant::now() >= *at,
        }
    }

    fn fired(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        match self {
            Self::Token(token) => Box::pin(token.cancelled()),
            Self::Deadline(at) => Box::pin(tokio::time::sleep_until(*at)),
        }
    }
}

/// Observed cancellation condition, composed from one or more sources with OR
/// semantics.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    sources: Arc<[Source]>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self::from_sources(vec![Source::Token(token)])
    }
}

impl From<&CancelHandle> for CancelSignal {
    fn from(handle: &CancelHandle) -> Self {
        handle.signal()
    }
}

impl CancelSignal {
    fn from_sources(sources: Vec<Source>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// A signal with no sources. It never fires.
    pub fn never() -> Self {
        Self::from_sources(Vec::new())
    }

    /// A signal that fires once `at` is reached.
    pub fn deadline(at: Instant) -> Self {
        Self::from_sources(vec![Source::Deadline(at)])
    }

    /// A signal that fires `timeout` from now. A timeout too large to represent
    /// never fires.
    pub fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => Self::deadline(at),
            None => Self::never(),
        }
    }

    /// Combine several signals: the result fires as soon as any input fires.
    pub fn any<I>(signals: I) -> Self
    where
        I: IntoIterator<Item = CancelSignal>,
    {
        let sources = signals
            .into_iter()
            .flat_map(|signal| signal.sources.iter().cloned().collect::<Vec<_>>())
            .collect();
        Self::from_sources(sources)
    }

    /// Combine this signal with `other`.
    pub fn or(&self, other: &CancelSignal) -> Self {
        Self::any([self.clone(), other.clone()])
    }

    /// Check whether any source has fired.
    pub fn is_cancelled(&self) -> bool {
        self.sources.iter().any(Source::has_fired)
    }

    /// Resolves when any source fires. Pending forever for `never()`.
    pub async fn cancelled(&self) {
        if self.sources.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.sources.iter().map(Source::fired);
        futures::future::select_all(waits).await;
    }

    /// Run `callback` once this signal fires. Dropping the returned handle does not
    /// stop the watcher; abort it to unregister.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the watcher is spawned
    /// onto the current one.
    pub fn on_cancel<F>(&self, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let signal = self.clone();
        tokio::spawn(async move {
            signal.cancelled().await;
            callback();
        })
    }
}

/// Create a standalone cancel handle that can be shared across tasks.
pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn cancel_wakes_pending_waiter_immediately() {
        let handle = new_cancel_handle();
        let signal = handle.signal();

        let waiter = tokio::spawn(async move { signal.cancelled().await });
        tokio::task::yield_now().await;

        handle.cancel();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");
    }

    #[test]
    fn cancelled_future_is_woken_by_cancel() {
        let handle = CancelHandle::new();
        let signal = handle.signal();
        let mut wait = tokio_test::task::spawn(signal.cancelled());

        tokio_test::assert_pending!(wait.poll());
        handle.cancel();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn composed_signal_fires_when_either_source_fires() {
        let first = CancelHandle::new();
        let second = CancelHandle::new();
        let composed = first.signal().or(&second.signal());

        assert!(!composed.is_cancelled());
        second.cancel();
        assert!(composed.is_cancelled());
        assert!(!first.is_cancelled());
        composed.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_signal_fires_after_timeout() {
        let signal = CancelSignal::after(Duration::from_millis(100));
        assert!(!signal.is_cancelled());

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!signal.is_cancelled());

        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn never_signal_stays_pending() {
        let signal = CancelSignal::never();
        let res = tokio::time::timeout(Duration::from_secs(3600), signal.cancelled()).await;
        assert!(res.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_is_monotonic() {
        let handle = CancelHandle::new();
        let signal = CancelSignal::any([handle.signal(), CancelSignal::never()]);
        handle.cancel();
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(signal.clone().is_cancelled());
    }

    #[tokio::test]
    async fn on_cancel_runs_callback() {
        let handle = CancelHandle::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_in_cb = fired.clone();

        let watcher = handle
            .signal()
            .on_cancel(move || fired_in_cb.store(true, Ordering::SeqCst));
        assert!(!fired.load(Ordering::SeqCst));

        handle.cancel();
        watcher.await.expect("watcher task");
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic]
    fn on_cancel_outside_runtime_panics() {
        let _ = CancelSignal::never().on_cancel(|| {});
    }
}
