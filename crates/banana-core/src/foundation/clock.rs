//! Injected sleep used by staged activation.
//!
//! Production code sleeps on the tokio timer; tests swap in [`NoDelay`],
//! which returns immediately and records what was requested.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Suspends the caller for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration` before returning.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately, counting calls and the total requested time.
#[derive(Debug, Default)]
pub struct NoDelay {
    calls: AtomicUsize,
    requested_ms: AtomicU64,
}

impl NoDelay {
    /// Creates a sleeper with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `sleep` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sum of all requested durations.
    pub fn requested(&self) -> Duration {
        Duration::from_millis(self.requested_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Sleeper for NoDelay {
    async fn sleep(&self, duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.requested_ms.fetch_add(ms, Ordering::SeqCst);
    }
}
