//! Time source for expiry and backoff decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time.
///
/// Cache expiry and retry bookkeeping read time through this trait so tests
/// can drive the clock by hand instead of sleeping.
pub trait Clock: Send + Sync + 'static {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Anchored at creation time; [`ManualClock::advance`] pushes the reported
/// instant forward by the given amount. Clones share the offset, so a test
/// holds one handle and hands another to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    anchor: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock anchored at the current instant with a zero offset.
    pub fn new() -> Self {
        Self { anchor: Instant::now(), offset_nanos: Arc::new(AtomicU64::new(0)) }
    }

    /// Push the reported instant forward by `step`.
    pub fn advance(&self, step: Duration) {
        self.offset_nanos.fetch_add(step.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Total amount the clock has been advanced.
    pub fn offset(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.anchor + self.offset()
    }
}
