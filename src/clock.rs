//! Injectable wall clock.
//!
//! The coordinator and circuit breaker never call `SystemTime::now()`
//! directly; they hold an `Arc<dyn Clock>` so tests can drive time without
//! sleeping. Production callers use [`SystemClock`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic-enough wall clock abstraction, in whole Unix seconds.
///
/// Implementations must be cheap to call repeatedly: `allows_request()`
/// reads the clock on every invocation.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current time as Unix seconds.
    fn now(&self) -> i64;
}

/// Clock backed by the OS wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

/// A settable clock for deterministic tests (breaker timeouts, TTL expiry).
#[derive(Debug)]
pub struct TestClock(AtomicI64);

impl TestClock {
    /// Creates a test clock starting at `start` Unix seconds.
    #[must_use]
    pub const fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    /// Advances the clock by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
