//! Injectable wall clock.
//!
//! Everything in the core reads time through [`Clock`] so tests can pin or
//! jump the clock without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Source of epoch-millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Hands out strictly increasing timestamps on top of another clock.
///
/// Two notes saved within the same millisecond still get distinct,
/// ordered `updatedAt` values.
#[derive(Debug, Default)]
pub struct MonotonicStamp {
    last: Mutex<i64>,
}

impl MonotonicStamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, clock: &dyn Clock) -> i64 {
        let now = clock.now_ms();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stamp = if now > *last { now } else { *last + 1 };
        *last = stamp;
        stamp
    }
}
