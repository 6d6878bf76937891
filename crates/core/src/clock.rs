// SPDX-License-Identifier: MIT

//! Clock abstraction for deterministic time in tests.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the scheduler.
///
/// Production code uses [`SystemClock`]; tests use [`FakeClock`] so that
/// heartbeat timeouts and update intervals can be driven without sleeping.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic now, for deadlines and timeouts.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, for persisted records.
    fn epoch_ms(&self) -> u64;
}

/// Real system time.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct FakeClock {
    inner: std::sync::Arc<parking_lot::Mutex<FakeClockState>>,
}

#[cfg(any(test, feature = "test-support"))]
struct FakeClockState {
    now: Instant,
    epoch_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(parking_lot::Mutex::new(FakeClockState {
                now: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock();
        state.now += by;
        state.epoch_ms += by.as_millis() as u64;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
