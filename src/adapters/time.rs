//! Monotonic time adapter backed by `std::time::Instant`.

use std::time::Instant;

use crate::app::ports::Clock;

/// Milliseconds and seconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since start (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
