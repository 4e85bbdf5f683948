//! Wall-clock measurement for a single run
//!
//! A `Stopwatch` is started right before launch and read right after the
//! wait returns. It is a plain value handed from the launch stage to the
//! statistics stage, so there is no shared timer state.

use std::time::{Duration, Instant};

/// Monotonic stopwatch started at launch
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in whole microseconds, saturating at `u64::MAX`
    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
