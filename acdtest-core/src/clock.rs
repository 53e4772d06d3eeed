//! Monotonic run clock
//!
//! Every timestamp in a run is expressed as seconds since the run's origin.
//! The clock is built on `tokio::time::Instant` so paused-time tests see the
//! same timeline as the scheduler.

use std::time::Duration;
use tokio::time::Instant;

/// Stand-in for deadlines too far out to represent, about 30 years
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Shared monotonic time base for one harness run
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    origin: Instant,
}

impl RunClock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the origin
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Instant `offset` after the origin, saturating to a far-future instant
    pub fn deadline_after(&self, offset: Duration) -> Instant {
        self.origin
            .checked_add(offset)
            .or_else(|| self.origin.checked_add(FAR_FUTURE))
            .unwrap_or(self.origin)
    }
}

impl Default for RunClock {
    fn default() -> Self {
        Self::start()
    }
}
