//! Ongoing-phase stimulus scheduling
//!
//! Once the device has acquired the address, the scheduler runs a fixed
//! script on its own task: wait for the device to settle, claim the address
//! from the adversary, wait less than the defend interval, claim it again.
//! The second claim inside the defend interval is what should make the device
//! retreat.

use crate::run::HarnessInput;
use acdtest_arp::ConflictInjector;
use acdtest_core::RunClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Delay between acquisition and the first conflict
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// Delay between the first and second conflicts
pub const DEFAULT_FOLLOW_UP: Duration = Duration::from_secs(5);

/// Timing of the two-conflict script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusSchedule {
    pub settle: Duration,
    pub follow_up: Duration,
}

impl Default for StimulusSchedule {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            follow_up: DEFAULT_FOLLOW_UP,
        }
    }
}

/// Runs the conflict script at most once per run
pub struct StimulusScheduler {
    injector: Arc<ConflictInjector>,
    clock: RunClock,
    schedule: StimulusSchedule,
    started: AtomicBool,
}

impl StimulusScheduler {
    pub fn new(injector: Arc<ConflictInjector>, clock: RunClock, schedule: StimulusSchedule) -> Self {
        Self {
            injector,
            clock,
            schedule,
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawn the script; returns `None` if it already ran this run
    ///
    /// The task reports the first conflict's timestamp, or a transmit
    /// failure, on `inputs` so the run loop sees it in order with captured
    /// frames.
    pub fn trigger(&self, inputs: UnboundedSender<HarnessInput>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }

        let injector = Arc::clone(&self.injector);
        let clock = self.clock;
        let schedule = self.schedule;

        Some(tokio::spawn(async move {
            info!(
                settle_ms = schedule.settle.as_millis() as u64,
                "Starting ongoing phase defense test"
            );
            tokio::time::sleep(schedule.settle).await;

            let at = clock.now();
            info!(at_secs = at, "Sending first conflict (should be defended)");
            if let Err(e) = injector.send_announcement_conflict() {
                error!(error = %e, "First conflict failed");
                let _ = inputs.send(HarnessInput::StimulusFailed(e.to_string()));
                return;
            }
            let _ = inputs.send(HarnessInput::ConflictInjected { at });

            tokio::time::sleep(schedule.follow_up).await;

            info!(
                at_secs = clock.now(),
                "Sending second conflict within defend interval (should trigger retreat)"
            );
            if let Err(e) = injector.send_announcement_conflict() {
                error!(error = %e, "Second conflict failed");
                let _ = inputs.send(HarnessInput::StimulusFailed(e.to_string()));
                return;
            }

            info!("Monitoring for retreat");
        }))
    }
}
