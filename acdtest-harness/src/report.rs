//! Final report rendering

use crate::config::{RunConfig, ACCURACY_THRESHOLD_PERCENT, RETREAT_WINDOW_SECS};
use crate::phase::PhaseState;
use crate::timing::{retreat_within_window, TimingRecord};
use acdtest_capture::CaptureStats;
use acdtest_core::MacAddr;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

const RULE_WIDTH: usize = 70;

/// Why the run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    DurationElapsed,
    Interrupted,
    MaxAttemptsReached,
    /// The capture stream ended
    CaptureEnded,
    /// A send or capture failure ended the run early
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::DurationElapsed => write!(f, "test duration elapsed"),
            StopReason::Interrupted => write!(f, "interrupted by user"),
            StopReason::MaxAttemptsReached => write!(f, "maximum attempts reached"),
            StopReason::CaptureEnded => write!(f, "capture ended"),
            StopReason::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Frames the injector put on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionCounters {
    /// Every conflict frame, reply or announcement
    pub conflicts_sent: u64,
    /// Ongoing-phase announcement conflicts only
    pub announcements_sent: u64,
}

/// Snapshot of a finished run
#[derive(Debug, Clone)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub config: RunConfig,
    pub state: PhaseState,
    pub record: TimingRecord,
    pub counters: InjectionCounters,
    pub adversary_mac: MacAddr,
    pub stop_reason: StopReason,
    /// Seconds from the first probe to the stop
    pub elapsed: f64,
    pub capture_stats: Option<CaptureStats>,
}

impl Report {
    pub fn with_capture_stats(mut self, stats: CaptureStats) -> Self {
        self.capture_stats = Some(stats);
        self
    }

    /// No probe was ever seen from the device
    pub fn is_empty(&self) -> bool {
        self.record.probes().is_empty()
    }

    /// Attempts reached `max_attempts`; `None` when attempts are unlimited
    pub fn attempts_verdict(&self) -> Option<bool> {
        (self.config.max_attempts > 0)
            .then(|| self.state.current_attempt >= self.config.max_attempts)
    }

    fn write_no_data(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "WARNING: No ARP probes detected from the device!")?;
        writeln!(f)?;
        writeln!(f, "Possible issues:")?;
        writeln!(f, "  - Device MAC address incorrect")?;
        writeln!(f, "  - Device not configured for static IP")?;
        writeln!(f, "  - ACD not enabled")?;
        writeln!(f, "  - Device not attempting to acquire IP")?;
        writeln!(f, "  - Network interface incorrect")?;
        writeln!(f)?;
        writeln!(f, "Stop Reason: {}", self.stop_reason)?;
        if let Some(stats) = &self.capture_stats {
            writeln!(f, "Capture: {}", stats.format())?;
        }
        Ok(())
    }

    fn write_ongoing(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "Yes" } else { "No" };

        writeln!(f)?;
        writeln!(f, "Ongoing Phase Test Results:")?;
        writeln!(f, "  IP Acquired: {}", yes_no(self.state.ever_acquired()))?;
        if let Some(latency) = self.record.acquisition_latency() {
            writeln!(f, "  Time to Acquisition: {:.1}s", latency)?;
        }
        writeln!(f, "  Defensive ARPs Detected: {}", self.state.defensive_arps)?;
        writeln!(f, "  Ongoing Conflicts Sent: {}", self.counters.announcements_sent)?;
        writeln!(f, "  Retreat Detected: {}", yes_no(self.state.retreat_detected))?;
        if let Some(latency) = self.record.retreat_latency() {
            writeln!(f, "  Time from First Conflict to Retreat: {:.1}s", latency)?;
            if retreat_within_window(latency) {
                writeln!(
                    f,
                    "  [OK] Retreat occurred within expected timeframe (<= {:.0}s)",
                    RETREAT_WINDOW_SECS
                )?;
            } else {
                writeln!(f, "  [WARN] Retreat timing may be unexpected")?;
            }
        }
        Ok(())
    }

    fn write_intervals(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(stats) = self.record.interval_stats() else {
            return Ok(());
        };

        writeln!(f)?;
        writeln!(f, "Retry Intervals (ms):")?;
        for (i, interval) in self.record.intervals().iter().enumerate() {
            let mark = if interval.matched { "[OK]" } else { "[FAIL]" };
            writeln!(f, "  Interval {}: {:.0}ms {}", i + 1, interval.interval_ms, mark)?;
        }

        writeln!(f)?;
        writeln!(f, "Retry Interval Statistics:")?;
        writeln!(f, "  Average: {:.0}ms", stats.mean_ms)?;
        writeln!(f, "  Minimum: {:.0}ms", stats.min_ms)?;
        writeln!(f, "  Maximum: {:.0}ms", stats.max_ms)?;
        writeln!(f, "  Expected: {}ms", self.config.expected_retry_delay_ms)?;

        writeln!(f)?;
        writeln!(
            f,
            "Retry Timing Accuracy: {}/{} intervals match ({:.1}%)",
            stats.matches,
            stats.count,
            stats.accuracy_percent()
        )?;
        if stats.passes() {
            writeln!(f, "  [OK] Retry logic appears to be working correctly")?;
        } else {
            writeln!(
                f,
                "  [FAIL] Retry timing does not match expected delay (needs {:.0}%)",
                ACCURACY_THRESHOLD_PERCENT
            )?;
        }
        Ok(())
    }

    fn write_probe_sequence(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.record.probes().len() <= 3 {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "Probe Sequence Analysis:")?;
        for summary in self.record.attempt_summaries() {
            if let Some(spacing) = summary.mean_spacing_ms {
                writeln!(
                    f,
                    "  Attempt #{}: {} probes, avg interval: {:.0}ms",
                    summary.attempt, summary.probes, spacing
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "{}", rule)?;
        writeln!(f, "TEST REPORT")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Run ID: {}", self.run_id)?;
        writeln!(
            f,
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", self.config)?;
        writeln!(f, "Conflict MAC: {}", self.adversary_mac)?;

        if self.is_empty() {
            self.write_no_data(f)?;
            return write!(f, "\n{}", rule);
        }

        writeln!(f)?;
        writeln!(f, "Test Duration: {:.1}s", self.elapsed)?;
        writeln!(f, "Stop Reason: {}", self.stop_reason)?;
        writeln!(f)?;
        writeln!(f, "Total Probes Detected: {}", self.record.probes().len())?;
        writeln!(f, "Conflicts Triggered: {}", self.counters.conflicts_sent)?;
        writeln!(f, "Retry Attempts Detected: {}", self.state.current_attempt)?;
        writeln!(f, "Defensive ARPs Detected: {}", self.state.defensive_arps)?;

        if self.config.test_ongoing {
            self.write_ongoing(f)?;
        }

        self.write_intervals(f)?;

        match self.attempts_verdict() {
            Some(true) => {
                writeln!(f)?;
                writeln!(
                    f,
                    "[OK] Maximum attempts ({}) reached as expected",
                    self.config.max_attempts
                )?;
            }
            Some(false) => {
                writeln!(f)?;
                writeln!(
                    f,
                    "[WARN] Only {} attempts detected (expected {})",
                    self.state.current_attempt, self.config.max_attempts
                )?;
                writeln!(f, "  (Test may have ended before max attempts reached)")?;
            }
            None => {}
        }

        self.write_probe_sequence(f)?;

        if let Some(stats) = &self.capture_stats {
            writeln!(f)?;
            writeln!(f, "Capture: {}", stats.format())?;
        }

        write!(f, "\n{}", rule)
    }
}
