//! Timing record and verification
//!
//! The [`TimingRecord`] is append-only: probes and inter-attempt intervals are
//! added as the run progresses and never rewritten. Each interval is judged
//! against the expected retry delay by a [`Verifier`] the moment it is
//! recorded.

use crate::config::{ACCURACY_THRESHOLD_PERCENT, RETREAT_WINDOW_SECS};
use std::collections::BTreeMap;

/// One processed probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeRecord {
    /// Seconds since the run clock origin
    pub timestamp: f64,
    pub attempt: u32,
}

/// Gap between the last probe of one attempt and the first of the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalRecord {
    pub interval_ms: f64,
    pub matched: bool,
}

/// Tolerance check for retry intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verifier {
    expected_ms: f64,
    tolerance: f64,
}

impl Verifier {
    pub fn new(expected_ms: f64, tolerance: f64) -> Self {
        Self {
            expected_ms,
            tolerance,
        }
    }

    pub fn expected_ms(&self) -> f64 {
        self.expected_ms
    }

    /// Allowed absolute deviation in milliseconds
    pub fn allowed_deviation_ms(&self) -> f64 {
        self.expected_ms * self.tolerance
    }

    /// `|interval - expected| <= tolerance * expected`
    pub fn matches(&self, interval_ms: f64) -> bool {
        (interval_ms - self.expected_ms).abs() <= self.allowed_deviation_ms()
    }
}

/// Retreat latency must be positive and at most the retreat window
pub fn retreat_within_window(latency_secs: f64) -> bool {
    latency_secs > 0.0 && latency_secs <= RETREAT_WINDOW_SECS
}

/// Aggregate view over the recorded intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStats {
    pub count: usize,
    pub matches: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
}

impl IntervalStats {
    pub fn accuracy_percent(&self) -> f64 {
        self.matches as f64 / self.count as f64 * 100.0
    }

    /// At least 80 % of intervals within tolerance
    pub fn passes(&self) -> bool {
        self.accuracy_percent() >= ACCURACY_THRESHOLD_PERCENT
    }
}

/// Probes belonging to one attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptSummary {
    pub attempt: u32,
    pub probes: usize,
    /// Mean spacing between consecutive probes, when there are at least two
    pub mean_spacing_ms: Option<f64>,
}

/// Probe and interval history of one run
#[derive(Debug, Clone)]
pub struct TimingRecord {
    verifier: Verifier,
    probes: Vec<ProbeRecord>,
    intervals: Vec<IntervalRecord>,
    acquisition_latency: Option<f64>,
    retreat_latency: Option<f64>,
}

impl TimingRecord {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier,
            probes: Vec::new(),
            intervals: Vec::new(),
            acquisition_latency: None,
            retreat_latency: None,
        }
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn record_probe(&mut self, timestamp: f64, attempt: u32) {
        self.probes.push(ProbeRecord { timestamp, attempt });
    }

    /// Append an interval and return its verdict
    pub fn record_interval(&mut self, interval_ms: f64) -> IntervalRecord {
        let record = IntervalRecord {
            interval_ms,
            matched: self.verifier.matches(interval_ms),
        };
        self.intervals.push(record);
        record
    }

    /// Keeps the first acquisition latency of the run
    pub fn set_acquisition_latency(&mut self, secs: f64) {
        self.acquisition_latency.get_or_insert(secs);
    }

    /// Keeps the first retreat latency of the run
    pub fn set_retreat_latency(&mut self, secs: f64) {
        self.retreat_latency.get_or_insert(secs);
    }

    pub fn probes(&self) -> &[ProbeRecord] {
        &self.probes
    }

    pub fn intervals(&self) -> &[IntervalRecord] {
        &self.intervals
    }

    pub fn acquisition_latency(&self) -> Option<f64> {
        self.acquisition_latency
    }

    pub fn retreat_latency(&self) -> Option<f64> {
        self.retreat_latency
    }

    /// `None` until at least one interval exists
    pub fn interval_stats(&self) -> Option<IntervalStats> {
        if self.intervals.is_empty() {
            return None;
        }

        let values = self.intervals.iter().map(|i| i.interval_ms);
        let min_ms = values.clone().fold(f64::INFINITY, f64::min);
        let max_ms = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean_ms = values.sum::<f64>() / self.intervals.len() as f64;

        Some(IntervalStats {
            count: self.intervals.len(),
            matches: self.intervals.iter().filter(|i| i.matched).count(),
            min_ms,
            max_ms,
            mean_ms,
        })
    }

    /// Probes grouped by attempt, in attempt order
    pub fn attempt_summaries(&self) -> Vec<AttemptSummary> {
        let mut by_attempt: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for probe in &self.probes {
            by_attempt
                .entry(probe.attempt)
                .or_default()
                .push(probe.timestamp);
        }

        by_attempt
            .into_iter()
            .map(|(attempt, times)| {
                let mean_spacing_ms = (times.len() >= 2).then(|| {
                    let total: f64 = times.windows(2).map(|w| (w[1] - w[0]) * 1000.0).sum();
                    total / (times.len() - 1) as f64
                });
                AttemptSummary {
                    attempt,
                    probes: times.len(),
                    mean_spacing_ms,
                }
            })
            .collect()
    }
}
