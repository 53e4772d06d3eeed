//! Capture statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of what the capture thread has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames handed to us by pcap
    pub frames_received: u64,
    /// Frames that parsed as Ethernet/IPv4 ARP
    pub frames_parsed: u64,
    /// Frames that did not parse (non-ARP, truncated, other address family)
    pub parse_errors: u64,
    /// Total bytes received
    pub bytes_received: u64,
}

impl CaptureStats {
    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {} frames ({} bytes), parsed: {}, unparsable: {}",
            self.frames_received, self.bytes_received, self.frames_parsed, self.parse_errors
        )
    }
}

/// Thread-safe statistics accumulator for live capture
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    frames_received: Arc<AtomicU64>,
    frames_parsed: Arc<AtomicU64>,
    parse_errors: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a received frame and whether it parsed
    pub fn record_frame(&self, size: usize, parsed: bool) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(size as u64, Ordering::Relaxed);
        if parsed {
            self.frames_parsed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.parse_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_parsed: self.frames_parsed.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}
