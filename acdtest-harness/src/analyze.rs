//! Offline interval analysis over captured or hand-collected timestamps
//!
//! Useful for measuring a reference device's retry spacing from a capture
//! taken elsewhere, to pick the expected delay for a harness run. Captures
//! come in as Wireshark CSV exports (File > Export Packet Dissections > As CSV).

use acdtest_core::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Intervals within this fraction of the mean count as consistent
pub const CONSISTENCY_FRACTION: f64 = 0.1;

/// Interval statistics over a sorted timestamp series, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalAnalysis {
    pub timestamps: Vec<f64>,
    pub intervals: Vec<f64>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl IntervalAnalysis {
    /// Sorts the timestamps; needs at least two
    pub fn from_timestamps(mut timestamps: Vec<f64>) -> Result<Self> {
        if timestamps.iter().any(|t| !t.is_finite()) {
            return Err(Error::invalid_parameter("timestamps", "must be finite numbers"));
        }
        if timestamps.len() < 2 {
            return Err(Error::invalid_parameter(
                "timestamps",
                "need at least 2 timestamps to calculate intervals",
            ));
        }
        timestamps.sort_by(f64::total_cmp);

        let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let min = intervals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = intervals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            timestamps,
            intervals,
            mean,
            min,
            max,
        })
    }

    /// Timestamps from a Wireshark CSV export
    ///
    /// Reads the `Time` column, falling back to `Time (relative)`. Rows whose
    /// time does not parse are skipped. `mac_filter` keeps only rows whose
    /// `Source` contains it, case-insensitively, so a vendor prefix works.
    pub fn from_csv<R: Read>(reader: R, mac_filter: Option<&str>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers().map_err(csv_error)?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let time = column("Time");
        let relative = column("Time (relative)");
        let source = column("Source");
        let filter = mac_filter
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase);

        let mut timestamps = Vec::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            if let Some(filter) = &filter {
                let source = source.and_then(|i| record.get(i)).unwrap_or("");
                if !source.to_lowercase().contains(filter.as_str()) {
                    continue;
                }
            }

            let field = |i: Option<usize>| i.and_then(|i| record.get(i)).filter(|v| !v.is_empty());
            match field(time)
                .or_else(|| field(relative))
                .and_then(|v| v.trim().parse::<f64>().ok())
            {
                Some(t) if t.is_finite() => timestamps.push(t),
                _ => skipped += 1,
            }
        }
        debug!(matched = timestamps.len(), skipped, "Read CSV export");

        if timestamps.is_empty() {
            return Err(Error::invalid_parameter("csv-file", "no matching packets found"));
        }
        Self::from_timestamps(timestamps)
    }

    /// [`IntervalAnalysis::from_csv`] over a file on disk
    pub fn from_csv_file<P: AsRef<Path>>(path: P, mac_filter: Option<&str>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv(file, mac_filter)
    }

    pub fn duration(&self) -> f64 {
        self.timestamps[self.timestamps.len() - 1] - self.timestamps[0]
    }

    /// Every interval strictly within 10 % of the mean
    pub fn is_consistent(&self) -> bool {
        self.mean > 0.0
            && self
                .intervals
                .iter()
                .all(|i| (i - self.mean).abs() / self.mean < CONSISTENCY_FRACTION)
    }
}

impl fmt::Display for IntervalAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analyzed {} packets", self.timestamps.len())?;
        writeln!(
            f,
            "Time range: {:.3}s to {:.3}s",
            self.timestamps[0],
            self.timestamps[self.timestamps.len() - 1]
        )?;
        writeln!(f, "Total duration: {:.3}s", self.duration())?;
        writeln!(f)?;
        writeln!(f, "Intervals between packets:")?;
        for (i, interval) in self.intervals.iter().enumerate() {
            writeln!(
                f,
                "  Interval {}: {:.3}s ({:.0}ms)",
                i + 1,
                interval,
                interval * 1000.0
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Average interval: {:.3}s ({:.0}ms)", self.mean, self.mean * 1000.0)?;
        writeln!(f, "  Minimum interval: {:.3}s ({:.0}ms)", self.min, self.min * 1000.0)?;
        writeln!(f, "  Maximum interval: {:.3}s ({:.0}ms)", self.max, self.max * 1000.0)?;
        writeln!(f)?;
        if self.is_consistent() {
            write!(
                f,
                "[OK] Intervals are consistent - recommended value: {:.0}ms",
                self.mean * 1000.0
            )
        } else {
            write!(f, "[WARN] Intervals vary significantly - may need to investigate")
        }
    }
}

fn csv_error(e: csv::Error) -> Error {
    Error::parsing(format!("CSV export: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
\"No.\",\"Time\",\"Source\",\"Destination\",\"Protocol\",\"Length\",\"Info\"
\"1\",\"10.811\",\"08:89:61:e3:34:c1\",\"ff:ff:ff:ff:ff:ff\",\"ARP\",\"60\",\"Who has 172.16.82.100? Tell 0.0.0.0\"
\"2\",\"12.004\",\"02:aa:bb:cc:dd:ee\",\"08:89:61:e3:34:c1\",\"ARP\",\"42\",\"172.16.82.100 is at 02:aa:bb:cc:dd:ee\"
\"3\",\"50.234\",\"08:89:61:E3:34:C1\",\"ff:ff:ff:ff:ff:ff\",\"ARP\",\"60\",\"Who has 172.16.82.100? Tell 0.0.0.0\"
\"4\",\"\",\"08:89:61:e3:34:c1\",\"ff:ff:ff:ff:ff:ff\",\"ARP\",\"60\",\"truncated row\"
\"5\",\"90.456\",\"08:89:61:e3:34:c1\",\"ff:ff:ff:ff:ff:ff\",\"ARP\",\"60\",\"Who has 172.16.82.100? Tell 0.0.0.0\"
";

    #[test]
    fn test_csv_with_mac_prefix_filter() {
        let a = IntervalAnalysis::from_csv(EXPORT.as_bytes(), Some("08:89:61")).unwrap();
        assert_eq!(a.timestamps, vec![10.811, 50.234, 90.456]);
        assert_eq!(a.intervals.len(), 2);
    }

    #[test]
    fn test_csv_without_filter_keeps_every_timed_row() {
        let a = IntervalAnalysis::from_csv(EXPORT.as_bytes(), None).unwrap();
        assert_eq!(a.timestamps, vec![10.811, 12.004, 50.234, 90.456]);

        let empty_filter = IntervalAnalysis::from_csv(EXPORT.as_bytes(), Some("")).unwrap();
        assert_eq!(empty_filter.timestamps, a.timestamps);
    }

    #[test]
    fn test_csv_relative_time_column() {
        let export = "No.,Time (relative),Source\n1,0.000,08:89:61:00:00:01\n2,40.125,08:89:61:00:00:01\n";
        let a = IntervalAnalysis::from_csv(export.as_bytes(), None).unwrap();
        assert_eq!(a.timestamps, vec![0.0, 40.125]);
        assert_eq!(a.intervals, vec![40.125]);
    }

    #[test]
    fn test_csv_no_matching_packets() {
        let err = IntervalAnalysis::from_csv(EXPORT.as_bytes(), Some("00:1d:9c")).unwrap_err();
        assert!(err.to_string().contains("no matching packets found"));
    }

    #[test]
    fn test_csv_single_match_needs_more() {
        let err = IntervalAnalysis::from_csv(EXPORT.as_bytes(), Some("02:aa")).unwrap_err();
        assert!(err.to_string().contains("at least 2 timestamps"));
    }

    #[test]
    fn test_csv_missing_file_is_io_error() {
        let err = IntervalAnalysis::from_csv_file("/nonexistent/export.csv", None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_needs_two_timestamps() {
        assert!(IntervalAnalysis::from_timestamps(vec![]).is_err());
        assert!(IntervalAnalysis::from_timestamps(vec![1.0]).is_err());
    }

    #[test]
    fn test_rejects_nan() {
        assert!(IntervalAnalysis::from_timestamps(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_consistent_series() {
        let a = IntervalAnalysis::from_timestamps(vec![50.0, 10.0, 90.0, 130.0]).unwrap();
        assert_eq!(a.timestamps, vec![10.0, 50.0, 90.0, 130.0]);
        assert_eq!(a.intervals, vec![40.0, 40.0, 40.0]);
        assert_eq!(a.mean, 40.0);
        assert_eq!(a.duration(), 120.0);
        assert!(a.is_consistent());
        assert!(a.to_string().contains("recommended value: 40000ms"));
    }

    #[test]
    fn test_inconsistent_series() {
        let a = IntervalAnalysis::from_timestamps(vec![0.0, 10.0, 30.0]).unwrap();
        assert_eq!(a.min, 10.0);
        assert_eq!(a.max, 20.0);
        assert!(!a.is_consistent());
        assert!(a.to_string().contains("[WARN]"));
    }

    #[test]
    fn test_identical_timestamps_are_not_consistent() {
        let a = IntervalAnalysis::from_timestamps(vec![5.0, 5.0]).unwrap();
        assert!(!a.is_consistent());
    }
}
