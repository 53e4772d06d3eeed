//! Run configuration
//!
//! A [`RunConfig`] is fixed before capture starts and never changes during a
//! run. Every threshold the phase inference and the verifier use lives here.

use crate::phase::PhasePolicy;
use crate::scheduler::StimulusSchedule;
use crate::timing::Verifier;
use acdtest_arp::{ArpOpcode, ClassifyTarget};
use acdtest_core::{Error, MacAddr, Result};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Expected delay between retry attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10_000;

/// Expected number of attempts before the device gives up (0 = unlimited)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_DURATION_SECS: u64 = 120;

/// Relative tolerance applied to every retry interval
pub const DEFAULT_TOLERANCE: f64 = 0.2;

/// Probe gap above which a probe starts a new attempt
pub const ATTEMPT_BOUNDARY_MS: f64 = 5000.0;

/// Upper bound for an acceptable first-conflict-to-retreat latency
pub const RETREAT_WINDOW_SECS: f64 = 15.0;

/// Minimum share of matching intervals for a passing timing verdict
pub const ACCURACY_THRESHOLD_PERCENT: f64 = 80.0;

/// Configuration of one harness run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Address the device acquires and defends
    pub protected_ip: Ipv4Addr,
    /// Device-under-test MAC
    pub device_mac: MacAddr,
    /// Interface to capture and inject on
    pub interface: String,
    pub expected_retry_delay_ms: u64,
    /// 0 means unlimited
    pub max_attempts: u32,
    pub duration: Duration,
    pub tolerance: f64,
    /// Let the device acquire, then attack it in the ongoing phase
    pub test_ongoing: bool,
    /// Opcode of ongoing-phase announcement conflicts
    pub announce_op: ArpOpcode,
    pub attempt_boundary_ms: f64,
    pub schedule: StimulusSchedule,
}

impl RunConfig {
    /// Configuration with every optional setting at its default
    pub fn new(protected_ip: Ipv4Addr, device_mac: MacAddr, interface: impl Into<String>) -> Self {
        Self {
            protected_ip,
            device_mac,
            interface: interface.into(),
            expected_retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            tolerance: DEFAULT_TOLERANCE,
            test_ongoing: false,
            announce_op: ArpOpcode::Reply,
            attempt_boundary_ms: ATTEMPT_BOUNDARY_MS,
            schedule: StimulusSchedule::default(),
        }
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.expected_retry_delay_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_ongoing_test(mut self, enabled: bool) -> Self {
        self.test_ongoing = enabled;
        self
    }

    pub fn with_announce_op(mut self, op: ArpOpcode) -> Self {
        self.announce_op = op;
        self
    }

    pub fn with_attempt_boundary_ms(mut self, ms: f64) -> Self {
        self.attempt_boundary_ms = ms;
        self
    }

    pub fn with_schedule(mut self, schedule: StimulusSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Reject configurations the harness cannot measure against
    pub fn validate(&self) -> Result<()> {
        if self.interface.trim().is_empty() {
            return Err(Error::invalid_parameter("interface", "must not be empty"));
        }
        if self.expected_retry_delay_ms == 0 {
            return Err(Error::invalid_parameter("retry-delay", "must be greater than zero"));
        }
        if self.duration.is_zero() {
            return Err(Error::invalid_parameter("duration", "must be greater than zero"));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(Error::invalid_parameter(
                "tolerance",
                format!("{} is outside (0, 1)", self.tolerance),
            ));
        }
        if !(self.attempt_boundary_ms > 0.0) {
            return Err(Error::invalid_parameter(
                "attempt-boundary",
                "must be greater than zero",
            ));
        }
        if !matches!(self.announce_op, ArpOpcode::Request | ArpOpcode::Reply) {
            return Err(Error::invalid_parameter(
                "announce-op",
                "announcements must be ARP requests or replies",
            ));
        }
        Ok(())
    }

    /// Classifier view of the target
    pub fn classify_target(&self) -> ClassifyTarget {
        ClassifyTarget::new(self.protected_ip, self.device_mac)
    }

    /// State machine view of the configuration
    pub fn policy(&self) -> PhasePolicy {
        PhasePolicy {
            attempt_boundary_ms: self.attempt_boundary_ms,
            ongoing_test: self.test_ongoing,
            max_attempts: self.max_attempts,
        }
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.expected_retry_delay_ms as f64, self.tolerance)
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target IP: {}", self.protected_ip)?;
        writeln!(f, "Device MAC: {}", self.device_mac)?;
        writeln!(f, "Interface: {}", self.interface)?;
        writeln!(
            f,
            "Expected Retry Delay: {}ms ({:.1}s)",
            self.expected_retry_delay_ms,
            self.expected_retry_delay_ms as f64 / 1000.0
        )?;
        if self.max_attempts > 0 {
            writeln!(f, "Max Attempts: {}", self.max_attempts)?;
        } else {
            writeln!(f, "Max Attempts: Unlimited")?;
        }
        writeln!(f, "Test Duration: {}s", self.duration.as_secs())?;
        write!(
            f,
            "Test Ongoing Phase: {}",
            if self.test_ongoing {
                "Yes"
            } else {
                "No (probe phase only)"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::new(
            Ipv4Addr::new(172, 16, 82, 100),
            "30:ed:a0:e3:34:c1".parse().unwrap(),
            "eth0",
        )
    }

    #[test]
    fn test_defaults() {
        let c = config();
        assert_eq!(c.expected_retry_delay_ms, 10_000);
        assert_eq!(c.max_attempts, 5);
        assert_eq!(c.duration, Duration::from_secs(120));
        assert_eq!(c.tolerance, 0.2);
        assert_eq!(c.attempt_boundary_ms, 5000.0);
        assert!(!c.test_ongoing);
        assert_eq!(c.announce_op, ArpOpcode::Reply);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_delay_and_duration() {
        assert!(config().with_retry_delay_ms(0).validate().is_err());
        assert!(config().with_duration(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_rarp_announcements() {
        let err = config()
            .with_announce_op(ArpOpcode::RarpReply)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("announce-op"));
    }

    #[test]
    fn test_validate_rejects_empty_interface() {
        let mut c = config();
        c.interface = "  ".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_policy_mirrors_config() {
        let c = config().with_max_attempts(3).with_ongoing_test(true);
        let policy = c.policy();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.ongoing_test);
        assert_eq!(policy.attempt_boundary_ms, 5000.0);
    }

    #[test]
    fn test_display_unlimited_attempts() {
        let text = config().with_max_attempts(0).to_string();
        assert!(text.contains("Max Attempts: Unlimited"));
        assert!(text.contains("Device MAC: 30:ed:a0:e3:34:c1"));
    }
}
