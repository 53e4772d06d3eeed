//! CLI argument parsing

use acdtest_arp::ArpOpcode;
use acdtest_core::{MacAddr, Result};
use acdtest_harness::config::{
    ATTEMPT_BOUNDARY_MS, DEFAULT_DURATION_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
};
use acdtest_harness::{AnnounceOptions, RunConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "acdtest")]
#[command(version, about = "Address Conflict Detection retry-timing test harness", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Opcode for announcement conflicts
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOp {
    Request,
    Reply,
}

impl From<AnnounceOp> for ArpOpcode {
    fn from(op: AnnounceOp) -> Self {
        match op {
            AnnounceOp::Request => ArpOpcode::Request,
            AnnounceOp::Reply => ArpOpcode::Reply,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure a device's ACD retry timing by forcing conflicts on its probes
    RetryTiming {
        /// Address the device tries to acquire
        #[arg(long)]
        ip: Ipv4Addr,

        /// MAC address of the device under test (XX:XX:XX:XX:XX:XX)
        #[arg(long)]
        device_mac: String,

        /// Network interface name
        #[arg(short, long)]
        interface: String,

        /// Expected retry delay in milliseconds
        #[arg(long, value_name = "MS", default_value_t = DEFAULT_RETRY_DELAY_MS)]
        retry_delay: u64,

        /// Expected number of attempts (0 = unlimited)
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Test duration in seconds
        #[arg(short, long, value_name = "SECONDS", default_value_t = DEFAULT_DURATION_SECS)]
        duration: u64,

        /// Let the device acquire, then test ongoing-phase defense and retreat
        #[arg(long)]
        test_ongoing: bool,

        /// Opcode of ongoing-phase conflict announcements
        #[arg(long, value_enum, default_value_t = AnnounceOp::Reply)]
        announce_op: AnnounceOp,

        /// Probe gap in milliseconds that starts a new attempt
        #[arg(long, value_name = "MS", default_value_t = ATTEMPT_BOUNDARY_MS)]
        attempt_boundary_ms: f64,
    },

    /// List available network interfaces
    Interfaces,

    /// Claim an address with gratuitous ARP announcements
    Announce {
        /// Address to claim
        #[arg(long)]
        ip: Ipv4Addr,

        /// Network interface name
        #[arg(short, long)]
        interface: String,

        /// MAC address to claim it from (default: random locally administered)
        #[arg(long)]
        mac: Option<String>,

        /// Number of announcements to send
        #[arg(short, long, default_value_t = 1)]
        count: u32,

        /// Seconds between announcements
        #[arg(long, value_name = "SECONDS", default_value_t = 2.0)]
        interval: f64,

        /// Send until interrupted
        #[arg(long)]
        continuous: bool,

        /// ARP opcode of the announcements
        #[arg(long, value_enum, default_value_t = AnnounceOp::Request)]
        announce_op: AnnounceOp,
    },

    /// Answer every probe for an address with a conflict reply
    Respond {
        /// Address to defend
        #[arg(long)]
        ip: Ipv4Addr,

        /// Network interface name
        #[arg(short, long)]
        interface: String,

        /// MAC address to reply from (default: random locally administered)
        #[arg(long)]
        mac: Option<String>,

        /// How long to listen, in seconds
        #[arg(short, long, value_name = "SECONDS", default_value_t = 60)]
        duration: u64,
    },

    /// Interval statistics from a Wireshark CSV export or manual timestamps
    Analyze {
        /// Wireshark CSV export (File > Export Packet Dissections > As CSV)
        #[arg(
            value_name = "CSV_FILE",
            required_unless_present = "timestamps",
            conflicts_with = "timestamps"
        )]
        csv_file: Option<PathBuf>,

        /// Packet timestamps in seconds, instead of a CSV export
        #[arg(long, value_name = "TIMESTAMP", num_args = 1.., allow_negative_numbers = true)]
        timestamps: Vec<f64>,

        /// Keep only rows whose Source contains this (partial MAC, e.g. 08:89:61)
        #[arg(long, requires = "csv_file")]
        mac: Option<String>,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parse an optional MAC argument
pub fn parse_optional_mac(mac: Option<&str>) -> Result<Option<MacAddr>> {
    mac.map(str::parse::<MacAddr>).transpose()
}

/// Build a validated run configuration from `retry-timing` arguments
#[allow(clippy::too_many_arguments)]
pub fn run_config(
    ip: Ipv4Addr,
    device_mac: &str,
    interface: &str,
    retry_delay: u64,
    max_attempts: u32,
    duration: u64,
    test_ongoing: bool,
    announce_op: AnnounceOp,
    attempt_boundary_ms: f64,
) -> Result<RunConfig> {
    let config = RunConfig::new(ip, device_mac.parse()?, interface)
        .with_retry_delay_ms(retry_delay)
        .with_max_attempts(max_attempts)
        .with_duration(Duration::from_secs(duration))
        .with_ongoing_test(test_ongoing)
        .with_announce_op(announce_op.into())
        .with_attempt_boundary_ms(attempt_boundary_ms);
    config.validate()?;
    Ok(config)
}

/// Announcement options from `announce` arguments
pub fn announce_options(count: u32, interval: f64, continuous: bool) -> Result<AnnounceOptions> {
    let interval = Duration::try_from_secs_f64(interval).map_err(|_| {
        acdtest_core::Error::invalid_parameter("interval", "must be a non-negative number of seconds")
    })?;
    if count == 0 && !continuous {
        return Err(acdtest_core::Error::invalid_parameter("count", "must be at least 1"));
    }
    Ok(AnnounceOptions {
        count,
        interval,
        continuous,
    })
}
