//! Packet capture library for the ACD test harness
//!
//! This crate wraps pcap to produce an ordered stream of ARP frames from one
//! interface.
//!
//! ## Example
//!
//! ```no_run
//! use acdtest_capture::{filters, ArpCapture, CaptureEvent};
//! use acdtest_core::RunClock;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut capture = ArpCapture::new("eth0");
//! capture.set_filter(&filters::arp_filter());
//!
//! capture.start(RunClock::start(), |event| {
//!     if let CaptureEvent::Frame(frame) = event {
//!         println!("{:?} from {}", frame.operation, frame.sender_mac);
//!     }
//! })?;
//!
//! capture.stop();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod filters;
pub mod interface;
pub mod stats;

// Re-export main types
pub use capture::{ArpCapture, CaptureConfig, CaptureEvent, CaptureState};
pub use interface::{get_interface, list_interfaces, InterfaceInfo};
pub use stats::{CaptureStats, StatsAccumulator};
