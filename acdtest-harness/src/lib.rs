//! ACD retry-timing harness
//!
//! Watches a device acquire an IPv4 address with Address Conflict Detection,
//! forces conflicts on its probes, and checks that its retry attempts are
//! spaced the way it was configured to space them.
//!
//! The pieces, in the order a frame flows through them:
//!
//! - [`run::Harness`] receives captured frames and scheduler notices on one
//!   ordered channel
//! - [`acdtest_arp::classify`] turns each frame into a probe, a defensive
//!   announcement, or nothing
//! - [`phase::PhaseState::apply`] infers the device's phase and emits effects
//! - the harness records timing ([`timing`]), sends reply conflicts and, for
//!   ongoing-phase tests, starts the [`scheduler`]
//! - [`report::Report`] renders the outcome
//!
//! ## Example
//!
//! ```no_run
//! use acdtest_harness::{run_on_interface, RunConfig};
//!
//! # async fn example() -> acdtest_core::Result<()> {
//! let config = RunConfig::new(
//!     "172.16.82.100".parse().unwrap(),
//!     "30:ed:a0:e3:34:c1".parse()?,
//!     "eth0",
//! );
//! let report = run_on_interface(config).await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod config;
pub mod phase;
pub mod report;
pub mod run;
pub mod scheduler;
pub mod timing;
pub mod tools;

pub use analyze::IntervalAnalysis;
pub use config::RunConfig;
pub use phase::{Effect, Input, Phase, PhasePolicy, PhaseState, Step};
pub use report::{InjectionCounters, Report, StopReason};
pub use run::{run_on_interface, Harness, HarnessInput};
pub use scheduler::{StimulusSchedule, StimulusScheduler};
pub use timing::{IntervalRecord, IntervalStats, ProbeRecord, TimingRecord, Verifier};
pub use tools::AnnounceOptions;
