//! CLI interface for the ACD test harness
//!
//! This crate provides argument parsing for the `acdtest` binary and the
//! glue that turns parsed arguments into harness configuration.

pub mod args;

pub use args::{AnnounceOp, Cli, Commands};
