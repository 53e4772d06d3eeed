//! ACD Test Harness Core Library
//!
//! This crate provides the shared error type, address types, monotonic run
//! clock and the raw frame send primitive used by the rest of the ACD test
//! harness workspace.

pub mod clock;
pub mod error;
pub mod interface;
pub mod types;

// Re-export commonly used types
pub use clock::RunClock;
pub use error::{Error, Result};
pub use interface::{FrameSender, Interface, InterfaceSender};
pub use types::*;
