//! ARP support for Address Conflict Detection testing
//!
//! This crate provides:
//! - ARP packet parsing and construction (requests, replies, probes, announcements)
//! - Ethernet framing and the [`ObservedFrame`] view of captured traffic
//! - Frame classification into probe / defensive announcement / irrelevant
//! - Conflict injection on behalf of a synthetic adversary device
//!
//! ## ARP Packet Format
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      Hardware Type (HTYPE)    |       Protocol Type (PTYPE)   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  HW Addr Len  |Proto Addr Len |         Operation (OPER)      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Sender Hardware Address (SHA)               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       SHA (cont.)             |  Sender Protocol Address (SPA)|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       SPA (cont.)             |  Target Hardware Address (THA)|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        THA (cont.)                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Target Protocol Address (TPA)               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! An ACD probe is a request with SPA = 0.0.0.0 and TPA = the address being
//! acquired. An announcement has SPA = TPA = the claimed address.

pub mod classify;
pub mod frame;
pub mod inject;
pub mod packet;

pub use classify::{classify, ClassifiedEvent, ClassifyTarget};
pub use frame::{ArpFrame, ObservedFrame};
pub use inject::{random_adversary_mac, ConflictInjector};
pub use packet::{ArpOpcode, ArpPacket};
