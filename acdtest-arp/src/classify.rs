//! Frame classification
//!
//! Maps every observed ARP frame to the event kind the phase inference cares
//! about. Classification is pure: the same frame and target always give the
//! same event.

use crate::frame::ObservedFrame;
use crate::packet::ArpOpcode;
use acdtest_core::MacAddr;
use std::net::Ipv4Addr;

/// The device and address under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyTarget {
    /// Address the device is acquiring/defending
    pub protected_ip: Ipv4Addr,
    /// Device-under-test MAC
    pub device_mac: MacAddr,
}

impl ClassifyTarget {
    pub fn new(protected_ip: Ipv4Addr, device_mac: MacAddr) -> Self {
        Self {
            protected_ip,
            device_mac,
        }
    }
}

/// Semantic kind of an observed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// Acquisition probe: request from 0.0.0.0 for the protected address
    Probe { from_mac: MacAddr },
    /// Device asserting ownership: sender IP is the protected address
    DefensiveAnnouncement { from_mac: MacAddr },
    Irrelevant,
}

impl ClassifiedEvent {
    pub fn is_probe(&self) -> bool {
        matches!(self, ClassifiedEvent::Probe { .. })
    }

    pub fn is_defensive(&self) -> bool {
        matches!(self, ClassifiedEvent::DefensiveAnnouncement { .. })
    }
}

/// Classify one frame against the target
///
/// The defensive check runs first: a request whose sender IP is already the
/// protected address is a defensive probe, never an acquisition probe.
pub fn classify(frame: &ObservedFrame, target: &ClassifyTarget) -> ClassifiedEvent {
    if frame.sender_mac != target.device_mac {
        return ClassifiedEvent::Irrelevant;
    }

    let op_known = matches!(frame.operation, ArpOpcode::Request | ArpOpcode::Reply);

    if op_known && frame.sender_ip == target.protected_ip {
        return ClassifiedEvent::DefensiveAnnouncement {
            from_mac: frame.sender_mac,
        };
    }

    if frame.operation == ArpOpcode::Request
        && frame.sender_ip.is_unspecified()
        && frame.target_ip == target.protected_ip
    {
        return ClassifiedEvent::Probe {
            from_mac: frame.sender_mac,
        };
    }

    ClassifiedEvent::Irrelevant
}
