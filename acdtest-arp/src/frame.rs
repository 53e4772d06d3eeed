//! Ethernet framing for ARP and the observed-frame view used by the classifier

use crate::packet::{ArpOpcode, ArpPacket, ARP_PACKET_LEN};
use acdtest_core::{ethertypes, Error, MacAddr, Result};
use bytes::{BufMut, BytesMut};
use std::net::Ipv4Addr;

/// Ethernet header size (dst + src + type)
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Minimum Ethernet frame size (without FCS)
pub const MIN_FRAME_LEN: usize = 60;

/// 802.1Q tag size
const VLAN_TAG_LEN: usize = 4;

/// Ethernet II frame carrying an ARP payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpFrame {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// ARP payload
    pub arp: ArpPacket,
}

impl ArpFrame {
    pub fn new(destination: MacAddr, source: MacAddr, arp: ArpPacket) -> Self {
        Self {
            destination,
            source,
            arp,
        }
    }

    /// Serialize to wire bytes, padded to the Ethernet minimum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(MIN_FRAME_LEN);

        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_u16(ethertypes::ARP);
        buffer.put_slice(&self.arp.serialize());

        let mut result = buffer.to_vec();
        if result.len() < MIN_FRAME_LEN {
            result.resize(MIN_FRAME_LEN, 0);
        }
        result
    }

    /// Parse an Ethernet frame, skipping one 802.1Q tag if present
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(Error::parsing("Ethernet frame too short"));
        }

        let mut destination = [0u8; 6];
        destination.copy_from_slice(&data[0..6]);
        let mut source = [0u8; 6];
        source.copy_from_slice(&data[6..12]);

        let mut offset = 12;
        let mut ethertype = u16::from_be_bytes([data[offset], data[offset + 1]]);
        if ethertype == ethertypes::DOT1Q {
            offset += VLAN_TAG_LEN;
            if data.len() < offset + 2 {
                return Err(Error::parsing("truncated 802.1Q header"));
            }
            ethertype = u16::from_be_bytes([data[offset], data[offset + 1]]);
        }

        if ethertype != ethertypes::ARP {
            return Err(Error::parsing(format!(
                "not an ARP frame (ethertype 0x{:04x})",
                ethertype
            )));
        }

        let payload = &data[offset + 2..];
        if payload.len() < ARP_PACKET_LEN {
            return Err(Error::parsing("ARP payload truncated"));
        }

        Ok(Self {
            destination: MacAddr(destination),
            source: MacAddr(source),
            arp: ArpPacket::parse(payload)?,
        })
    }
}

/// One inbound ARP event as seen by the harness
///
/// Created per received frame and consumed immediately by the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedFrame {
    /// Monotonic receive time, seconds since the run origin
    pub timestamp: f64,
    pub operation: ArpOpcode,
    pub sender_ip: Ipv4Addr,
    pub target_ip: Ipv4Addr,
    pub sender_mac: MacAddr,
}

impl ObservedFrame {
    /// Build from an already parsed ARP payload
    pub fn from_arp(arp: &ArpPacket, timestamp: f64) -> Self {
        Self {
            timestamp,
            operation: arp.operation,
            sender_ip: arp.sender_proto_addr,
            target_ip: arp.target_proto_addr,
            sender_mac: arp.sender_hw_addr,
        }
    }

    /// Parse raw Ethernet bytes captured at `timestamp`
    pub fn from_ethernet(data: &[u8], timestamp: f64) -> Result<Self> {
        let frame = ArpFrame::from_bytes(data)?;
        Ok(Self::from_arp(&frame.arp, timestamp))
    }
}
