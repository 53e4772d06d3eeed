//! ARP Packet Structure and Parsing

use acdtest_core::{Error, MacAddr, Result};
use bytes::{BufMut, BytesMut};
use std::net::Ipv4Addr;

/// Hardware types
pub const HTYPE_ETHERNET: u16 = 1;

/// Protocol types
pub const PTYPE_IPV4: u16 = 0x0800;

/// Length of an Ethernet/IPv4 ARP payload
pub const ARP_PACKET_LEN: usize = 28;

/// ARP Operation Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    /// ARP Request
    Request = 1,
    /// ARP Reply
    Reply = 2,
    /// RARP Request
    RarpRequest = 3,
    /// RARP Reply
    RarpReply = 4,
}

impl ArpOpcode {
    pub fn from_u16(val: u16) -> Option<Self> {
        match val {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            3 => Some(Self::RarpRequest),
            4 => Some(Self::RarpReply),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// ARP Packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    /// Hardware type (typically 1 for Ethernet)
    pub htype: u16,
    /// Protocol type (typically 0x0800 for IPv4)
    pub ptype: u16,
    /// Hardware address length (6 for MAC)
    pub hlen: u8,
    /// Protocol address length (4 for IPv4)
    pub plen: u8,
    /// Operation
    pub operation: ArpOpcode,
    /// Sender hardware address (MAC)
    pub sender_hw_addr: MacAddr,
    /// Sender protocol address (IP)
    pub sender_proto_addr: Ipv4Addr,
    /// Target hardware address (MAC)
    pub target_hw_addr: MacAddr,
    /// Target protocol address (IP)
    pub target_proto_addr: Ipv4Addr,
}

impl ArpPacket {
    fn ethernet_ipv4(
        operation: ArpOpcode,
        sender_hw_addr: MacAddr,
        sender_proto_addr: Ipv4Addr,
        target_hw_addr: MacAddr,
        target_proto_addr: Ipv4Addr,
    ) -> Self {
        Self {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: 6,
            plen: 4,
            operation,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr,
            target_proto_addr,
        }
    }

    /// Create new ARP request
    pub fn new_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self::ethernet_ipv4(
            ArpOpcode::Request,
            sender_mac,
            sender_ip,
            MacAddr::zero(),
            target_ip,
        )
    }

    /// Create ACD probe (sender IP 0.0.0.0)
    pub fn new_probe(sender_mac: MacAddr, target_ip: Ipv4Addr) -> Self {
        Self::new_request(sender_mac, Ipv4Addr::UNSPECIFIED, target_ip)
    }

    /// Create new ARP reply
    pub fn new_reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self::ethernet_ipv4(ArpOpcode::Reply, sender_mac, sender_ip, target_mac, target_ip)
    }

    /// Create gratuitous ARP (announcement) with the given opcode
    ///
    /// Requests carry a zero target MAC as RFC 5227 section 2.3 asks of
    /// announcements, rather than the broadcast MAC some tools put there.
    /// Receivers ignore this field, so both forms conflict the same way.
    /// Replies carry broadcast.
    pub fn new_announcement(mac: MacAddr, ip: Ipv4Addr, operation: ArpOpcode) -> Self {
        let target_hw_addr = match operation {
            ArpOpcode::Reply => MacAddr::broadcast(),
            _ => MacAddr::zero(),
        };
        Self::ethernet_ipv4(operation, mac, ip, target_hw_addr, ip)
    }

    /// Parse ARP packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < ARP_PACKET_LEN {
            return Err(Error::parsing("ARP packet too short"));
        }

        let htype = u16::from_be_bytes([data[0], data[1]]);
        let ptype = u16::from_be_bytes([data[2], data[3]]);
        let hlen = data[4];
        let plen = data[5];

        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || hlen != 6 || plen != 4 {
            return Err(Error::parsing(format!(
                "unsupported ARP address family (htype={}, ptype=0x{:04x}, hlen={}, plen={})",
                htype, ptype, hlen, plen
            )));
        }

        let op_val = u16::from_be_bytes([data[6], data[7]]);
        let operation = ArpOpcode::from_u16(op_val)
            .ok_or_else(|| Error::parsing(format!("Invalid ARP opcode {}", op_val)))?;

        let mut sender_hw_addr = [0u8; 6];
        sender_hw_addr.copy_from_slice(&data[8..14]);

        let sender_proto_addr = Ipv4Addr::new(data[14], data[15], data[16], data[17]);

        let mut target_hw_addr = [0u8; 6];
        target_hw_addr.copy_from_slice(&data[18..24]);

        let target_proto_addr = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        Ok(Self {
            htype,
            ptype,
            hlen,
            plen,
            operation,
            sender_hw_addr: MacAddr(sender_hw_addr),
            sender_proto_addr,
            target_hw_addr: MacAddr(target_hw_addr),
            target_proto_addr,
        })
    }

    /// Serialize ARP packet to bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(ARP_PACKET_LEN);

        buf.put_u16(self.htype);
        buf.put_u16(self.ptype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.plen);
        buf.put_u16(self.operation.as_u16());
        buf.put_slice(self.sender_hw_addr.as_bytes());
        buf.put_slice(&self.sender_proto_addr.octets());
        buf.put_slice(self.target_hw_addr.as_bytes());
        buf.put_slice(&self.target_proto_addr.octets());

        buf.to_vec()
    }

    /// Check if this is a request
    pub fn is_request(&self) -> bool {
        self.operation == ArpOpcode::Request
    }

    /// Check if this is a reply
    pub fn is_reply(&self) -> bool {
        self.operation == ArpOpcode::Reply
    }

    /// Check if this is gratuitous ARP
    pub fn is_gratuitous(&self) -> bool {
        self.sender_proto_addr == self.target_proto_addr
    }

    /// Check if this is an ACD probe (request from 0.0.0.0)
    pub fn is_probe(&self) -> bool {
        self.is_request() && self.sender_proto_addr.is_unspecified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: MacAddr = MacAddr::new([0x30, 0xed, 0xa0, 0xe3, 0x34, 0xc1]);

    #[test]
    fn test_arp_probe_creation() {
        let ip = Ipv4Addr::new(172, 16, 82, 100);
        let packet = ArpPacket::new_probe(DEVICE, ip);

        assert!(packet.is_probe());
        assert!(!packet.is_gratuitous());
        assert_eq!(packet.target_hw_addr, MacAddr::zero());
        assert_eq!(packet.target_proto_addr, ip);
    }

    #[test]
    fn test_arp_reply_creation() {
        let sender_mac = MacAddr([0x02, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let ip = Ipv4Addr::new(192, 168, 1, 1);

        let packet = ArpPacket::new_reply(sender_mac, ip, DEVICE, ip);

        assert_eq!(packet.operation, ArpOpcode::Reply);
        assert!(packet.is_reply());
        assert!(packet.is_gratuitous());
        assert_eq!(packet.target_hw_addr, DEVICE);
    }

    #[test]
    fn test_arp_announcement_both_opcodes() {
        let ip = Ipv4Addr::new(192, 168, 1, 100);

        let request = ArpPacket::new_announcement(DEVICE, ip, ArpOpcode::Request);
        assert!(request.is_request());
        assert!(request.is_gratuitous());
        assert_eq!(request.target_hw_addr, MacAddr::zero());

        let reply = ArpPacket::new_announcement(DEVICE, ip, ArpOpcode::Reply);
        assert!(reply.is_reply());
        assert!(reply.is_gratuitous());
        assert_eq!(reply.target_hw_addr, MacAddr::broadcast());
    }

    #[test]
    fn test_arp_serialize_parse() {
        let packet = ArpPacket::new_request(
            DEVICE,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        let bytes = packet.serialize();

        assert_eq!(bytes.len(), ARP_PACKET_LEN);
        assert_eq!(ArpPacket::parse(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_parse_rejects_short_and_bad_opcode() {
        assert!(ArpPacket::parse(&[0u8; 10]).is_err());

        let mut bytes = ArpPacket::new_probe(DEVICE, Ipv4Addr::new(10, 0, 0, 1)).serialize();
        bytes[7] = 9;
        assert!(matches!(
            ArpPacket::parse(&bytes),
            Err(Error::PacketParsing(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_ipv4() {
        let mut bytes = ArpPacket::new_probe(DEVICE, Ipv4Addr::new(10, 0, 0, 1)).serialize();
        bytes[2] = 0x86;
        bytes[3] = 0xdd;
        assert!(ArpPacket::parse(&bytes).is_err());
    }
}
