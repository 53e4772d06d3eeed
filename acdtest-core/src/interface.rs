//! Network interface types and the raw frame send primitive

use crate::{Error, MacAddr, Result};
use parking_lot::Mutex;
use pnet_datalink::{self, Channel, DataLinkSender, NetworkInterface};
use std::fmt;
use std::net::Ipv4Addr;

/// Anything that can put a fully formed Ethernet frame on the wire
///
/// The harness never retries a send: an `Err` here is fatal for the run.
pub trait FrameSender: Send + Sync {
    /// Transmit one frame (Ethernet header included)
    fn send_frame(&self, frame: &[u8]) -> Result<()>;
}

/// Network interface
#[derive(Debug, Clone)]
pub struct Interface {
    /// Interface name (e.g., "eth0", "en0")
    pub name: String,
    /// Interface index
    pub index: u32,
    /// MAC address
    pub mac_address: MacAddr,
    /// IPv4 addresses assigned to the interface
    pub ipv4: Vec<Ipv4Addr>,
    /// Is interface up?
    pub is_up: bool,
    /// Is this a loopback interface?
    pub is_loopback: bool,
}

impl From<&NetworkInterface> for Interface {
    fn from(iface: &NetworkInterface) -> Self {
        let mac_bytes = match iface.mac {
            Some(mac) => [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5],
            None => [0, 0, 0, 0, 0, 0],
        };

        let ipv4 = iface
            .ips
            .iter()
            .filter_map(|network| match network {
                ipnetwork::IpNetwork::V4(v4) => Some(v4.ip()),
                ipnetwork::IpNetwork::V6(_) => None,
            })
            .collect();

        Self {
            name: iface.name.clone(),
            index: iface.index,
            mac_address: MacAddr(mac_bytes),
            ipv4,
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl Interface {
    /// Get interface by name
    pub fn by_name(name: &str) -> Result<Self> {
        pnet_datalink::interfaces()
            .iter()
            .find(|i| i.name == name)
            .map(Interface::from)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
    }

    /// Open a persistent datalink sender on this interface
    pub fn create_sender(&self) -> Result<InterfaceSender> {
        let interface = pnet_datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == self.name)
            .ok_or_else(|| Error::InterfaceNotFound(self.name.clone()))?;

        let tx = match pnet_datalink::channel(&interface, Default::default()) {
            Ok(Channel::Ethernet(tx, _rx)) => tx,
            Ok(_) => return Err(Error::Interface("Unsupported channel type".to_string())),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        Ok(InterfaceSender {
            name: self.name.clone(),
            tx: Mutex::new(tx),
        })
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.mac_address)
    }
}

/// pnet-backed [`FrameSender`] bound to one interface
pub struct InterfaceSender {
    name: String,
    tx: Mutex<Box<dyn DataLinkSender>>,
}

impl FrameSender for InterfaceSender {
    fn send_frame(&self, frame: &[u8]) -> Result<()> {
        self.tx
            .lock()
            .send_to(frame, None)
            .ok_or_else(|| Error::transmit(format!("no buffer available on {}", self.name)))?
            .map_err(|e| Error::transmit(format!("send on {} failed: {}", self.name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonexistent_interface() {
        match Interface::by_name("nonexistent_interface_xyz") {
            Err(Error::InterfaceNotFound(name)) => assert_eq!(name, "nonexistent_interface_xyz"),
            other => panic!("Expected InterfaceNotFound, got {:?}", other.map(|i| i.name)),
        }
    }

    #[test]
    fn test_display() {
        let iface = Interface {
            name: "eth0".to_string(),
            index: 2,
            mac_address: MacAddr([0x02, 0, 0, 0, 0, 1]),
            ipv4: vec![Ipv4Addr::new(10, 0, 0, 5)],
            is_up: true,
            is_loopback: false,
        };
        assert_eq!(iface.to_string(), "eth0 (02:00:00:00:00:01)");
    }
}
