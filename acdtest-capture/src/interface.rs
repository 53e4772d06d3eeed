//! Interface enumeration for choosing where to capture

use acdtest_core::{Error, MacAddr, Result};
use pnet_datalink::NetworkInterface;
use std::net::Ipv4Addr;

/// What the harness needs to know about a candidate interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    /// Platform description, empty on most Unix systems
    pub description: String,
    pub mac: Option<MacAddr>,
    /// IPv4 addresses only; ACD is IPv4-specific
    pub ipv4: Vec<Ipv4Addr>,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        let ipv4 = iface
            .ips
            .iter()
            .filter_map(|network| match network.ip() {
                std::net::IpAddr::V4(v4) => Some(v4),
                std::net::IpAddr::V6(_) => None,
            })
            .collect();

        Self {
            name: iface.name.clone(),
            description: iface.description.clone(),
            mac: iface.mac.map(|m| MacAddr::new([m.0, m.1, m.2, m.3, m.4, m.5])),
            ipv4,
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// Up, not loopback, and has a hardware address to inject from
    pub fn is_capture_capable(&self) -> bool {
        self.is_up && !self.is_loopback && self.mac.is_some()
    }

    pub fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4.first().copied()
    }
}

/// All interfaces, sorted by name
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let mut interfaces: Vec<InterfaceInfo> = pnet_datalink::interfaces()
        .iter()
        .map(InterfaceInfo::from)
        .collect();

    if interfaces.is_empty() {
        return Err(Error::Interface(
            "no network interfaces found, are you running with sufficient privileges?".to_string(),
        ));
    }

    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(interfaces)
}

/// Look up one interface by exact name
pub fn get_interface(name: &str) -> Result<InterfaceInfo> {
    list_interfaces()?
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(is_up: bool, is_loopback: bool, mac: Option<MacAddr>) -> InterfaceInfo {
        InterfaceInfo {
            name: "test0".to_string(),
            description: String::new(),
            mac,
            ipv4: vec![Ipv4Addr::new(172, 16, 82, 1), Ipv4Addr::new(10, 0, 0, 1)],
            is_up,
            is_loopback,
        }
    }

    #[test]
    fn test_capture_capable() {
        let mac = Some(MacAddr::new([0x02, 0, 0, 0, 0, 1]));
        assert!(info(true, false, mac).is_capture_capable());
        assert!(!info(false, false, mac).is_capture_capable());
        assert!(!info(true, true, mac).is_capture_capable());
        assert!(!info(true, false, None).is_capture_capable());
    }

    #[test]
    fn test_primary_ipv4_is_first() {
        assert_eq!(
            info(true, false, None).primary_ipv4(),
            Some(Ipv4Addr::new(172, 16, 82, 1))
        );
    }

    #[test]
    fn test_get_nonexistent_interface() {
        // Enumeration itself may fail without netlink access
        match get_interface("nonexistent_interface_xyz") {
            Err(Error::InterfaceNotFound(name)) => assert_eq!(name, "nonexistent_interface_xyz"),
            Err(Error::Interface(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_listing_is_sorted() {
        let Ok(interfaces) = list_interfaces() else {
            return;
        };
        let names: Vec<_> = interfaces.iter().map(|i| i.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
