//! Common types used throughout the harness

use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
///
/// Always rendered lowercase and colon-separated, so two `MacAddr` values
/// compare equal exactly when their normalized text forms do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Locally administered bit (0x02 of the first octet) is set
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Group bit (0x01 of the first octet) is clear
    pub fn is_unicast(&self) -> bool {
        self.0[0] & 0x01 == 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `AA-BB-CC-DD-EE-FF`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            crate::Error::invalid_parameter(
                "mac",
                format!("invalid MAC address format '{}', expected XX:XX:XX:XX:XX:XX", s),
            )
        };

        let normalized = s.trim().to_ascii_lowercase().replace('-', ":");
        let parts: Vec<&str> = normalized.split(':').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(invalid());
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const DOT1Q: u16 = 0x8100;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display_lowercase() {
        let mac = MacAddr([0x30, 0xED, 0xA0, 0xE3, 0x34, 0xC1]);
        assert_eq!(mac.to_string(), "30:ed:a0:e3:34:c1");
    }

    #[test]
    fn test_mac_parse_normalizes() {
        let upper: MacAddr = "30:ED:A0:E3:34:C1".parse().unwrap();
        let dashed: MacAddr = "30-ed-a0-e3-34-c1".parse().unwrap();
        let lower: MacAddr = "30:ed:a0:e3:34:c1".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(dashed, lower);
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("30:ed:a0:e3:34".parse::<MacAddr>().is_err());
        assert!("30:ed:a0:e3:34:zz".parse::<MacAddr>().is_err());
        assert!("3:ed:a0:e3:34:c1".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_flags() {
        let local = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert!(local.is_locally_administered());
        assert!(local.is_unicast());
        assert!(!MacAddr::broadcast().is_unicast());
    }
}
