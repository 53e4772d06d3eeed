//! BPF (Berkeley Packet Filter) expressions for ACD traffic

use acdtest_core::MacAddr;

/// ARP filter
/// Captures all ARP packets
pub fn arp_filter() -> String {
    "arp".to_string()
}

/// Filter for specific source MAC address
pub fn src_mac_filter(mac: &MacAddr) -> String {
    format!("ether src {}", mac)
}

/// ARP sent by one device (probes, announcements, defenses)
pub fn device_arp_filter(device_mac: &MacAddr) -> String {
    combine_filters(&[&arp_filter(), &src_mac_filter(device_mac)])
}

/// Combine multiple filters with AND logic
pub fn combine_filters(filters: &[&str]) -> String {
    if filters.is_empty() {
        return String::new();
    }

    filters
        .iter()
        .map(|f| format!("({})", f))
        .collect::<Vec<_>>()
        .join(" and ")
}
