// Linux-specific readers: /proc/net/arp, /proc/net/route.

use super::NeighborEntry;
use std::net::Ipv4Addr;

/// Complete ARP entries from /proc/net/arp (Linux). None elsewhere or when unreadable.
pub(super) fn read_proc_arp() -> Option<Vec<NeighborEntry>> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let content = std::fs::read_to_string("/proc/net/arp").ok()?;
    Some(parse_proc_arp(&content))
}

/// Default gateway from /proc/net/route (Linux).
pub(super) fn read_default_gateway() -> Option<Ipv4Addr> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let content = std::fs::read_to_string("/proc/net/route").ok()?;
    parse_proc_route_gateway(&content)
}

/// `IP address  HW type  Flags  HW address  Mask  Device`. Only flag 0x2 (ATF_COM) rows count.
pub fn parse_proc_arp(content: &str) -> Vec<NeighborEntry> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            let flags = u32::from_str_radix(fields[2].trim_start_matches("0x"), 16).ok()?;
            if flags & 0x2 == 0 {
                return None;
            }
            let ip: Ipv4Addr = fields[0].parse().ok()?;
            let mac = super::neighbor::normalize_mac(fields[3])?;
            Some(NeighborEntry { ip, mac })
        })
        .collect()
}

/// Gateway of the first default route (destination 00000000). Addresses are little-endian hex.
pub fn parse_proc_route_gateway(content: &str) -> Option<Ipv4Addr> {
    content.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[1] != "00000000" {
            return None;
        }
        let raw = u32::from_str_radix(fields[2], 16).ok()?;
        let ip = Ipv4Addr::from(raw.to_le_bytes());
        (!ip.is_unspecified()).then_some(ip)
    })
}
