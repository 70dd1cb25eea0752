// Neighbor (ARP) table snapshot: /proc/net/arp on Linux, `arp -a` output elsewhere.

use super::{NeighborEntry, NeighborTable, linux, run_command};
use async_trait::async_trait;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

// `? (192.168.1.1) at a4:2b:b0:1:2:3 on en0` (BSD, Linux net-tools)
static UNIX_ARP_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\(([\d.]+)\)\s+at\s+([0-9a-fA-F]{1,2}(?::[0-9a-fA-F]{1,2}){5})").ok()
});
// `  192.168.1.1          a4-2b-b0-01-02-03     dynamic` (Windows)
static WINDOWS_ARP_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*([\d.]+)\s+([0-9a-fA-F]{2}(?:-[0-9a-fA-F]{2}){5})\s").ok()
});

/// Lowercase, colon separated, zero padded. None for broadcast, IPv4 multicast and all-zero addresses.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.split([':', '-']).collect();
    if octets.len() != 6 {
        return None;
    }
    let mut out = Vec::with_capacity(6);
    for o in octets {
        let byte = u8::from_str_radix(o, 16).ok()?;
        out.push(format!("{:02x}", byte));
    }
    let mac = out.join(":");
    if mac == "ff:ff:ff:ff:ff:ff" || mac == "00:00:00:00:00:00" || mac.starts_with("01:00:5e") {
        return None;
    }
    Some(mac)
}

/// Entries from `arp -an` / `arp -a` text in either Unix or Windows format.
pub fn parse_arp_output(output: &str) -> Vec<NeighborEntry> {
    let patterns = [UNIX_ARP_LINE.as_ref(), WINDOWS_ARP_LINE.as_ref()];
    output
        .lines()
        .filter_map(|line| {
            patterns.iter().flatten().find_map(|re| {
                let caps = re.captures(line)?;
                let ip: Ipv4Addr = caps.get(1)?.as_str().parse().ok()?;
                let mac = normalize_mac(caps.get(2)?.as_str())?;
                Some(NeighborEntry { ip, mac })
            })
        })
        .collect()
}

pub struct SystemNeighborTable {
    timeout: Duration,
}

impl SystemNeighborTable {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl NeighborTable for SystemNeighborTable {
    async fn read(&self) -> Vec<NeighborEntry> {
        if let Some(entries) = linux::read_proc_arp() {
            return entries;
        }
        let args: &[&str] = if cfg!(target_os = "windows") { &["-a"] } else { &["-an"] };
        match run_command("arp", args, self.timeout).await {
            Ok(out) => parse_arp_output(&out),
            Err(e) => {
                tracing::warn!(error = %e, operation = "read_neighbor_table", "arp failed");
                Vec::new()
            }
        }
    }
}
