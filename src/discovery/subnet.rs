// /24 sweep targets and the two-phase neighbor-table merge.

use crate::probes::NeighborEntry;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Every host address .1-.254 of the /24 containing `local`, except `local` itself.
pub fn sweep_targets(local: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = local.octets();
    (1..=254u8)
        .map(|d| Ipv4Addr::new(a, b, c, d))
        .filter(|ip| *ip != local)
        .collect()
}

pub fn cidr_label(local: Ipv4Addr) -> String {
    let [a, b, c, _] = local.octets();
    format!("{}.{}.{}.0/24", a, b, c)
}

/// Union of both reads keyed by MAC; the later read wins for a MAC seen twice. Sorted by IP.
pub fn merge_neighbor_reads(first: Vec<NeighborEntry>, second: Vec<NeighborEntry>) -> Vec<NeighborEntry> {
    let mut by_mac: HashMap<String, NeighborEntry> = HashMap::new();
    for entry in first.into_iter().chain(second) {
        by_mac.insert(entry.mac.clone(), entry);
    }
    let mut merged: Vec<NeighborEntry> = by_mac.into_values().collect();
    merged.sort_by(|a, b| a.ip.cmp(&b.ip).then_with(|| a.mac.cmp(&b.mac)));
    merged
}
