// Local IPv4 address/prefix (sysinfo) and default gateway.

use super::{NetworkInfo, NetworkInfoSource, linux, run_command};
use async_trait::async_trait;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;
use std::time::Duration;

static GATEWAY_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // `default via 192.168.1.1 dev eth0` (ip route) or `gateway: 192.168.1.1` (BSD route)
    Regex::new(r"(?:default via|gateway:)\s*([\d.]+)").ok()
});

pub fn parse_gateway_output(output: &str) -> Option<Ipv4Addr> {
    let re = GATEWAY_LINE.as_ref()?;
    output
        .lines()
        .find_map(|line| re.captures(line)?.get(1)?.as_str().parse().ok())
}

/// True when `a` and `b` share the first `prefix` bits.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, prefix: u8) -> bool {
    let prefix = prefix.min(32) as u32;
    if prefix == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - prefix);
    (u32::from(a) & mask) == (u32::from(b) & mask)
}

/// Picks the interface address on the gateway's subnet, else the first private IPv4.
pub fn select_local_address(
    candidates: &[(Ipv4Addr, u8)],
    gateway: Option<Ipv4Addr>,
) -> Option<(Ipv4Addr, u8)> {
    let usable: Vec<(Ipv4Addr, u8)> = candidates
        .iter()
        .copied()
        .filter(|(ip, _)| !ip.is_loopback() && !ip.is_link_local() && !ip.is_unspecified())
        .collect();
    if let Some(gw) = gateway
        && let Some(hit) = usable.iter().find(|(ip, prefix)| same_subnet(*ip, gw, *prefix))
    {
        return Some(*hit);
    }
    usable
        .iter()
        .find(|(ip, _)| ip.is_private())
        .or(usable.first())
        .copied()
}

pub struct SystemNetworkInfo {
    timeout: Duration,
}

impl SystemNetworkInfo {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn default_gateway(&self) -> Option<Ipv4Addr> {
        if let Some(gw) = linux::read_default_gateway() {
            return Some(gw);
        }
        let (program, args): (&'static str, &[&str]) = if cfg!(target_os = "macos") {
            ("route", &["-n", "get", "default"])
        } else {
            ("ip", &["route", "show", "default"])
        };
        match run_command(program, args, self.timeout).await {
            Ok(out) => parse_gateway_output(&out),
            Err(e) => {
                tracing::debug!(error = %e, operation = "default_gateway", "gateway lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl NetworkInfoSource for SystemNetworkInfo {
    async fn network_info(&self) -> Option<NetworkInfo> {
        let gateway = self.default_gateway().await;
        let candidates = tokio::task::spawn_blocking(|| {
            let networks = sysinfo::Networks::new_with_refreshed_list();
            networks
                .list()
                .values()
                .flat_map(|data| {
                    data.ip_networks()
                        .iter()
                        .filter_map(|n| match n.addr {
                            IpAddr::V4(v4) => Some((v4, n.prefix)),
                            IpAddr::V6(_) => None,
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| tracing::warn!(error = %e, operation = "network_info", "sysinfo task join"))
        .ok()?;
        let (local_ip, prefix) = select_local_address(&candidates, gateway)?;
        Some(NetworkInfo {
            local_ip,
            prefix,
            gateway,
        })
    }
}
