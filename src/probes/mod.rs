// Probe collaborators. Every probe is bounded by a timeout and reports failure as
// unreachable / None / empty; nothing here returns an error to the engines except the speed test.

pub mod linux;
pub mod neighbor;
pub mod netinfo;
pub mod ping;
pub mod ports;
pub mod resolve;
pub mod speedtest;
pub mod vendor;

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

/// Result of `count` echo requests to one address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingOutcome {
    /// Round-trip times of the successful replies, in order.
    pub samples: Vec<f64>,
    pub success_count: u32,
}

impl PingOutcome {
    pub fn from_samples(samples: Vec<f64>) -> Self {
        let success_count = samples.len() as u32;
        Self {
            samples,
            success_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighborEntry {
    pub ip: Ipv4Addr,
    /// Normalized: lowercase, colon separated, two digits per octet.
    pub mac: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub local_ip: Ipv4Addr,
    pub prefix: u8,
    pub gateway: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMeasurement {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub jitter_ms: Option<f64>,
    pub isp: Option<String>,
    pub server_name: Option<String>,
    pub server_location: Option<String>,
}

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, address: IpAddr, count: u32, timeout: Duration) -> PingOutcome;
}

#[async_trait]
pub trait NeighborTable: Send + Sync {
    async fn read(&self) -> Vec<NeighborEntry>;
}

#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn reverse_resolve(&self, ip: IpAddr) -> Option<String>;
}

pub trait VendorLookup: Send + Sync {
    fn resolve_vendor(&self, mac: &str) -> Option<String>;
}

#[async_trait]
pub trait DnsTimer: Send + Sync {
    /// Milliseconds to resolve `domain`, None on failure or timeout.
    async fn measure_dns_latency(&self, domain: &str) -> Option<f64>;
}

#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Subset of `ports` accepting TCP connections, ascending.
    async fn open_ports(&self, ip: IpAddr, ports: &[u16]) -> Vec<u16>;
}

#[async_trait]
pub trait NetworkInfoSource: Send + Sync {
    async fn network_info(&self) -> Option<NetworkInfo>;
}

#[async_trait]
pub trait SpeedTester: Send + Sync {
    async fn run(&self) -> anyhow::Result<SpeedMeasurement>;
}

/// The probe set used by discovery, monitoring and diagnostics.
#[derive(Clone)]
pub struct Probes {
    pub reachability: Arc<dyn ReachabilityProbe>,
    pub neighbors: Arc<dyn NeighborTable>,
    pub resolver: Arc<dyn HostnameResolver>,
    pub vendors: Arc<dyn VendorLookup>,
    pub dns: Arc<dyn DnsTimer>,
    pub ports: Arc<dyn PortProbe>,
    pub network: Arc<dyn NetworkInfoSource>,
}

/// Timeouts for the OS-backed probes.
#[derive(Debug, Clone)]
pub struct SystemProbeConfig {
    pub port_timeout: Duration,
    pub dns_timeout: Duration,
    pub command_timeout: Duration,
}

impl Probes {
    /// OS-backed probes: system ping, ARP cache, system resolver, OUI database, TCP connect, sysinfo.
    pub fn system(config: &SystemProbeConfig) -> Self {
        Self {
            reachability: Arc::new(ping::SystemPing),
            neighbors: Arc::new(neighbor::SystemNeighborTable::new(config.command_timeout)),
            resolver: Arc::new(resolve::SystemResolver::new(config.command_timeout)),
            vendors: Arc::new(vendor::OuiTable),
            dns: Arc::new(resolve::TokioDnsTimer::new(config.dns_timeout)),
            ports: Arc::new(ports::TcpConnectProbe::new(config.port_timeout)),
            network: Arc::new(netinfo::SystemNetworkInfo::new(config.command_timeout)),
        }
    }
}

/// Runs a command to completion under `timeout`, returning stdout. Non-zero exit is not an error:
/// ping and arp exit non-zero on partial results that are still worth parsing.
pub(crate) async fn run_command(
    program: &'static str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, crate::error::ProbeError> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| crate::error::ProbeError::Timeout(timeout))??;
    if output.stdout.is_empty() && !output.status.success() {
        return Err(crate::error::ProbeError::Command {
            program,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
