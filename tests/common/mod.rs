// Shared test helpers: temp SQLite store, scripted probes, recording event sink.
#![allow(dead_code)]

use async_trait::async_trait;
use lanwatch::events::{Event, EventSink};
use lanwatch::models::{Device, Metric};
use lanwatch::probes::{
    DnsTimer, HostnameResolver, NeighborEntry, NeighborTable, NetworkInfo, NetworkInfoSource,
    PingOutcome, PortProbe, Probes, ReachabilityProbe, SpeedMeasurement, SpeedTester,
    vendor::OuiTable,
};
use lanwatch::store::Repositories;
use lanwatch::store::sqlite::SqliteStore;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const MINUTE: i64 = 60_000;

pub async fn test_repos() -> (TempDir, Repositories) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lanwatch.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 2).await.unwrap();
    store.init().await.unwrap();
    (dir, Repositories::sqlite(Arc::new(store)))
}

pub fn device(ip: &str, mac: &str, now: i64) -> Device {
    Device::new(ip, mac, now)
}

pub fn sample(device_id: &str, timestamp: i64, latency: Option<f64>, loss: f64) -> Metric {
    Metric {
        device_id: device_id.to_string(),
        timestamp,
        latency_ms: latency,
        packet_loss: loss,
        jitter_ms: None,
        is_reachable: latency.is_some(),
    }
}

pub fn entry(ip: &str, mac: &str) -> NeighborEntry {
    NeighborEntry {
        ip: ip.parse().unwrap(),
        mac: mac.to_string(),
    }
}

/// Replies with fixed samples per address; unknown addresses are unreachable.
/// Tracks the peak number of concurrent probes and the timeout of every call.
#[derive(Default)]
pub struct FakePing {
    pub replies: Mutex<HashMap<IpAddr, Vec<f64>>>,
    /// Probes an address ignores before its replies start.
    misses: Mutex<HashMap<IpAddr, usize>>,
    pub seen: Mutex<Vec<(IpAddr, Duration)>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakePing {
    pub fn reply(&self, ip: &str, samples: Vec<f64>) {
        self.replies
            .lock()
            .unwrap()
            .insert(ip.parse().unwrap(), samples);
    }

    /// Replies only after ignoring the first `misses` probes.
    pub fn reply_after(&self, ip: &str, misses: usize, samples: Vec<f64>) {
        self.misses.lock().unwrap().insert(ip.parse().unwrap(), misses);
        self.reply(ip, samples);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn timeouts_for(&self, ip: &str) -> Vec<Duration> {
        let ip: IpAddr = ip.parse().unwrap();
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == ip)
            .map(|(_, t)| *t)
            .collect()
    }
}

#[async_trait]
impl ReachabilityProbe for FakePing {
    async fn probe(&self, address: IpAddr, count: u32, timeout: Duration) -> PingOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((address, timeout));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(left) = self.misses.lock().unwrap().get_mut(&address) {
            if *left > 0 {
                *left -= 1;
                return PingOutcome::default();
            }
        }
        let samples = self
            .replies
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .unwrap_or_default();
        let samples: Vec<f64> = samples.into_iter().take(count as usize).collect();
        PingOutcome::from_samples(samples)
    }
}

/// Returns scripted reads in order; the last one repeats.
#[derive(Default)]
pub struct FakeNeighbors {
    reads: Mutex<VecDeque<Vec<NeighborEntry>>>,
    last: Mutex<Vec<NeighborEntry>>,
}

impl FakeNeighbors {
    pub fn script(&self, reads: Vec<Vec<NeighborEntry>>) {
        *self.reads.lock().unwrap() = reads.into();
    }

    pub fn always(&self, entries: Vec<NeighborEntry>) {
        self.script(vec![entries]);
    }
}

#[async_trait]
impl NeighborTable for FakeNeighbors {
    async fn read(&self) -> Vec<NeighborEntry> {
        let next = self.reads.lock().unwrap().pop_front();
        match next {
            Some(entries) => {
                *self.last.lock().unwrap() = entries.clone();
                entries
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub names: Mutex<HashMap<IpAddr, String>>,
}

#[async_trait]
impl HostnameResolver for FakeResolver {
    async fn reverse_resolve(&self, ip: IpAddr) -> Option<String> {
        self.names.lock().unwrap().get(&ip).cloned()
    }
}

#[derive(Default)]
pub struct FakeDns {
    pub latency: Mutex<Option<f64>>,
}

#[async_trait]
impl DnsTimer for FakeDns {
    async fn measure_dns_latency(&self, _domain: &str) -> Option<f64> {
        *self.latency.lock().unwrap()
    }
}

#[derive(Default)]
pub struct FakePorts {
    pub open: Mutex<HashMap<IpAddr, Vec<u16>>>,
}

#[async_trait]
impl PortProbe for FakePorts {
    async fn open_ports(&self, ip: IpAddr, ports: &[u16]) -> Vec<u16> {
        self.open
            .lock()
            .unwrap()
            .get(&ip)
            .map(|open| open.iter().copied().filter(|p| ports.contains(p)).collect())
            .unwrap_or_default()
    }
}

pub struct FakeNetwork {
    pub info: Mutex<Option<NetworkInfo>>,
}

impl FakeNetwork {
    pub fn lan(local: &str, gateway: Option<&str>) -> Self {
        Self {
            info: Mutex::new(Some(NetworkInfo {
                local_ip: local.parse().unwrap(),
                prefix: 24,
                gateway: gateway.map(|g| g.parse::<Ipv4Addr>().unwrap()),
            })),
        }
    }
}

#[async_trait]
impl NetworkInfoSource for FakeNetwork {
    async fn network_info(&self) -> Option<NetworkInfo> {
        self.info.lock().unwrap().clone()
    }
}

pub struct FakeSpeedTester {
    pub measurement: SpeedMeasurement,
}

#[async_trait]
impl SpeedTester for FakeSpeedTester {
    async fn run(&self) -> anyhow::Result<SpeedMeasurement> {
        Ok(self.measurement.clone())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scripted probe set plus handles to each fake.
pub struct TestProbes {
    pub ping: Arc<FakePing>,
    pub neighbors: Arc<FakeNeighbors>,
    pub resolver: Arc<FakeResolver>,
    pub dns: Arc<FakeDns>,
    pub ports: Arc<FakePorts>,
    pub network: Arc<FakeNetwork>,
}

impl TestProbes {
    pub fn new(local: &str, gateway: Option<&str>) -> Self {
        Self {
            ping: Arc::new(FakePing::default()),
            neighbors: Arc::new(FakeNeighbors::default()),
            resolver: Arc::new(FakeResolver::default()),
            dns: Arc::new(FakeDns::default()),
            ports: Arc::new(FakePorts::default()),
            network: Arc::new(FakeNetwork::lan(local, gateway)),
        }
    }

    pub fn probes(&self) -> Probes {
        Probes {
            reachability: self.ping.clone(),
            neighbors: self.neighbors.clone(),
            resolver: self.resolver.clone(),
            vendors: Arc::new(OuiTable),
            dns: self.dns.clone(),
            ports: self.ports.clone(),
            network: self.network.clone(),
        }
    }
}
