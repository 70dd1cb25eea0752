// Discovery: sweep the local /24, read the neighbor table twice, reconcile the device registry by MAC.

pub mod classify;
pub mod subnet;

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::events::{Event, EventSink};
use crate::models::{Device, DeviceStatus, Scan, ScanStatus, ScanType, Trigger, now_ms};
use crate::probes::netinfo::same_subnet;
use crate::probes::{NeighborEntry, Probes};
use crate::store::Repositories;
use classify::{ClassifyInput, classify};
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Enrichment lookups (reverse DNS, port scan) in flight for new devices.
const ENRICH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub sweep_concurrency: usize,
    pub probe_timeout: Duration,
    pub retry_timeout: Duration,
    pub arp_settle: Duration,
    pub port_scan: bool,
    pub scan_ports: Vec<u16>,
}

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(c: &DiscoveryConfig) -> Self {
        Self {
            sweep_concurrency: c.sweep_concurrency.max(1),
            probe_timeout: Duration::from_millis(c.probe_timeout_ms),
            retry_timeout: Duration::from_millis(c.retry_timeout_ms),
            arp_settle: Duration::from_millis(c.arp_settle_ms),
            port_scan: c.port_scan,
            scan_ports: c.scan_ports.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoverySummary {
    pub scan_id: String,
    /// Entries in the merged neighbor table.
    pub devices_found: u32,
    pub new_devices: u32,
    /// Registry state of every device seen by this run.
    pub devices: Vec<Device>,
}

pub struct DiscoveryEngine {
    repos: Repositories,
    probes: Probes,
    events: Arc<dyn EventSink>,
    settings: DiscoverySettings,
    running: Mutex<()>,
}

struct Sweep {
    gateway: Option<Ipv4Addr>,
    entries: Vec<NeighborEntry>,
}

impl DiscoveryEngine {
    pub fn new(
        repos: Repositories,
        probes: Probes,
        events: Arc<dyn EventSink>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            repos,
            probes,
            events,
            settings,
            running: Mutex::new(()),
        }
    }

    /// One discovery run, recorded as a Scan. Overlapping runs are rejected.
    pub async fn discover(&self, trigger: Trigger) -> Result<DiscoverySummary, DiscoveryError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| DiscoveryError::AlreadyRunning)?;

        let started_at = now_ms();
        let mut scan = Scan {
            id: uuid::Uuid::new_v4().to_string(),
            scan_type: ScanType::Discovery,
            status: ScanStatus::Running,
            started_at,
            completed_at: None,
            devices_found: 0,
            new_devices: 0,
            duration_ms: None,
            triggered_by: trigger,
            error: None,
        };
        self.repos.scans.create(&scan).await?;
        self.events.emit(Event::ScanStarted(scan.clone()));
        tracing::info!(scan_id = %scan.id, trigger = %trigger, "Discovery started");

        let result = self.run().await;

        let completed_at = now_ms();
        scan.completed_at = Some(completed_at);
        scan.duration_ms = Some(completed_at - started_at);
        match result {
            Ok((devices_found, new_devices, devices)) => {
                scan.status = ScanStatus::Completed;
                scan.devices_found = devices_found;
                scan.new_devices = new_devices;
                self.repos.scans.update(&scan).await?;
                tracing::info!(
                    scan_id = %scan.id,
                    devices_found,
                    new_devices,
                    duration_ms = completed_at - started_at,
                    "Discovery completed"
                );
                self.events.emit(Event::ScanCompleted(scan.clone()));
                Ok(DiscoverySummary {
                    scan_id: scan.id,
                    devices_found,
                    new_devices,
                    devices,
                })
            }
            Err(e) => {
                scan.status = ScanStatus::Failed;
                scan.error = Some(e.to_string());
                if let Err(ue) = self.repos.scans.update(&scan).await {
                    tracing::warn!(error = %ue, operation = "update_scan", "Failed to record failed scan");
                }
                tracing::warn!(error = %e, scan_id = %scan.id, "Discovery failed");
                self.events.emit(Event::ScanCompleted(scan));
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<(u32, u32, Vec<Device>), DiscoveryError> {
        let sweep = self.sweep().await?;
        let now = now_ms();
        let devices_found = sweep.entries.len() as u32;

        let mut seen_macs = HashSet::new();
        let mut fresh = Vec::new();
        for entry in &sweep.entries {
            seen_macs.insert(entry.mac.clone());
            match self.repos.devices.find_by_mac(&entry.mac).await? {
                Some(mut device) => {
                    let ip = entry.ip.to_string();
                    self.repos.devices.mark_seen(&device.id, &ip, now).await?;
                    if sweep.gateway == Some(entry.ip) && !device.is_gateway {
                        device.is_gateway = true;
                        device.ip_address = ip;
                        device.status = DeviceStatus::Online;
                        device.last_seen = now;
                        self.repos.devices.update(&device).await?;
                        tracing::info!(device_id = %device.id, ip = %entry.ip, "Device flagged as gateway");
                    }
                }
                None => fresh.push(entry.clone()),
            }
        }

        let new_devices: Vec<Device> = stream::iter(fresh)
            .map(|entry| self.build_device(entry, sweep.gateway, now))
            .buffer_unordered(ENRICH_CONCURRENCY)
            .collect()
            .await;
        for device in &new_devices {
            self.repos.devices.create(device).await?;
            tracing::info!(
                device_id = %device.id,
                ip = %device.ip_address,
                mac = %device.mac_address,
                device_type = %device.device_type,
                vendor = device.vendor.as_deref().unwrap_or("-"),
                "New device discovered"
            );
        }

        let all = self.repos.devices.get_all().await?;
        if let Some(gateway_mac) = sweep
            .gateway
            .and_then(|gw| sweep.entries.iter().find(|e| e.ip == gw))
            .map(|e| e.mac.as_str())
        {
            for stale in all.iter().filter(|d| d.is_gateway && d.mac_address != gateway_mac) {
                let mut stale = stale.clone();
                stale.is_gateway = false;
                self.repos.devices.update(&stale).await?;
                tracing::info!(device_id = %stale.id, ip = %stale.ip_address, "Gateway flag cleared");
            }
        }
        let unseen: Vec<String> = all
            .iter()
            .filter(|d| !seen_macs.contains(&d.mac_address) && d.status != DeviceStatus::Offline)
            .map(|d| d.id.clone())
            .collect();
        if !unseen.is_empty() {
            tracing::debug!(count = unseen.len(), "Marking unseen devices offline");
        }
        self.repos.devices.mark_offline(&unseen).await?;

        let devices = self
            .repos
            .devices
            .get_all()
            .await?
            .into_iter()
            .filter(|d| seen_macs.contains(&d.mac_address))
            .collect();
        Ok((devices_found, new_devices.len() as u32, devices))
    }

    /// Ping every host of the /24 (bounded, silent hosts get a second round), then merge two
    /// neighbor-table reads.
    async fn sweep(&self) -> Result<Sweep, DiscoveryError> {
        let info = self
            .probes
            .network
            .network_info()
            .await
            .ok_or(DiscoveryError::NoSubnet)?;
        let targets = subnet::sweep_targets(info.local_ip);
        tracing::debug!(
            subnet = %subnet::cidr_label(info.local_ip),
            gateway = ?info.gateway,
            local_ip = %info.local_ip,
            "Sweeping subnet"
        );

        let silent = self.ping_round(targets, self.settings.probe_timeout).await;
        let first_round_silent = silent.len();
        // Second, quicker round for hosts silent in the first.
        let still_silent = self.ping_round(silent, self.settings.retry_timeout).await;
        tracing::debug!(
            first_round_silent,
            late_responders = first_round_silent - still_silent.len(),
            "Ping sweep finished"
        );

        let first = self.probes.neighbors.read().await;
        tokio::time::sleep(self.settings.arp_settle).await;
        let second = self.probes.neighbors.read().await;
        let scope = info.prefix.min(24);
        let entries = subnet::merge_neighbor_reads(first, second)
            .into_iter()
            .filter(|e| e.ip != info.local_ip && same_subnet(e.ip, info.local_ip, scope))
            .collect();
        Ok(Sweep {
            gateway: info.gateway,
            entries,
        })
    }

    /// One bounded ping per target; returns the targets that did not answer.
    async fn ping_round(&self, targets: Vec<Ipv4Addr>, timeout: Duration) -> Vec<Ipv4Addr> {
        let reachability = &self.probes.reachability;
        stream::iter(targets)
            .map(|ip| async move {
                let alive = reachability.probe(IpAddr::V4(ip), 1, timeout).await.success_count > 0;
                (ip, alive)
            })
            .buffer_unordered(self.settings.sweep_concurrency)
            .filter_map(|(ip, alive)| std::future::ready((!alive).then_some(ip)))
            .collect()
            .await
    }

    async fn build_device(
        &self,
        entry: NeighborEntry,
        gateway: Option<Ipv4Addr>,
        now: i64,
    ) -> Device {
        let ip = IpAddr::V4(entry.ip);
        let mut device = Device::new(entry.ip.to_string(), entry.mac, now);
        device.is_gateway = gateway == Some(entry.ip);
        device.hostname = self.probes.resolver.reverse_resolve(ip).await;
        device.vendor = self.probes.vendors.resolve_vendor(&device.mac_address);
        if self.settings.port_scan && !self.settings.scan_ports.is_empty() {
            device.open_ports = self.probes.ports.open_ports(ip, &self.settings.scan_ports).await;
        }
        device.device_type = classify(&ClassifyInput {
            is_gateway: device.is_gateway,
            vendor: device.vendor.as_deref(),
            hostname: device.hostname.as_deref(),
            mac: &device.mac_address,
            open_ports: &device.open_ports,
        });
        device
    }
}
