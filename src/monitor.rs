// Metrics collector: probes monitored devices, stores one Metric each, writes status back.

use crate::config::{MonitoringConfig, ThresholdsConfig};
use crate::models::{Device, DeviceStatus, Metric, now_ms};
use crate::probes::{PingOutcome, ReachabilityProbe};
use crate::store::Repositories;
use futures_util::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub ping_count: u32,
    pub ping_timeout: Duration,
    pub batch_size: usize,
    pub high_latency_ms: f64,
    pub packet_loss_percent: f64,
}

impl MonitorSettings {
    pub fn from_config(monitoring: &MonitoringConfig, thresholds: &ThresholdsConfig) -> Self {
        Self {
            ping_count: monitoring.ping_count.max(1),
            ping_timeout: Duration::from_millis(monitoring.ping_timeout_ms),
            batch_size: monitoring.batch_size.max(1),
            high_latency_ms: thresholds.high_latency_ms,
            packet_loss_percent: thresholds.packet_loss_percent,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Mean absolute difference between consecutive samples; None below two samples.
pub fn jitter(samples: &[f64]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let total: f64 = samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    Some(total / (samples.len() - 1) as f64)
}

pub fn metric_from_outcome(
    device_id: &str,
    outcome: &PingOutcome,
    count: u32,
    timestamp: i64,
) -> Metric {
    let successes = outcome.success_count.min(count);
    if successes == 0 || outcome.samples.is_empty() {
        return Metric::unreachable(device_id, timestamp);
    }
    let avg = outcome.samples.iter().sum::<f64>() / outcome.samples.len() as f64;
    Metric {
        device_id: device_id.to_string(),
        timestamp,
        latency_ms: Some(round2(avg)),
        packet_loss: round2((count - successes) as f64 / count as f64 * 100.0),
        jitter_ms: jitter(&outcome.samples).map(round2),
        is_reachable: true,
    }
}

pub fn derive_status(metric: &Metric, high_latency_ms: f64, packet_loss_percent: f64) -> DeviceStatus {
    if !metric.is_reachable {
        return DeviceStatus::Offline;
    }
    let slow = metric.latency_ms.is_some_and(|l| l > high_latency_ms);
    if slow || metric.packet_loss > packet_loss_percent {
        DeviceStatus::Degraded
    } else {
        DeviceStatus::Online
    }
}

pub struct MetricsCollector {
    repos: Repositories,
    probe: Arc<dyn ReachabilityProbe>,
    settings: MonitorSettings,
}

impl MetricsCollector {
    pub fn new(repos: Repositories, probe: Arc<dyn ReachabilityProbe>, settings: MonitorSettings) -> Self {
        Self {
            repos,
            probe,
            settings,
        }
    }

    /// Probe one device, persist the sample and the derived status.
    pub async fn probe_one(&self, device: &Device) -> anyhow::Result<Metric> {
        let count = self.settings.ping_count;
        let outcome = match device.ip_address.parse::<IpAddr>() {
            Ok(ip) => self.probe.probe(ip, count, self.settings.ping_timeout).await,
            Err(e) => {
                tracing::warn!(error = %e, device_id = %device.id, ip = %device.ip_address, "Unparseable device address");
                PingOutcome::default()
            }
        };
        let metric = metric_from_outcome(&device.id, &outcome, count, now_ms());
        let status = derive_status(
            &metric,
            self.settings.high_latency_ms,
            self.settings.packet_loss_percent,
        );
        self.repos.metrics.insert_many(std::slice::from_ref(&metric)).await?;
        self.repos
            .devices
            .update_status(&device.id, status, metric.latency_ms, Some(metric.packet_loss))
            .await?;
        if status != device.status {
            tracing::info!(
                device_id = %device.id,
                name = device.display_name(),
                from = %device.status,
                to = %status,
                "Device status changed"
            );
        }
        Ok(metric)
    }

    /// Probe every monitored device in batches. A failing device is logged and skipped.
    pub async fn probe_all(&self) -> anyhow::Result<Vec<Metric>> {
        let devices = self.repos.devices.get_monitored().await?;
        let mut metrics = Vec::with_capacity(devices.len());
        for batch in devices.chunks(self.settings.batch_size) {
            let results = join_all(batch.iter().map(|d| self.probe_one(d))).await;
            for (device, result) in batch.iter().zip(results) {
                match result {
                    Ok(m) => metrics.push(m),
                    Err(e) => tracing::warn!(
                        error = %e,
                        operation = "probe_one",
                        device_id = %device.id,
                        "Device probe failed"
                    ),
                }
            }
        }
        let reachable = metrics.iter().filter(|m| m.is_reachable).count();
        tracing::debug!(
            probed = metrics.len(),
            reachable,
            "Ping round finished"
        );
        Ok(metrics)
    }
}
