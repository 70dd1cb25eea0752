// Read-only snapshot handed to every rule in one pass.

use crate::models::{Device, Metric, SpeedTestResult};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub high_latency_ms: f64,
    pub packet_loss_percent: f64,
    pub speed_degraded_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_latency_ms: 100.0,
            packet_loss_percent: 5.0,
            speed_degraded_percent: 50.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    /// Pass time, unix millis.
    pub now: i64,
    pub devices: Vec<Device>,
    /// Samples inside the lookback window per device id, oldest first.
    pub metrics_by_device: HashMap<String, Vec<Metric>>,
    pub latest_speed_test: Option<SpeedTestResult>,
    /// Up to the last 10 results, oldest first.
    pub recent_speed_tests: Vec<SpeedTestResult>,
    pub dns_latency_ms: Option<f64>,
    pub contracted_download_mbps: Option<f64>,
    pub contracted_upload_mbps: Option<f64>,
    pub thresholds: Thresholds,
}

impl DiagnosticContext {
    pub fn metrics_for(&self, device_id: &str) -> &[Metric] {
        self.metrics_by_device
            .get(device_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn gateway(&self) -> Option<&Device> {
        self.devices.iter().find(|d| d.is_gateway)
    }

    pub fn monitored(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.is_monitored)
    }
}

/// Latencies of reachable samples, in order.
pub fn reachable_latencies(metrics: &[Metric]) -> Vec<f64> {
    metrics
        .iter()
        .filter(|m| m.is_reachable)
        .filter_map(|m| m.latency_ms)
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn average_latency(metrics: &[Metric]) -> Option<f64> {
    mean(&reachable_latencies(metrics))
}

pub fn average_packet_loss(metrics: &[Metric]) -> Option<f64> {
    let losses: Vec<f64> = metrics.iter().map(|m| m.packet_loss).collect();
    mean(&losses)
}
