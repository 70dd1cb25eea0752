// Repository seams. Engines only see these traits; `sqlite` is the shipped implementation.

pub mod sqlite;

use crate::models::{Alert, Device, DeviceStatus, HealthScore, Metric, Problem, Scan, SpeedTestResult};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait DeviceRepo: Send + Sync {
    async fn get_all(&self) -> anyhow::Result<Vec<Device>>;
    async fn get_monitored(&self) -> anyhow::Result<Vec<Device>>;
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Device>>;
    async fn find_by_mac(&self, mac: &str) -> anyhow::Result<Option<Device>>;
    async fn create(&self, device: &Device) -> anyhow::Result<()>;
    /// Full overwrite of the mutable columns (everything but id, MAC and first-seen).
    async fn update(&self, device: &Device) -> anyhow::Result<()>;
    /// Sighting during discovery: online, new IP, last-seen refreshed.
    async fn mark_seen(&self, id: &str, ip_address: &str, now: i64) -> anyhow::Result<()>;
    async fn mark_offline(&self, ids: &[String]) -> anyhow::Result<()>;
    async fn update_status(
        &self,
        id: &str,
        status: DeviceStatus,
        latency_ms: Option<f64>,
        packet_loss: Option<f64>,
    ) -> anyhow::Result<()>;
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait MetricRepo: Send + Sync {
    async fn insert_many(&self, metrics: &[Metric]) -> anyhow::Result<()>;
    /// Samples at or after `since`, oldest first.
    async fn get_since(&self, since: i64) -> anyhow::Result<Vec<Metric>>;
    async fn get_for_device_since(&self, device_id: &str, since: i64) -> anyhow::Result<Vec<Metric>>;
    async fn prune_before(&self, cutoff: i64) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait SpeedTestRepo: Send + Sync {
    async fn insert(&self, result: &SpeedTestResult) -> anyhow::Result<()>;
    async fn latest(&self) -> anyhow::Result<Option<SpeedTestResult>>;
    /// Last `limit` results, oldest first.
    async fn recent(&self, limit: u32) -> anyhow::Result<Vec<SpeedTestResult>>;
}

#[async_trait]
pub trait ProblemRepo: Send + Sync {
    async fn find_active_by_rule_id(&self, rule_id: &str) -> anyhow::Result<Option<Problem>>;
    /// Fails if an active problem already exists for the same rule id.
    async fn create(&self, problem: &Problem) -> anyhow::Result<()>;
    /// Refreshes text, severity and affected devices of an active problem. Id and detected-at never change.
    async fn update_active(&self, problem: &Problem) -> anyhow::Result<()>;
    async fn get_active(&self) -> anyhow::Result<Vec<Problem>>;
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Problem>>;
    async fn resolve(&self, id: &str, resolved_at: i64) -> anyhow::Result<()>;
    /// Most recent resolution time of any problem with this rule id.
    async fn last_resolved_at(&self, rule_id: &str) -> anyhow::Result<Option<i64>>;
    async fn get_by_rule_id(&self, rule_id: &str) -> anyhow::Result<Vec<Problem>>;
}

#[async_trait]
pub trait AlertRepo: Send + Sync {
    async fn create(&self, alert: &Alert) -> anyhow::Result<()>;
    /// Newest first.
    async fn get_recent(&self, limit: u32) -> anyhow::Result<Vec<Alert>>;
    async fn get_unread(&self) -> anyhow::Result<Vec<Alert>>;
    async fn mark_read(&self, id: &str, read_at: i64) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn insert(&self, score: &HealthScore) -> anyhow::Result<()>;
    async fn latest(&self) -> anyhow::Result<Option<HealthScore>>;
    /// Newest first.
    async fn history(&self, limit: u32) -> anyhow::Result<Vec<HealthScore>>;
    /// Deletes all but the newest `keep` rows.
    async fn trim(&self, keep: u32) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait ScanRepo: Send + Sync {
    async fn create(&self, scan: &Scan) -> anyhow::Result<()>;
    async fn update(&self, scan: &Scan) -> anyhow::Result<()>;
    async fn latest(&self) -> anyhow::Result<Option<Scan>>;
}

/// Explicit store dependencies handed to every engine.
#[derive(Clone)]
pub struct Repositories {
    pub devices: Arc<dyn DeviceRepo>,
    pub metrics: Arc<dyn MetricRepo>,
    pub speed_tests: Arc<dyn SpeedTestRepo>,
    pub problems: Arc<dyn ProblemRepo>,
    pub alerts: Arc<dyn AlertRepo>,
    pub health: Arc<dyn HealthRepo>,
    pub scans: Arc<dyn ScanRepo>,
}

impl Repositories {
    pub fn sqlite(store: Arc<sqlite::SqliteStore>) -> Self {
        Self {
            devices: store.clone(),
            metrics: store.clone(),
            speed_tests: store.clone(),
            problems: store.clone(),
            alerts: store.clone(),
            health: store.clone(),
            scans: store,
        }
    }
}
