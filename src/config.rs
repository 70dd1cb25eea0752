use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub isp: IspConfig,
    #[serde(default)]
    pub speedtest: SpeedTestConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_metric_retention_days")]
    pub metric_retention_days: u32,
    /// Health scores kept after each prune; older rows are deleted.
    #[serde(default = "default_health_history_keep")]
    pub health_history_keep: u32,
}

fn default_metric_retention_days() -> u32 {
    7
}

fn default_health_history_keep() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub interval_minutes: u64,
    /// Ping probes in flight during the subnet sweep.
    pub sweep_concurrency: usize,
    pub probe_timeout_ms: u64,
    /// Timeout of the second, faster round that re-probes hosts silent in the first.
    pub retry_timeout_ms: u64,
    /// Delay between the two neighbor-table reads.
    pub arp_settle_ms: u64,
    pub port_scan: bool,
    pub scan_ports: Vec<u16>,
    pub port_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            sweep_concurrency: 50,
            probe_timeout_ms: 2000,
            retry_timeout_ms: 500,
            arp_settle_ms: 2000,
            port_scan: true,
            scan_ports: vec![
                22, 23, 80, 139, 443, 445, 515, 548, 554, 631, 3306, 3389, 5000, 5001, 5432, 5900,
                8080, 8443, 8554, 9100,
            ],
            port_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub interval_secs: u64,
    pub ping_count: u32,
    pub ping_timeout_ms: u64,
    /// Devices probed concurrently by one ProbeAll.
    pub batch_size: usize,
    /// Metric window handed to diagnostics and health scoring.
    pub lookback_minutes: i64,
    /// How often to log agent stats at INFO level.
    pub stats_log_interval_secs: u64,
    pub prune_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            ping_count: 3,
            ping_timeout_ms: 5000,
            batch_size: 10,
            lookback_minutes: 60,
            stats_log_interval_secs: 300,
            prune_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Cron expression (with seconds) for the diagnostics + health pass, local time.
    pub schedule: String,
    pub dns_domain: String,
    pub dns_timeout_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            schedule: "0 */5 * * * *".into(),
            dns_domain: "google.com".into(),
            dns_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub high_latency_ms: f64,
    pub packet_loss_percent: f64,
    pub speed_degraded_percent: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            high_latency_ms: 100.0,
            packet_loss_percent: 5.0,
            speed_degraded_percent: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub cooldown_minutes: i64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IspConfig {
    pub contracted_download_mbps: Option<f64>,
    pub contracted_upload_mbps: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeedTestConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub timeout_secs: u64,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 360,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub broadcast_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
        }
    }
}

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 24 * 60 * MINUTE_MS;

impl AppConfig {
    /// Metric window for diagnostics and health scoring.
    pub fn lookback_ms(&self) -> i64 {
        self.monitoring.lookback_minutes.saturating_mul(MINUTE_MS)
    }

    pub fn cooldown_ms(&self) -> i64 {
        self.alerts.cooldown_minutes.saturating_mul(MINUTE_MS)
    }

    pub fn metric_retention_ms(&self) -> i64 {
        i64::from(self.database.metric_retention_days).saturating_mul(DAY_MS)
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.metric_retention_days > 0,
            "database.metric_retention_days must be > 0, got {}",
            self.database.metric_retention_days
        );
        anyhow::ensure!(
            self.database.health_history_keep > 0,
            "database.health_history_keep must be > 0, got {}",
            self.database.health_history_keep
        );
        anyhow::ensure!(
            self.discovery.interval_minutes > 0,
            "discovery.interval_minutes must be > 0, got {}",
            self.discovery.interval_minutes
        );
        anyhow::ensure!(
            (1..=254).contains(&self.discovery.sweep_concurrency),
            "discovery.sweep_concurrency must be between 1 and 254, got {}",
            self.discovery.sweep_concurrency
        );
        anyhow::ensure!(
            self.discovery.probe_timeout_ms > 0,
            "discovery.probe_timeout_ms must be > 0, got {}",
            self.discovery.probe_timeout_ms
        );
        anyhow::ensure!(
            self.discovery.retry_timeout_ms > 0,
            "discovery.retry_timeout_ms must be > 0, got {}",
            self.discovery.retry_timeout_ms
        );
        anyhow::ensure!(
            self.discovery.port_timeout_ms > 0,
            "discovery.port_timeout_ms must be > 0, got {}",
            self.discovery.port_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.interval_secs > 0,
            "monitoring.interval_secs must be > 0, got {}",
            self.monitoring.interval_secs
        );
        anyhow::ensure!(
            self.monitoring.ping_count > 0,
            "monitoring.ping_count must be > 0, got {}",
            self.monitoring.ping_count
        );
        anyhow::ensure!(
            self.monitoring.ping_timeout_ms > 0,
            "monitoring.ping_timeout_ms must be > 0, got {}",
            self.monitoring.ping_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.batch_size > 0,
            "monitoring.batch_size must be > 0, got {}",
            self.monitoring.batch_size
        );
        anyhow::ensure!(
            self.monitoring.lookback_minutes > 0,
            "monitoring.lookback_minutes must be > 0, got {}",
            self.monitoring.lookback_minutes
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.prune_interval_secs > 0,
            "monitoring.prune_interval_secs must be > 0, got {}",
            self.monitoring.prune_interval_secs
        );
        if let Err(e) = cron::Schedule::from_str(&self.diagnostics.schedule) {
            anyhow::bail!(
                "diagnostics.schedule is not a valid cron expression ({:?}): {}",
                self.diagnostics.schedule,
                e
            );
        }
        anyhow::ensure!(
            !self.diagnostics.dns_domain.is_empty(),
            "diagnostics.dns_domain must be non-empty"
        );
        anyhow::ensure!(
            self.thresholds.high_latency_ms > 0.0,
            "thresholds.high_latency_ms must be > 0, got {}",
            self.thresholds.high_latency_ms
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.thresholds.packet_loss_percent),
            "thresholds.packet_loss_percent must be between 0 and 100, got {}",
            self.thresholds.packet_loss_percent
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.thresholds.speed_degraded_percent),
            "thresholds.speed_degraded_percent must be between 0 and 100, got {}",
            self.thresholds.speed_degraded_percent
        );
        anyhow::ensure!(
            self.alerts.cooldown_minutes >= 0,
            "alerts.cooldown_minutes must be >= 0, got {}",
            self.alerts.cooldown_minutes
        );
        for (name, value) in [
            ("isp.contracted_download_mbps", self.isp.contracted_download_mbps),
            ("isp.contracted_upload_mbps", self.isp.contracted_upload_mbps),
        ] {
            if let Some(v) = value {
                anyhow::ensure!(v > 0.0, "{} must be > 0 when set, got {}", name, v);
            }
        }
        if self.speedtest.enabled {
            anyhow::ensure!(
                self.speedtest.interval_minutes > 0,
                "speedtest.interval_minutes must be > 0, got {}",
                self.speedtest.interval_minutes
            );
        }
        anyhow::ensure!(
            self.speedtest.timeout_secs > 0,
            "speedtest.timeout_secs must be > 0, got {}",
            self.speedtest.timeout_secs
        );
        anyhow::ensure!(
            self.events.broadcast_capacity > 0,
            "events.broadcast_capacity must be > 0, got {}",
            self.events.broadcast_capacity
        );
        Ok(())
    }
}
