// Weighted health score over five independent factors, with trend against the last stored score.

use crate::diagnostics::context::average_latency;
use crate::events::{Event, EventSink};
use crate::models::{
    DeviceStatus, FactorResult, HealthCategory, HealthScore, Severity, Trend, now_ms,
};
use crate::store::Repositories;
use std::sync::Arc;

/// Score used for a factor whose inputs could not be read.
pub const NEUTRAL_SCORE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    GatewayLatency,
    PacketLoss,
    InternetSpeed,
    DeviceAvailability,
    ActiveProblems,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::GatewayLatency,
        Factor::PacketLoss,
        Factor::InternetSpeed,
        Factor::DeviceAvailability,
        Factor::ActiveProblems,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Factor::GatewayLatency => "Gateway latency",
            Factor::PacketLoss => "Packet loss",
            Factor::InternetSpeed => "Internet speed",
            Factor::DeviceAvailability => "Device availability",
            Factor::ActiveProblems => "Active problems",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Factor::GatewayLatency | Factor::PacketLoss => 0.25,
            Factor::InternetSpeed => 0.20,
            Factor::DeviceAvailability | Factor::ActiveProblems => 0.15,
        }
    }
}

pub fn gateway_latency_bucket(avg_ms: f64) -> f64 {
    match avg_ms {
        v if v < 5.0 => 100.0,
        v if v < 20.0 => 80.0,
        v if v < 50.0 => 60.0,
        v if v < 100.0 => 50.0,
        v if v < 200.0 => 40.0,
        _ => 0.0,
    }
}

pub fn packet_loss_bucket(avg_percent: f64) -> f64 {
    match avg_percent {
        v if v <= 0.0 => 100.0,
        v if v < 1.0 => 90.0,
        v if v < 3.0 => 70.0,
        v if v < 5.0 => 50.0,
        v if v < 10.0 => 30.0,
        _ => 0.0,
    }
}

pub fn speed_percent_bucket(percent_of_contracted: f64) -> f64 {
    match percent_of_contracted {
        v if v > 90.0 => 100.0,
        v if v > 70.0 => 80.0,
        v if v > 50.0 => 60.0,
        v if v > 30.0 => 40.0,
        _ => 10.0,
    }
}

pub fn speed_absolute_bucket(download_mbps: f64) -> f64 {
    match download_mbps {
        v if v > 50.0 => 90.0,
        v if v > 20.0 => 70.0,
        v if v > 5.0 => 50.0,
        _ => 30.0,
    }
}

pub fn problems_score(critical: usize, warning: usize, info: usize) -> f64 {
    (100.0 - (30 * critical + 15 * warning + 5 * info) as f64).max(0.0)
}

/// Round and clamp to 0-100.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Rounded weighted sum, clamped.
pub fn weighted_total(factors: &[FactorResult]) -> u8 {
    clamp_score(factors.iter().map(|f| f.score as f64 * f.weight).sum())
}

pub struct HealthAggregator {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    lookback_ms: i64,
    contracted_download_mbps: Option<f64>,
}

impl HealthAggregator {
    pub fn new(
        repos: Repositories,
        events: Arc<dyn EventSink>,
        lookback_ms: i64,
        contracted_download_mbps: Option<f64>,
    ) -> Self {
        Self {
            repos,
            events,
            lookback_ms,
            contracted_download_mbps,
        }
    }

    pub async fn calculate_health_score(&self) -> anyhow::Result<HealthScore> {
        self.calculate_health_score_at(now_ms()).await
    }

    /// Factor failures fall back to the neutral score. Only reading the previous score and
    /// persisting the new one can fail.
    pub async fn calculate_health_score_at(&self, now: i64) -> anyhow::Result<HealthScore> {
        let mut factors = Vec::with_capacity(Factor::ALL.len());
        for factor in Factor::ALL {
            let (score, description) = match self.evaluate(factor, now).await {
                Ok((raw, description)) => (clamp_score(raw), description),
                Err(e) => {
                    tracing::warn!(error = %e, factor = factor.name(), "Health factor failed, using neutral score");
                    (NEUTRAL_SCORE, "Data unavailable".to_string())
                }
            };
            factors.push(FactorResult {
                name: factor.name().to_string(),
                score,
                weight: factor.weight(),
                description,
            });
        }

        let score = weighted_total(&factors);
        let previous_score = self.repos.health.latest().await?.map(|h| h.score);
        let health = HealthScore {
            id: uuid::Uuid::new_v4().to_string(),
            score,
            category: HealthCategory::from_score(score),
            factors,
            trend: Trend::between(previous_score, score),
            previous_score,
            calculated_at: now,
        };
        self.repos.health.insert(&health).await?;
        tracing::info!(
            score = health.score,
            category = %health.category,
            trend = %health.trend,
            "Health score updated"
        );
        self.events.emit(Event::HealthUpdated(health.clone()));
        Ok(health)
    }

    async fn evaluate(&self, factor: Factor, now: i64) -> anyhow::Result<(f64, String)> {
        match factor {
            Factor::GatewayLatency => self.gateway_latency(now).await,
            Factor::PacketLoss => self.packet_loss(now).await,
            Factor::InternetSpeed => self.internet_speed().await,
            Factor::DeviceAvailability => self.availability().await,
            Factor::ActiveProblems => self.active_problems().await,
        }
    }

    async fn gateway_latency(&self, now: i64) -> anyhow::Result<(f64, String)> {
        let devices = self.repos.devices.get_all().await?;
        let Some(gateway) = devices.iter().find(|d| d.is_gateway) else {
            return Ok((50.0, "No gateway identified".into()));
        };
        let metrics = self
            .repos
            .metrics
            .get_for_device_since(&gateway.id, now - self.lookback_ms)
            .await?;
        match average_latency(&metrics) {
            Some(avg) => Ok((
                gateway_latency_bucket(avg),
                format!("Average gateway latency {:.0} ms", avg),
            )),
            None => Ok((20.0, "Gateway not responding".into())),
        }
    }

    async fn packet_loss(&self, now: i64) -> anyhow::Result<(f64, String)> {
        let since = now - self.lookback_ms;
        let mut per_device = Vec::new();
        for device in self.repos.devices.get_monitored().await? {
            let metrics = self.repos.metrics.get_for_device_since(&device.id, since).await?;
            if !metrics.is_empty() {
                per_device.push(metrics.iter().map(|m| m.packet_loss).sum::<f64>() / metrics.len() as f64);
            }
        }
        if per_device.is_empty() {
            return Ok((100.0, "No packet loss data".into()));
        }
        let avg = per_device.iter().sum::<f64>() / per_device.len() as f64;
        Ok((
            packet_loss_bucket(avg),
            format!("Average packet loss {:.1}% across {} devices", avg, per_device.len()),
        ))
    }

    async fn internet_speed(&self) -> anyhow::Result<(f64, String)> {
        let Some(test) = self.repos.speed_tests.latest().await? else {
            return Ok((50.0, "No speed test data".into()));
        };
        let contracted = test
            .contracted_download_mbps
            .or(self.contracted_download_mbps)
            .filter(|c| *c > 0.0);
        Ok(match contracted {
            Some(c) => {
                let percent = test.download_mbps / c * 100.0;
                (
                    speed_percent_bucket(percent),
                    format!("{:.0}% of contracted download speed", percent),
                )
            }
            None => (
                speed_absolute_bucket(test.download_mbps),
                format!("{:.1} Mbps download", test.download_mbps),
            ),
        })
    }

    async fn availability(&self) -> anyhow::Result<(f64, String)> {
        let devices = self.repos.devices.get_monitored().await?;
        if devices.is_empty() {
            return Ok((100.0, "No monitored devices".into()));
        }
        let online = devices
            .iter()
            .filter(|d| d.status == DeviceStatus::Online)
            .count();
        Ok((
            (online as f64 / devices.len() as f64 * 100.0).round(),
            format!("{} of {} devices online", online, devices.len()),
        ))
    }

    async fn active_problems(&self) -> anyhow::Result<(f64, String)> {
        let active = self.repos.problems.get_active().await?;
        let count = |s: Severity| active.iter().filter(|p| p.severity == s).count();
        let (critical, warning, info) = (
            count(Severity::Critical),
            count(Severity::Warning),
            count(Severity::Info),
        );
        Ok((
            problems_score(critical, warning, info),
            format!(
                "{} critical, {} warning, {} info problems active",
                critical, warning, info
            ),
        ))
    }
}
