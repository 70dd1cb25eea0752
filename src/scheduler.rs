// Periodic agent loop: discovery, ping rounds, speed tests, diagnostics + health, pruning, stats.
// Discovery and speed tests run in their own tasks so a long sweep never delays a ping round;
// their engines reject overlapping runs.

use crate::diagnostics::DiagnosticEngine;
use crate::discovery::DiscoveryEngine;
use crate::error::DiscoveryError;
use crate::health::HealthAggregator;
use crate::models::{Trigger, now_ms};
use crate::monitor::MetricsCollector;
use crate::speedtest::SpeedTestRunner;
use crate::store::Repositories;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::Instrument;

/// Engines, stores and shutdown for the scheduler.
pub struct SchedulerDeps {
    pub discovery: Arc<DiscoveryEngine>,
    pub collector: Arc<MetricsCollector>,
    pub diagnostics: Arc<DiagnosticEngine>,
    pub health: Arc<HealthAggregator>,
    /// None when speed tests are disabled.
    pub speed_tests: Option<Arc<SpeedTestRunner>>,
    pub repos: Repositories,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Scheduler timing. Intervals are real time; the diagnostics schedule uses local time.
pub struct SchedulerConfig {
    pub discovery_interval_secs: u64,
    pub ping_interval_secs: u64,
    pub speed_test_interval_secs: u64,
    pub diagnostics_schedule: cron::Schedule,
    pub metric_retention_ms: i64,
    pub health_history_keep: u32,
    pub prune_interval_secs: u64,
    pub stats_log_interval_secs: u64,
}

/// Sends on `tx` at each scheduled diagnostics time.
async fn diagnostics_ticker(schedule: cron::Schedule, tx: mpsc::Sender<()>) {
    loop {
        let now = chrono::Local::now();
        match schedule.after(&now).next() {
            Some(next) => {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
            None => tokio::time::sleep(Duration::from_secs(3600)).await,
        }
    }
}

fn spawn_discovery(
    discovery: Arc<DiscoveryEngine>,
    trigger: Trigger,
    runs_total: Arc<AtomicU64>,
) {
    tokio::spawn(async move {
        match discovery.discover(trigger).await {
            Ok(_) => {
                runs_total.fetch_add(1, Ordering::Relaxed);
            }
            Err(DiscoveryError::AlreadyRunning) => {
                tracing::debug!(operation = "discover", "Previous discovery still running; skipped");
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "discover", "Discovery run failed");
            }
        }
    });
}

pub fn spawn(deps: SchedulerDeps, config: SchedulerConfig) -> tokio::task::JoinHandle<()> {
    let SchedulerDeps {
        discovery,
        collector,
        diagnostics,
        health,
        speed_tests,
        repos,
        mut shutdown_rx,
    } = deps;
    let SchedulerConfig {
        discovery_interval_secs,
        ping_interval_secs,
        speed_test_interval_secs,
        diagnostics_schedule,
        metric_retention_ms,
        health_history_keep,
        prune_interval_secs,
        stats_log_interval_secs,
    } = config;

    let span = tracing::span!(tracing::Level::DEBUG, "scheduler", ping_interval_secs);
    tokio::spawn(async move {
        let mut discovery_tick = interval(Duration::from_secs(discovery_interval_secs));
        discovery_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ping_tick = interval(Duration::from_secs(ping_interval_secs));
        ping_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut speed_tick = interval(Duration::from_secs(speed_test_interval_secs.max(1)));
        speed_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(prune_interval_secs));
        prune_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval completes immediately; skip it for the periodic-only jobs.
        speed_tick.tick().await;
        stats_log_tick.tick().await;

        let (diag_tx, mut diag_rx) = mpsc::channel::<()>(1);
        tokio::spawn(diagnostics_ticker(diagnostics_schedule, diag_tx));

        let discovery_runs_total = Arc::new(AtomicU64::new(0));
        let mut ping_rounds_total: u64 = 0;
        let mut diagnostics_passes_total: u64 = 0;
        let mut metrics_pruned_total: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("Scheduler shutting down");
                    break;
                }
                _ = discovery_tick.tick() => {
                    spawn_discovery(discovery.clone(), Trigger::Scheduled, discovery_runs_total.clone());
                }
                _ = ping_tick.tick() => {
                    match collector.probe_all().await {
                        Ok(_) => ping_rounds_total += 1,
                        Err(e) => tracing::warn!(error = %e, operation = "probe_all", "Ping round failed"),
                    }
                }
                _ = speed_tick.tick(), if speed_tests.is_some() => {
                    if let Some(runner) = speed_tests.clone() {
                        tokio::spawn(async move {
                            if let Err(e) = runner.run(Trigger::Scheduled).await {
                                tracing::warn!(error = %e, operation = "speed_test", "Speed test failed");
                            }
                        });
                    }
                }
                Some(()) = diag_rx.recv() => {
                    match diagnostics.run_diagnostics().await {
                        Ok(_) => diagnostics_passes_total += 1,
                        Err(e) => tracing::warn!(error = %e, operation = "run_diagnostics", "Diagnostics pass failed"),
                    }
                    if let Err(e) = health.calculate_health_score().await {
                        tracing::warn!(error = %e, operation = "calculate_health_score", "Health score failed");
                    }
                }
                _ = prune_tick.tick() => {
                    match repos.metrics.prune_before(now_ms() - metric_retention_ms).await {
                        Ok(n) => metrics_pruned_total += n,
                        Err(e) => tracing::warn!(error = %e, operation = "prune_metrics", "Failed to prune metrics"),
                    }
                    if let Err(e) = repos.health.trim(health_history_keep).await {
                        tracing::warn!(error = %e, operation = "trim_health", "Failed to trim health history");
                    }
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        discovery_runs_total = discovery_runs_total.load(Ordering::Relaxed),
                        ping_rounds_total,
                        diagnostics_passes_total,
                        metrics_pruned_total,
                        "agent stats"
                    );
                }
            }
        }
    }.instrument(span))
}
