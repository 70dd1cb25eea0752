use anyhow::Result;
use lanwatch::*;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store = Arc::new(
        store::sqlite::SqliteStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;
    let repos = store::Repositories::sqlite(store);

    let sink = Arc::new(events::BroadcastSink::new(app_config.events.broadcast_capacity));
    let mut event_rx = sink.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            tracing::debug!(event = event.name(), "event");
        }
    });
    let events: Arc<dyn events::EventSink> = sink;

    let probes = probes::Probes::system(&probes::SystemProbeConfig {
        port_timeout: Duration::from_millis(app_config.discovery.port_timeout_ms),
        dns_timeout: Duration::from_millis(app_config.diagnostics.dns_timeout_ms),
        command_timeout: Duration::from_secs(5),
    });

    let discovery = Arc::new(discovery::DiscoveryEngine::new(
        repos.clone(),
        probes.clone(),
        events.clone(),
        discovery::DiscoverySettings::from(&app_config.discovery),
    ));
    let collector = Arc::new(monitor::MetricsCollector::new(
        repos.clone(),
        probes.reachability.clone(),
        monitor::MonitorSettings::from_config(&app_config.monitoring, &app_config.thresholds),
    ));
    let diagnostics = Arc::new(diagnostics::DiagnosticEngine::new(
        repos.clone(),
        probes.dns.clone(),
        events.clone(),
        diagnostics::DiagnosticsSettings::from_config(&app_config),
    ));
    let health = Arc::new(health::HealthAggregator::new(
        repos.clone(),
        events.clone(),
        app_config.lookback_ms(),
        app_config.isp.contracted_download_mbps,
    ));
    let speed_tests = app_config.speedtest.enabled.then(|| {
        Arc::new(speedtest::SpeedTestRunner::new(
            repos.clone(),
            Arc::new(probes::speedtest::SpeedtestCli::new(Duration::from_secs(
                app_config.speedtest.timeout_secs,
            ))),
            events.clone(),
            app_config.isp.contracted_download_mbps,
            app_config.isp.contracted_upload_mbps,
        ))
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_handle = scheduler::spawn(
        scheduler::SchedulerDeps {
            discovery,
            collector,
            diagnostics,
            health,
            speed_tests,
            repos,
            shutdown_rx,
        },
        scheduler::SchedulerConfig {
            discovery_interval_secs: app_config.discovery.interval_minutes * 60,
            ping_interval_secs: app_config.monitoring.interval_secs,
            speed_test_interval_secs: app_config.speedtest.interval_minutes * 60,
            diagnostics_schedule: cron::Schedule::from_str(&app_config.diagnostics.schedule)
                .map_err(|e| anyhow::anyhow!("diagnostics.schedule: {}", e))?,
            metric_retention_ms: app_config.metric_retention_ms(),
            health_history_keep: app_config.database.health_history_keep,
            prune_interval_secs: app_config.monitoring.prune_interval_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );
    tracing::info!(database = %app_config.database.path, "lanwatch agent started");

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    Ok(())
}
