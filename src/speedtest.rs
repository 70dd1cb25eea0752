// Records internet speed measurements against the contracted plan.

use crate::events::{Event, EventSink};
use crate::models::{SpeedTestResult, Trigger, now_ms};
use crate::probes::{SpeedMeasurement, SpeedTester};
use crate::store::Repositories;
use std::sync::Arc;

fn percent_of(measured: f64, contracted: Option<f64>) -> Option<f64> {
    contracted
        .filter(|c| *c > 0.0)
        .map(|c| (measured / c * 100.0).round())
}

pub fn build_result(
    measurement: SpeedMeasurement,
    contracted_download_mbps: Option<f64>,
    contracted_upload_mbps: Option<f64>,
    triggered_by: Trigger,
    timestamp: i64,
) -> SpeedTestResult {
    SpeedTestResult {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        download_percent: percent_of(measurement.download_mbps, contracted_download_mbps),
        upload_percent: percent_of(measurement.upload_mbps, contracted_upload_mbps),
        download_mbps: measurement.download_mbps,
        upload_mbps: measurement.upload_mbps,
        ping_ms: measurement.ping_ms,
        jitter_ms: measurement.jitter_ms,
        isp: measurement.isp,
        server_name: measurement.server_name,
        server_location: measurement.server_location,
        contracted_download_mbps,
        contracted_upload_mbps,
        triggered_by,
    }
}

pub struct SpeedTestRunner {
    repos: Repositories,
    tester: Arc<dyn SpeedTester>,
    events: Arc<dyn EventSink>,
    contracted_download_mbps: Option<f64>,
    contracted_upload_mbps: Option<f64>,
    running: tokio::sync::Mutex<()>,
}

impl SpeedTestRunner {
    pub fn new(
        repos: Repositories,
        tester: Arc<dyn SpeedTester>,
        events: Arc<dyn EventSink>,
        contracted_download_mbps: Option<f64>,
        contracted_upload_mbps: Option<f64>,
    ) -> Self {
        Self {
            repos,
            tester,
            events,
            contracted_download_mbps,
            contracted_upload_mbps,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one test (never two at once) and stores it.
    pub async fn run(&self, trigger: Trigger) -> anyhow::Result<SpeedTestResult> {
        let Ok(_guard) = self.running.try_lock() else {
            anyhow::bail!("a speed test is already running");
        };
        let measurement = self.tester.run().await?;
        let result = build_result(
            measurement,
            self.contracted_download_mbps,
            self.contracted_upload_mbps,
            trigger,
            now_ms(),
        );
        self.repos.speed_tests.insert(&result).await?;
        tracing::info!(
            download_mbps = result.download_mbps,
            upload_mbps = result.upload_mbps,
            ping_ms = result.ping_ms,
            download_percent = ?result.download_percent,
            "Speed test recorded"
        );
        self.events.emit(Event::SpeedTestCompleted(result.clone()));
        Ok(result)
    }
}
