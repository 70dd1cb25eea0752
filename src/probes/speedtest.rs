// Internet speed via the Ookla `speedtest` CLI (JSON), falling back to `speedtest-cli --json`.

use super::{SpeedMeasurement, SpeedTester, run_command};
use crate::error::ProbeError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

fn str_field(v: &Value, path: &[&str]) -> Option<String> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str().map(str::to_string)
}

fn num_field(v: &Value, path: &[&str]) -> Option<f64> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_f64()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Ookla CLI: bandwidth is bytes per second.
pub fn parse_ookla_json(output: &str) -> Result<SpeedMeasurement, ProbeError> {
    let v: Value = serde_json::from_str(output).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let download = num_field(&v, &["download", "bandwidth"])
        .ok_or_else(|| ProbeError::Parse("missing download.bandwidth".into()))?;
    let upload = num_field(&v, &["upload", "bandwidth"])
        .ok_or_else(|| ProbeError::Parse("missing upload.bandwidth".into()))?;
    Ok(SpeedMeasurement {
        download_mbps: round2(download * 8.0 / 1_000_000.0),
        upload_mbps: round2(upload * 8.0 / 1_000_000.0),
        ping_ms: num_field(&v, &["ping", "latency"]).unwrap_or(0.0),
        jitter_ms: num_field(&v, &["ping", "jitter"]),
        isp: str_field(&v, &["isp"]),
        server_name: str_field(&v, &["server", "name"]),
        server_location: str_field(&v, &["server", "location"]),
    })
}

/// speedtest-cli: download/upload are bits per second.
pub fn parse_speedtest_cli_json(output: &str) -> Result<SpeedMeasurement, ProbeError> {
    let v: Value = serde_json::from_str(output).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let download = num_field(&v, &["download"])
        .ok_or_else(|| ProbeError::Parse("missing download".into()))?;
    let upload =
        num_field(&v, &["upload"]).ok_or_else(|| ProbeError::Parse("missing upload".into()))?;
    Ok(SpeedMeasurement {
        download_mbps: round2(download / 1_000_000.0),
        upload_mbps: round2(upload / 1_000_000.0),
        ping_ms: num_field(&v, &["ping"]).unwrap_or(0.0),
        jitter_ms: None,
        isp: str_field(&v, &["client", "isp"]),
        server_name: str_field(&v, &["server", "sponsor"]),
        server_location: str_field(&v, &["server", "name"]),
    })
}

pub struct SpeedtestCli {
    timeout: Duration,
}

impl SpeedtestCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SpeedTester for SpeedtestCli {
    async fn run(&self) -> anyhow::Result<SpeedMeasurement> {
        let ookla = run_command(
            "speedtest",
            &["--format=json", "--accept-license", "--accept-gdpr"],
            self.timeout,
        )
        .await
        .and_then(|out| parse_ookla_json(&out));
        match ookla {
            Ok(m) => Ok(m),
            Err(e) => {
                tracing::debug!(error = %e, "ookla speedtest unavailable, trying speedtest-cli");
                let out = run_command("speedtest-cli", &["--json"], self.timeout).await?;
                Ok(parse_speedtest_cli_json(&out)?)
            }
        }
    }
}
