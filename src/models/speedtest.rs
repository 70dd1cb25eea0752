use super::Trigger;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestResult {
    pub id: String,
    pub timestamp: i64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub jitter_ms: Option<f64>,
    pub isp: Option<String>,
    pub server_name: Option<String>,
    pub server_location: Option<String>,
    pub contracted_download_mbps: Option<f64>,
    pub contracted_upload_mbps: Option<f64>,
    /// Download as a percentage of the contracted speed (rounded), when one is configured.
    pub download_percent: Option<f64>,
    pub upload_percent: Option<f64>,
    pub triggered_by: Trigger,
}
