use serde::{Deserialize, Serialize};

/// One reachability sample. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub device_id: String,
    pub timestamp: i64,
    pub latency_ms: Option<f64>,
    /// 0-100
    pub packet_loss: f64,
    pub jitter_ms: Option<f64>,
    pub is_reachable: bool,
}

impl Metric {
    pub fn unreachable(device_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            latency_ms: None,
            packet_loss: 100.0,
            jitter_ms: None,
            is_reachable: false,
        }
    }
}
