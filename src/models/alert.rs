use super::{Severity, text_enum};
use serde::{Deserialize, Serialize};

text_enum! {
    AlertType {
        DeviceOffline => "device-offline",
        DeviceOnline => "device-online",
        HighLatency => "high-latency",
        PacketLoss => "packet-loss",
        SpeedDegraded => "speed-degraded",
        NewDevice => "new-device",
        ProblemDetected => "problem-detected",
        ProblemResolved => "problem-resolved",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub device_id: Option<String>,
    pub problem_id: Option<String>,
    pub created_at: i64,
    pub read_at: Option<i64>,
}
