use super::text_enum;
use serde::{Deserialize, Serialize};

text_enum! {
    ScanType {
        Discovery => "discovery",
        Ping => "ping",
        Speed => "speed",
        Full => "full",
    }
}

text_enum! {
    ScanStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

text_enum! {
    /// Who asked for a scan or speed test.
    Trigger {
        Manual => "manual",
        Scheduled => "scheduled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub devices_found: u32,
    pub new_devices: u32,
    pub duration_ms: Option<i64>,
    pub triggered_by: Trigger,
    pub error: Option<String>,
}
