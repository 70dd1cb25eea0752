// Detected problems. One active row per rule id.

use super::text_enum;
use serde::{Deserialize, Serialize};

text_enum! {
    Severity {
        Critical => "critical",
        Warning => "warning",
        Info => "info",
    }
}

text_enum! {
    ProblemCategory {
        Latency => "latency",
        PacketLoss => "packet-loss",
        Availability => "availability",
        Speed => "speed",
        Dns => "dns",
        Security => "security",
        Infrastructure => "infrastructure",
        Configuration => "configuration",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub category: ProblemCategory,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub recommendation: String,
    pub affected_devices: Vec<String>,
    pub is_active: bool,
    pub detected_at: i64,
    pub resolved_at: Option<i64>,
}
