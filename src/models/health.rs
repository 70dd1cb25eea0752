// Health score snapshot and its weighted factors

use super::text_enum;
use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

text_enum! {
    HealthCategory {
        Excellent => "excellent",
        Good => "good",
        Fair => "fair",
        Critical => "critical",
    }
}

impl HealthCategory {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => HealthCategory::Excellent,
            60..=79 => HealthCategory::Good,
            40..=59 => HealthCategory::Fair,
            _ => HealthCategory::Critical,
        }
    }
}

text_enum! {
    Trend {
        Improving => "improving",
        Stable => "stable",
        Declining => "declining",
    }
}

impl Trend {
    /// More than 5 points either way counts as movement. No previous score is stable.
    pub fn between(previous: Option<u8>, current: u8) -> Self {
        match previous {
            Some(prev) => {
                let diff = current as i16 - prev as i16;
                if diff > 5 {
                    Trend::Improving
                } else if diff < -5 {
                    Trend::Declining
                } else {
                    Trend::Stable
                }
            }
            None => Trend::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct FactorResult {
    pub name: String,
    /// 0-100
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub id: String,
    pub score: u8,
    pub category: HealthCategory,
    pub factors: Vec<FactorResult>,
    pub trend: Trend,
    pub previous_score: Option<u8>,
    pub calculated_at: i64,
}
