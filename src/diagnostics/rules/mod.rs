// The rule bank: a flat ordered list of `Rule` values with one `evaluate` entry point.

pub mod availability;
pub mod dns;
pub mod infrastructure;
pub mod latency;
pub mod security;
pub mod speed;

use super::context::DiagnosticContext;
use crate::models::{ProblemCategory, Severity};
use std::sync::Arc;

/// One firing of a rule. `rule_id` carries a `:<deviceId>` suffix for per-device conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub rule_id: String,
    pub severity: Severity,
    pub category: ProblemCategory,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub recommendation: String,
    pub affected_devices: Vec<String>,
}

impl RuleResult {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        category: ProblemCategory,
        title: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            category,
            title: title.into(),
            description: String::new(),
            impact: String::new(),
            recommendation: String::new(),
            affected_devices: Vec::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn impact(mut self, text: impl Into<String>) -> Self {
        self.impact = text.into();
        self
    }

    pub fn recommendation(mut self, text: impl Into<String>) -> Self {
        self.recommendation = text.into();
        self
    }

    pub fn affecting(mut self, device_ids: Vec<String>) -> Self {
        self.affected_devices = device_ids;
        self
    }
}

pub type RuleFn = Arc<dyn Fn(&DiagnosticContext) -> anyhow::Result<Vec<RuleResult>> + Send + Sync>;

#[derive(Clone)]
pub enum Rule {
    HighLatencyGateway,
    HighLatencyDevice,
    LatencySpikes,
    DeviceFrequentOffline,
    MultipleDevicesOffline,
    HighPacketLoss,
    BroadcastStorm,
    GatewayBottleneck,
    NoGateway,
    SpeedBelowContracted,
    SpeedDegradingTrend,
    UploadSlow,
    NewUnknownDevice,
    ManyUnknownDevices,
    OpenCommonPorts,
    SlowDns,
    Custom { name: String, eval: RuleFn },
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Rule {
    /// Built-in rules in evaluation order.
    pub fn builtin() -> Vec<Rule> {
        vec![
            Rule::HighLatencyGateway,
            Rule::HighLatencyDevice,
            Rule::LatencySpikes,
            Rule::DeviceFrequentOffline,
            Rule::MultipleDevicesOffline,
            Rule::HighPacketLoss,
            Rule::BroadcastStorm,
            Rule::GatewayBottleneck,
            Rule::NoGateway,
            Rule::SpeedBelowContracted,
            Rule::SpeedDegradingTrend,
            Rule::UploadSlow,
            Rule::NewUnknownDevice,
            Rule::ManyUnknownDevices,
            Rule::OpenCommonPorts,
            Rule::SlowDns,
        ]
    }

    pub fn custom<F>(name: impl Into<String>, eval: F) -> Rule
    where
        F: Fn(&DiagnosticContext) -> anyhow::Result<Vec<RuleResult>> + Send + Sync + 'static,
    {
        Rule::Custom {
            name: name.into(),
            eval: Arc::new(eval),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::HighLatencyGateway => "high-latency-gateway",
            Rule::HighLatencyDevice => "high-latency-device",
            Rule::LatencySpikes => "latency-spikes",
            Rule::DeviceFrequentOffline => "device-frequent-offline",
            Rule::MultipleDevicesOffline => "multiple-devices-offline",
            Rule::HighPacketLoss => "high-packet-loss",
            Rule::BroadcastStorm => "possible-broadcast-storm",
            Rule::GatewayBottleneck => "gateway-is-bottleneck",
            Rule::NoGateway => "no-gateway-detected",
            Rule::SpeedBelowContracted => "speed-below-contracted",
            Rule::SpeedDegradingTrend => "speed-degrading-trend",
            Rule::UploadSlow => "upload-slow",
            Rule::NewUnknownDevice => "new-unknown-device",
            Rule::ManyUnknownDevices => "many-unknown-devices",
            Rule::OpenCommonPorts => "open-common-ports",
            Rule::SlowDns => "slow-dns",
            Rule::Custom { name, .. } => name,
        }
    }

    pub fn evaluate(&self, ctx: &DiagnosticContext) -> anyhow::Result<Vec<RuleResult>> {
        let results = match self {
            Rule::HighLatencyGateway => latency::high_latency_gateway(ctx),
            Rule::HighLatencyDevice => latency::high_latency_devices(ctx),
            Rule::LatencySpikes => latency::latency_spikes(ctx),
            Rule::DeviceFrequentOffline => availability::frequent_offline(ctx),
            Rule::MultipleDevicesOffline => availability::multiple_offline(ctx),
            Rule::HighPacketLoss => availability::high_packet_loss(ctx),
            Rule::BroadcastStorm => infrastructure::broadcast_storm(ctx),
            Rule::GatewayBottleneck => infrastructure::gateway_bottleneck(ctx),
            Rule::NoGateway => infrastructure::no_gateway(ctx),
            Rule::SpeedBelowContracted => speed::below_contracted(ctx),
            Rule::SpeedDegradingTrend => speed::degrading_trend(ctx),
            Rule::UploadSlow => speed::upload_slow(ctx),
            Rule::NewUnknownDevice => security::new_unknown_devices(ctx),
            Rule::ManyUnknownDevices => security::many_unknown_devices(ctx),
            Rule::OpenCommonPorts => security::open_common_ports(ctx),
            Rule::SlowDns => dns::slow_dns(ctx),
            Rule::Custom { eval, .. } => return eval(ctx),
        };
        Ok(results)
    }
}
