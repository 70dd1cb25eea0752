use super::RuleResult;
use crate::diagnostics::context::{DiagnosticContext, average_latency, mean, reachable_latencies};
use crate::models::{ProblemCategory, Severity};
use crate::monitor::jitter;

/// Gateway round trips above this are noticeable on every device.
const GATEWAY_LATENCY_MS: f64 = 50.0;
const GATEWAY_CRITICAL_MS: f64 = 200.0;
const SPIKE_JITTER_MS: f64 = 100.0;
const SPIKE_MIN_AVG_MS: f64 = 20.0;
const MIN_SAMPLES: usize = 3;

pub fn high_latency_gateway(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let Some(gateway) = ctx.gateway() else {
        return Vec::new();
    };
    let Some(avg) = average_latency(ctx.metrics_for(&gateway.id)) else {
        return Vec::new();
    };
    if avg <= GATEWAY_LATENCY_MS {
        return Vec::new();
    }
    let severity = if avg > GATEWAY_CRITICAL_MS {
        Severity::Critical
    } else {
        Severity::Warning
    };
    vec![
        RuleResult::new(
            "high-latency-gateway",
            severity,
            ProblemCategory::Latency,
            "High latency to the gateway",
        )
        .description(format!(
            "Average round trip to the gateway {} is {:.0} ms (expected under {:.0} ms).",
            gateway.display_name(),
            avg,
            GATEWAY_LATENCY_MS
        ))
        .impact("Every device on the network pays this delay on all internet traffic.")
        .recommendation(
            "Check the router CPU load and uptime, restart it if it has been running for a long time, \
             and verify the cable or Wi-Fi link between this agent and the router.",
        )
        .affecting(vec![gateway.id.clone()]),
    ]
}

pub fn high_latency_devices(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let threshold = ctx.thresholds.high_latency_ms;
    ctx.devices
        .iter()
        .filter(|d| !d.is_gateway)
        .filter_map(|d| {
            let avg = average_latency(ctx.metrics_for(&d.id))?;
            (avg > threshold).then(|| {
                RuleResult::new(
                    format!("high-latency-device:{}", d.id),
                    Severity::Warning,
                    ProblemCategory::Latency,
                    format!("High latency to {}", d.display_name()),
                )
                .description(format!(
                    "Average latency to {} ({}) is {:.0} ms, above the {:.0} ms threshold.",
                    d.display_name(),
                    d.ip_address,
                    avg,
                    threshold
                ))
                .impact("Applications on this device respond slowly.")
                .recommendation(
                    "Check the device's signal strength or cabling and whether it is overloaded.",
                )
                .affecting(vec![d.id.clone()])
            })
        })
        .collect()
}

pub fn latency_spikes(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let spiky: Vec<&crate::models::Device> = ctx
        .devices
        .iter()
        .filter(|d| {
            let latencies = reachable_latencies(ctx.metrics_for(&d.id));
            if latencies.len() < MIN_SAMPLES {
                return false;
            }
            let avg = mean(&latencies).unwrap_or_default();
            jitter(&latencies).is_some_and(|j| j > SPIKE_JITTER_MS) && avg > SPIKE_MIN_AVG_MS
        })
        .collect();
    if spiky.is_empty() {
        return Vec::new();
    }
    let names: Vec<&str> = spiky.iter().map(|d| d.display_name()).collect();
    vec![
        RuleResult::new(
            "latency-spikes",
            Severity::Warning,
            ProblemCategory::Latency,
            "Latency spikes detected",
        )
        .description(format!(
            "{} device(s) show large swings in response time: {}.",
            spiky.len(),
            names.join(", ")
        ))
        .impact("Voice and video calls stutter and interactive sessions feel laggy.")
        .recommendation(
            "Look for Wi-Fi interference or congestion and for devices saturating the link with large transfers.",
        )
        .affecting(spiky.iter().map(|d| d.id.clone()).collect()),
    ]
}
