use super::RuleResult;
use crate::diagnostics::context::{DiagnosticContext, average_latency, average_packet_loss, reachable_latencies};
use crate::models::{ProblemCategory, Severity};
use crate::monitor::jitter;

const STORM_MIN_DEVICES: usize = 3;
const STORM_MIN_SAMPLES: usize = 3;
const STORM_JITTER_MS: f64 = 150.0;
const STORM_LOSS_PERCENT: f64 = 20.0;
const STORM_FRACTION: f64 = 0.4;
const GATEWAY_SLOW_MS: f64 = 50.0;
/// External ping below gateway latency times this means the gateway itself is the slow hop.
const BOTTLENECK_RATIO: f64 = 1.5;

pub fn broadcast_storm(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let monitored: Vec<_> = ctx.monitored().collect();
    if monitored.len() < STORM_MIN_DEVICES {
        return Vec::new();
    }
    let suspicious = monitored
        .iter()
        .filter(|d| {
            let metrics = ctx.metrics_for(&d.id);
            let latencies = reachable_latencies(metrics);
            if latencies.len() < STORM_MIN_SAMPLES {
                return false;
            }
            let noisy = jitter(&latencies).is_some_and(|j| j > STORM_JITTER_MS);
            let lossy = average_packet_loss(metrics).is_some_and(|l| l > STORM_LOSS_PERCENT);
            let intermittent = metrics.iter().any(|m| m.is_reachable);
            noisy && lossy && intermittent
        })
        .count();
    let fraction = suspicious as f64 / monitored.len() as f64;
    if fraction < STORM_FRACTION {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "possible-broadcast-storm",
            Severity::Critical,
            ProblemCategory::Infrastructure,
            "Possible broadcast storm or switching loop",
        )
        .description(format!(
            "{} of {} devices show heavy jitter and packet loss at the same time while staying reachable.",
            suspicious,
            monitored.len()
        ))
        .impact("The whole network slows down or stalls as switches flood traffic.")
        .recommendation(
            "Look for a cable plugged into two switch ports, recently added unmanaged switches, and enable \
             spanning tree or loop protection on managed switches.",
        )
        .affecting(monitored.iter().map(|d| d.id.clone()).collect()),
    ]
}

pub fn gateway_bottleneck(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let (Some(gateway), Some(test)) = (ctx.gateway(), ctx.latest_speed_test.as_ref()) else {
        return Vec::new();
    };
    let Some(gw_avg) = average_latency(ctx.metrics_for(&gateway.id)) else {
        return Vec::new();
    };
    if gw_avg <= GATEWAY_SLOW_MS || test.ping_ms >= gw_avg * BOTTLENECK_RATIO {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "gateway-is-bottleneck",
            Severity::Warning,
            ProblemCategory::Infrastructure,
            "The router is the bottleneck",
        )
        .description(format!(
            "Local latency to the gateway ({:.0} ms) is close to or above the internet ping ({:.0} ms).",
            gw_avg, test.ping_ms
        ))
        .impact("Internet traffic is delayed inside the local network rather than at the ISP.")
        .recommendation(
            "The router may be overloaded or underpowered; reboot it, update its firmware or consider replacing it.",
        )
        .affecting(vec![gateway.id.clone()]),
    ]
}

pub fn no_gateway(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    if ctx.gateway().is_some() || ctx.devices.len() < 2 {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "no-gateway-detected",
            Severity::Info,
            ProblemCategory::Configuration,
            "No gateway identified",
        )
        .description(format!(
            "{} devices are known but none is marked as the gateway.",
            ctx.devices.len()
        ))
        .impact("Gateway latency and router bottleneck checks cannot run.")
        .recommendation("Mark the router as the gateway or run a new discovery scan."),
    ]
}
