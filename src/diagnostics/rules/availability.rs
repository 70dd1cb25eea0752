use super::RuleResult;
use crate::diagnostics::context::{DiagnosticContext, average_packet_loss};
use crate::models::{DeviceStatus, ProblemCategory, Severity};

const MIN_SAMPLES_FOR_FLAPPING: usize = 5;
const MAX_TRANSITIONS: usize = 5;
const OFFLINE_MIN_COUNT: usize = 3;
const OFFLINE_MIN_FRACTION: f64 = 0.3;
const CRITICAL_LOSS_PERCENT: f64 = 20.0;

/// Number of reachable/unreachable flips between consecutive samples.
pub fn reachability_transitions(metrics: &[crate::models::Metric]) -> usize {
    metrics
        .windows(2)
        .filter(|w| w[0].is_reachable != w[1].is_reachable)
        .count()
}

pub fn frequent_offline(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    ctx.devices
        .iter()
        .filter_map(|d| {
            let metrics = ctx.metrics_for(&d.id);
            if metrics.len() < MIN_SAMPLES_FOR_FLAPPING {
                return None;
            }
            let transitions = reachability_transitions(metrics);
            (transitions > MAX_TRANSITIONS).then(|| {
                RuleResult::new(
                    format!("device-frequent-offline:{}", d.id),
                    Severity::Warning,
                    ProblemCategory::Availability,
                    format!("{} keeps dropping off the network", d.display_name()),
                )
                .description(format!(
                    "{} changed between reachable and unreachable {} times in the last {} samples.",
                    d.display_name(),
                    transitions,
                    metrics.len()
                ))
                .impact("Connections to this device break intermittently.")
                .recommendation(
                    "Check its power supply, network cable or Wi-Fi signal, and any power-saving settings.",
                )
                .affecting(vec![d.id.clone()])
            })
        })
        .collect()
}

pub fn multiple_offline(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let monitored: Vec<_> = ctx.monitored().collect();
    if monitored.is_empty() {
        return Vec::new();
    }
    let offline: Vec<_> = monitored
        .iter()
        .filter(|d| d.status == DeviceStatus::Offline)
        .collect();
    let fraction = offline.len() as f64 / monitored.len() as f64;
    if offline.len() <= OFFLINE_MIN_COUNT || fraction <= OFFLINE_MIN_FRACTION {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "multiple-devices-offline",
            Severity::Critical,
            ProblemCategory::Infrastructure,
            "Many devices are offline",
        )
        .description(format!(
            "{} of {} monitored devices ({:.0}%) are offline.",
            offline.len(),
            monitored.len(),
            fraction * 100.0
        ))
        .impact("A large part of the network is unreachable.")
        .recommendation(
            "Check switches, access points and power for the affected area; a shared uplink has likely failed.",
        )
        .affecting(offline.iter().map(|d| d.id.clone()).collect()),
    ]
}

pub fn high_packet_loss(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let threshold = ctx.thresholds.packet_loss_percent;
    ctx.devices
        .iter()
        .filter_map(|d| {
            let loss = average_packet_loss(ctx.metrics_for(&d.id))?;
            if loss <= threshold {
                return None;
            }
            let severity = if loss > CRITICAL_LOSS_PERCENT {
                Severity::Critical
            } else {
                Severity::Warning
            };
            Some(
                RuleResult::new(
                    format!("high-packet-loss:{}", d.id),
                    severity,
                    ProblemCategory::PacketLoss,
                    format!("Packet loss on {}", d.display_name()),
                )
                .description(format!(
                    "Average packet loss to {} is {:.1}%, above the {:.0}% threshold.",
                    d.display_name(),
                    loss,
                    threshold
                ))
                .impact("Lost packets cause retransmissions, slow transfers and dropped calls.")
                .recommendation(
                    "Check cabling and Wi-Fi signal for this device and look for interference or a failing port.",
                )
                .affecting(vec![d.id.clone()]),
            )
        })
        .collect()
}
