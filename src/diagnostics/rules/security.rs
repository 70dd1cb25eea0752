use super::RuleResult;
use crate::diagnostics::context::DiagnosticContext;
use crate::models::{DeviceType, ProblemCategory, Severity};

const MINUTE_MS: i64 = 60_000;
/// Devices older than this count as the established baseline.
const ESTABLISHED_AFTER_MS: i64 = 5 * MINUTE_MS;
const MIN_ESTABLISHED: usize = 3;
const NEW_WINDOW_MS: i64 = 30 * MINUTE_MS;
const MANY_UNKNOWN_COUNT: usize = 5;
const MANY_UNKNOWN_FRACTION: f64 = 0.5;

/// Ports that expose remote access or admin interfaces.
pub const RISKY_PORTS: &[(u16, &str)] = &[
    (23, "Telnet"),
    (3389, "RDP"),
    (5900, "VNC"),
    (8080, "HTTP proxy"),
    (8443, "HTTPS alt"),
];

pub fn new_unknown_devices(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let established = ctx
        .devices
        .iter()
        .filter(|d| d.first_seen < ctx.now - ESTABLISHED_AFTER_MS)
        .count();
    if established < MIN_ESTABLISHED {
        return Vec::new();
    }
    ctx.devices
        .iter()
        .filter(|d| d.device_type == DeviceType::Unknown && d.first_seen >= ctx.now - NEW_WINDOW_MS)
        .map(|d| {
            RuleResult::new(
                format!("new-unknown-device:{}", d.id),
                Severity::Info,
                ProblemCategory::Security,
                format!("New unidentified device: {}", d.display_name()),
            )
            .description(format!(
                "A device with MAC {} ({}) joined the network recently and could not be identified.",
                d.mac_address,
                d.vendor.as_deref().unwrap_or("unknown vendor")
            ))
            .impact("Unrecognised devices may be unauthorised or compromised.")
            .recommendation("Confirm who owns this device and give it a name, or block it on the router.")
            .affecting(vec![d.id.clone()])
        })
        .collect()
}

pub fn many_unknown_devices(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let unknown: Vec<_> = ctx
        .devices
        .iter()
        .filter(|d| d.device_type == DeviceType::Unknown)
        .collect();
    if unknown.len() < MANY_UNKNOWN_COUNT
        || (unknown.len() as f64) < ctx.devices.len() as f64 * MANY_UNKNOWN_FRACTION
    {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "many-unknown-devices",
            Severity::Info,
            ProblemCategory::Security,
            "Many unidentified devices",
        )
        .description(format!(
            "{} of {} devices could not be identified.",
            unknown.len(),
            ctx.devices.len()
        ))
        .impact("It is hard to spot intruders when most devices are anonymous.")
        .recommendation("Name or classify the devices you recognise so new ones stand out.")
        .affecting(unknown.iter().map(|d| d.id.clone()).collect()),
    ]
}

pub fn open_common_ports(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    ctx.devices
        .iter()
        .filter_map(|d| {
            let exposed: Vec<String> = RISKY_PORTS
                .iter()
                .filter(|(port, _)| d.open_ports.contains(port))
                .map(|(port, name)| format!("{} ({})", port, name))
                .collect();
            (!exposed.is_empty()).then(|| {
                RuleResult::new(
                    format!("open-common-ports:{}", d.id),
                    Severity::Warning,
                    ProblemCategory::Security,
                    format!("Risky ports open on {}", d.display_name()),
                )
                .description(format!(
                    "{} accepts connections on {}.",
                    d.display_name(),
                    exposed.join(", ")
                ))
                .impact("Remote access services are a common entry point for attackers.")
                .recommendation(
                    "Disable the services if unused, or restrict them to trusted hosts and use strong credentials.",
                )
                .affecting(vec![d.id.clone()])
            })
        })
        .collect()
}
