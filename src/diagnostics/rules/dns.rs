use super::RuleResult;
use crate::diagnostics::context::DiagnosticContext;
use crate::models::{ProblemCategory, Severity};

const SLOW_DNS_MS: f64 = 200.0;
const VERY_SLOW_DNS_MS: f64 = 1000.0;

pub fn slow_dns(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let Some(ms) = ctx.dns_latency_ms else {
        return Vec::new();
    };
    if ms <= SLOW_DNS_MS {
        return Vec::new();
    }
    let severity = if ms > VERY_SLOW_DNS_MS {
        Severity::Warning
    } else {
        Severity::Info
    };
    vec![
        RuleResult::new("slow-dns", severity, ProblemCategory::Dns, "Slow DNS resolution")
            .description(format!("Resolving a public domain took {:.0} ms.", ms))
            .impact("Every new website or service connection starts late.")
            .recommendation(
                "Switch the router or DHCP to a faster resolver (for example 1.1.1.1 or 8.8.8.8).",
            ),
    ]
}
