use super::RuleResult;
use crate::diagnostics::context::{DiagnosticContext, mean};
use crate::models::{ProblemCategory, Severity};

const CRITICAL_PERCENT: f64 = 20.0;
const TREND_MIN_TESTS: usize = 4;
const TREND_RATIO: f64 = 0.7;
const UPLOAD_MIN_DOWNLOAD_MBPS: f64 = 10.0;
const UPLOAD_MIN_RATIO: f64 = 0.1;

pub fn below_contracted(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let Some(test) = ctx.latest_speed_test.as_ref() else {
        return Vec::new();
    };
    let Some(contracted) = test
        .contracted_download_mbps
        .or(ctx.contracted_download_mbps)
        .filter(|c| *c > 0.0)
    else {
        return Vec::new();
    };
    let percent = test.download_mbps / contracted * 100.0;
    let threshold = ctx.thresholds.speed_degraded_percent;
    if percent >= threshold {
        return Vec::new();
    }
    let severity = if percent < CRITICAL_PERCENT {
        Severity::Critical
    } else {
        Severity::Warning
    };
    vec![
        RuleResult::new(
            "speed-below-contracted",
            severity,
            ProblemCategory::Speed,
            "Internet speed below contracted rate",
        )
        .description(format!(
            "Download measured {:.1} Mbps, {:.0}% of the contracted {:.0} Mbps.",
            test.download_mbps, percent, contracted
        ))
        .impact("Downloads, streaming and cloud applications are slower than paid for.")
        .recommendation(
            "Re-test with a wired connection; if the result holds, contact the ISP with these measurements.",
        ),
    ]
}

pub fn degrading_trend(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let tests = &ctx.recent_speed_tests;
    if tests.len() < TREND_MIN_TESTS {
        return Vec::new();
    }
    let (earlier, last) = tests.split_at(tests.len() - 2);
    let earlier: Vec<f64> = earlier.iter().map(|t| t.download_mbps).collect();
    let last: Vec<f64> = last.iter().map(|t| t.download_mbps).collect();
    let (Some(before), Some(now)) = (mean(&earlier), mean(&last)) else {
        return Vec::new();
    };
    if now >= before * TREND_RATIO {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "speed-degrading-trend",
            Severity::Info,
            ProblemCategory::Speed,
            "Internet speed is trending down",
        )
        .description(format!(
            "The last two tests averaged {:.1} Mbps against {:.1} Mbps before.",
            now, before
        ))
        .impact("Connection quality is declining and may get worse.")
        .recommendation("Keep monitoring; if the drop persists, report it to the ISP."),
    ]
}

pub fn upload_slow(ctx: &DiagnosticContext) -> Vec<RuleResult> {
    let Some(test) = ctx.latest_speed_test.as_ref() else {
        return Vec::new();
    };
    if test.download_mbps < UPLOAD_MIN_DOWNLOAD_MBPS
        || test.upload_mbps / test.download_mbps >= UPLOAD_MIN_RATIO
    {
        return Vec::new();
    }
    vec![
        RuleResult::new(
            "upload-slow",
            Severity::Info,
            ProblemCategory::Speed,
            "Upload much slower than download",
        )
        .description(format!(
            "Upload is {:.1} Mbps against {:.1} Mbps download.",
            test.upload_mbps, test.download_mbps
        ))
        .impact("Video calls, backups and file sharing are limited by the upload speed.")
        .recommendation("Check whether the plan is asymmetric; a symmetric plan may suit cloud-heavy work."),
    ]
}
