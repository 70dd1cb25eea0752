// Diagnostic pass: evaluate every rule over one snapshot, then reconcile the problem store.
// Per rule id: absent -> active on first fire, refreshed while firing, resolved on the first
// pass without it. A resolved record never reactivates; a later fire creates a new one.

pub mod context;
pub mod rules;

use crate::config::AppConfig;
use crate::events::{Event, EventSink};
use crate::models::{Alert, AlertType, Problem, Severity, now_ms};
use crate::probes::DnsTimer;
use crate::store::Repositories;
use context::{DiagnosticContext, Thresholds};
use rules::{Rule, RuleResult};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;

const RECENT_SPEED_TESTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct DiagnosticsSettings {
    pub lookback_ms: i64,
    pub cooldown_ms: i64,
    pub dns_domain: String,
    pub thresholds: Thresholds,
    pub contracted_download_mbps: Option<f64>,
    pub contracted_upload_mbps: Option<f64>,
}

impl DiagnosticsSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            lookback_ms: config.lookback_ms(),
            cooldown_ms: config.cooldown_ms(),
            dns_domain: config.diagnostics.dns_domain.clone(),
            thresholds: Thresholds {
                high_latency_ms: config.thresholds.high_latency_ms,
                packet_loss_percent: config.thresholds.packet_loss_percent,
                speed_degraded_percent: config.thresholds.speed_degraded_percent,
            },
            contracted_download_mbps: config.isp.contracted_download_mbps,
            contracted_upload_mbps: config.isp.contracted_upload_mbps,
        }
    }
}

pub struct DiagnosticEngine {
    repos: Repositories,
    dns: Arc<dyn DnsTimer>,
    events: Arc<dyn EventSink>,
    rules: Vec<Rule>,
    settings: DiagnosticsSettings,
    pass_lock: Mutex<()>,
}

/// Runs one rule, turning both errors and panics into `Err`.
pub fn evaluate_isolated(rule: &Rule, ctx: &DiagnosticContext) -> anyhow::Result<Vec<RuleResult>> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(anyhow::anyhow!("rule panicked: {}", msg))
        }
    }
}

impl DiagnosticEngine {
    pub fn new(
        repos: Repositories,
        dns: Arc<dyn DnsTimer>,
        events: Arc<dyn EventSink>,
        settings: DiagnosticsSettings,
    ) -> Self {
        Self {
            repos,
            dns,
            events,
            rules: Rule::builtin(),
            settings,
            pass_lock: Mutex::new(()),
        }
    }

    /// Replaces the rule bank.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub async fn build_context(&self, now: i64) -> anyhow::Result<DiagnosticContext> {
        let devices = self.repos.devices.get_all().await?;
        let mut metrics_by_device: HashMap<String, Vec<_>> = HashMap::new();
        for m in self.repos.metrics.get_since(now - self.settings.lookback_ms).await? {
            metrics_by_device.entry(m.device_id.clone()).or_default().push(m);
        }
        let latest_speed_test = self.repos.speed_tests.latest().await?;
        let recent_speed_tests = self.repos.speed_tests.recent(RECENT_SPEED_TESTS).await?;
        let dns_latency_ms = self.dns.measure_dns_latency(&self.settings.dns_domain).await;
        Ok(DiagnosticContext {
            now,
            devices,
            metrics_by_device,
            latest_speed_test,
            recent_speed_tests,
            dns_latency_ms,
            contracted_download_mbps: self.settings.contracted_download_mbps,
            contracted_upload_mbps: self.settings.contracted_upload_mbps,
            thresholds: self.settings.thresholds.clone(),
        })
    }

    /// One pass at the current time. Returns the problems created by this pass.
    pub async fn run_diagnostics(&self) -> anyhow::Result<Vec<Problem>> {
        self.run_diagnostics_at(now_ms()).await
    }

    pub async fn run_diagnostics_at(&self, now: i64) -> anyhow::Result<Vec<Problem>> {
        let _pass = self.pass_lock.lock().await;
        let ctx = self.build_context(now).await?;

        let mut fired: HashSet<String> = HashSet::new();
        let mut created = Vec::new();
        let mut failed_rules = 0usize;

        for rule in &self.rules {
            let results = match evaluate_isolated(rule, &ctx) {
                Ok(r) => r,
                Err(e) => {
                    failed_rules += 1;
                    tracing::warn!(error = %e, rule = rule.name(), "Rule evaluation failed");
                    continue;
                }
            };
            for result in results {
                if !fired.insert(result.rule_id.clone()) {
                    tracing::debug!(rule_id = %result.rule_id, "Duplicate result in one pass ignored");
                    continue;
                }
                if let Some(problem) = self.apply_result(result, now).await? {
                    created.push(problem);
                }
            }
        }

        let resolved = self.resolve_missing(&fired, now).await?;

        tracing::info!(
            rules = self.rules.len(),
            failed_rules,
            fired = fired.len(),
            created = created.len(),
            resolved,
            "Diagnostics pass finished"
        );
        Ok(created)
    }

    /// Refresh the active problem for this rule id, or create one (with an alert unless cooling down).
    async fn apply_result(&self, result: RuleResult, now: i64) -> anyhow::Result<Option<Problem>> {
        if let Some(mut existing) = self.repos.problems.find_active_by_rule_id(&result.rule_id).await? {
            existing.severity = result.severity;
            existing.category = result.category;
            existing.title = result.title;
            existing.description = result.description;
            existing.impact = result.impact;
            existing.recommendation = result.recommendation;
            existing.affected_devices = result.affected_devices;
            self.repos.problems.update_active(&existing).await?;
            return Ok(None);
        }

        let problem = Problem {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: result.rule_id,
            severity: result.severity,
            category: result.category,
            title: result.title,
            description: result.description,
            impact: result.impact,
            recommendation: result.recommendation,
            affected_devices: result.affected_devices,
            is_active: true,
            detected_at: now,
            resolved_at: None,
        };
        self.repos.problems.create(&problem).await?;
        tracing::info!(
            problem_id = %problem.id,
            rule_id = %problem.rule_id,
            severity = %problem.severity,
            "Problem detected"
        );
        self.events.emit(Event::ProblemCreated(problem.clone()));

        if self.in_cooldown(&problem.rule_id, now).await? {
            tracing::debug!(rule_id = %problem.rule_id, "Alert suppressed by cooldown");
        } else {
            let alert = Alert {
                id: uuid::Uuid::new_v4().to_string(),
                alert_type: AlertType::ProblemDetected,
                severity: problem.severity,
                title: problem.title.clone(),
                message: problem.description.clone(),
                device_id: single_device(&problem),
                problem_id: Some(problem.id.clone()),
                created_at: now,
                read_at: None,
            };
            self.repos.alerts.create(&alert).await?;
            self.events.emit(Event::AlertRaised(alert));
        }
        Ok(Some(problem))
    }

    async fn in_cooldown(&self, rule_id: &str, now: i64) -> anyhow::Result<bool> {
        if self.settings.cooldown_ms <= 0 {
            return Ok(false);
        }
        let last = self.repos.problems.last_resolved_at(rule_id).await?;
        Ok(last.is_some_and(|t| now - t < self.settings.cooldown_ms))
    }

    async fn resolve_missing(&self, fired: &HashSet<String>, now: i64) -> anyhow::Result<usize> {
        let mut resolved = 0;
        for mut problem in self.repos.problems.get_active().await? {
            if fired.contains(&problem.rule_id) {
                continue;
            }
            self.repos.problems.resolve(&problem.id, now).await?;
            problem.is_active = false;
            problem.resolved_at = Some(now);
            resolved += 1;
            tracing::info!(problem_id = %problem.id, rule_id = %problem.rule_id, "Problem resolved");

            let alert = Alert {
                id: uuid::Uuid::new_v4().to_string(),
                alert_type: AlertType::ProblemResolved,
                severity: Severity::Info,
                title: format!("Resolved: {}", problem.title),
                message: format!("{} is no longer detected.", problem.title),
                device_id: single_device(&problem),
                problem_id: Some(problem.id.clone()),
                created_at: now,
                read_at: None,
            };
            self.repos.alerts.create(&alert).await?;
            self.events.emit(Event::ProblemResolved(problem));
            self.events.emit(Event::AlertRaised(alert));
        }
        Ok(resolved)
    }
}

fn single_device(problem: &Problem) -> Option<String> {
    match problem.affected_devices.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}
