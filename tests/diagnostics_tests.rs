// Diagnostic pass: problem dedup, auto-resolution, alert cooldown, rule isolation

mod common;

use common::{FakeDns, MINUTE, RecordingSink, device, sample, test_repos};
use lanwatch::diagnostics::context::Thresholds;
use lanwatch::diagnostics::rules::{Rule, RuleResult};
use lanwatch::diagnostics::{DiagnosticEngine, DiagnosticsSettings};
use lanwatch::models::{AlertType, ProblemCategory, Severity};
use lanwatch::store::Repositories;
use std::sync::{Arc, Mutex};

const T0: i64 = 10_000 * MINUTE;

fn settings() -> DiagnosticsSettings {
    DiagnosticsSettings {
        lookback_ms: 60 * MINUTE,
        cooldown_ms: 30 * MINUTE,
        dns_domain: "example.com".into(),
        thresholds: Thresholds::default(),
        contracted_download_mbps: None,
        contracted_upload_mbps: None,
    }
}

/// A rule that fires with the current description while one is set.
fn switchable(rule_id: &'static str) -> (Rule, Arc<Mutex<Option<String>>>) {
    let state: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let handle = state.clone();
    let rule = Rule::custom(rule_id, move |_ctx| {
        let current = state.lock().unwrap().clone();
        Ok(current
            .map(|desc| {
                RuleResult::new(rule_id, Severity::Warning, ProblemCategory::Latency, "Test condition")
                    .description(desc)
            })
            .into_iter()
            .collect())
    });
    (rule, handle)
}

fn engine(repos: &Repositories, sink: Arc<RecordingSink>, rules: Vec<Rule>) -> DiagnosticEngine {
    DiagnosticEngine::new(repos.clone(), Arc::new(FakeDns::default()), sink, settings()).with_rules(rules)
}

fn set(state: &Arc<Mutex<Option<String>>>, value: Option<&str>) {
    *state.lock().unwrap() = value.map(str::to_string);
}

#[tokio::test]
async fn test_repeat_fire_refreshes_the_same_problem() {
    let (_dir, repos) = test_repos().await;
    let (rule, state) = switchable("cond");
    let sink = Arc::new(RecordingSink::default());
    let engine = engine(&repos, sink.clone(), vec![rule]);

    set(&state, Some("first"));
    let created = engine.run_diagnostics_at(T0).await.unwrap();
    assert_eq!(created.len(), 1);
    let id = created[0].id.clone();

    set(&state, Some("second"));
    let created = engine.run_diagnostics_at(T0 + MINUTE).await.unwrap();
    assert!(created.is_empty());

    let all = repos.problems.get_by_rule_id("cond").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].description, "second");
    assert!(all[0].is_active);
    assert_eq!(all[0].detected_at, T0);

    let alerts = repos.alerts.get_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::ProblemDetected);
    assert_eq!(alerts[0].problem_id.as_deref(), Some(id.as_str()));
    assert_eq!(sink.names(), vec!["problem-created", "alert-raised"]);
}

#[tokio::test]
async fn test_problem_resolves_when_rule_stops_firing() {
    let (_dir, repos) = test_repos().await;
    let (rule, state) = switchable("cond");
    let sink = Arc::new(RecordingSink::default());
    let engine = engine(&repos, sink.clone(), vec![rule]);

    set(&state, Some("up"));
    let id = engine.run_diagnostics_at(T0).await.unwrap()[0].id.clone();
    set(&state, None);
    assert!(engine.run_diagnostics_at(T0 + MINUTE).await.unwrap().is_empty());

    let problem = repos.problems.find_by_id(&id).await.unwrap().unwrap();
    assert!(!problem.is_active);
    assert_eq!(problem.resolved_at, Some(T0 + MINUTE));
    assert!(repos.problems.get_active().await.unwrap().is_empty());

    let alerts = repos.alerts.get_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].alert_type, AlertType::ProblemResolved);
    assert_eq!(alerts[0].severity, Severity::Info);
    assert_eq!(alerts[0].title, "Resolved: Test condition");
    assert_eq!(alerts[0].problem_id.as_deref(), Some(id.as_str()));
    assert!(sink.names().contains(&"problem-resolved"));
}

#[tokio::test]
async fn test_refire_within_cooldown_creates_problem_without_alert() {
    let (_dir, repos) = test_repos().await;
    let (rule, state) = switchable("cond");
    let engine = engine(&repos, Arc::new(RecordingSink::default()), vec![rule]);

    set(&state, Some("up"));
    let first = engine.run_diagnostics_at(T0).await.unwrap();
    let resolved_at = T0 + MINUTE;
    set(&state, None);
    engine.run_diagnostics_at(resolved_at).await.unwrap();

    set(&state, Some("up again"));
    let second = engine.run_diagnostics_at(resolved_at + 5 * MINUTE).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_ne!(second[0].id, first[0].id);
    assert_eq!(second[0].rule_id, "cond");

    let alerts = repos.alerts.get_recent(10).await.unwrap();
    let detected = alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::ProblemDetected)
        .count();
    assert_eq!(detected, 1);
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn test_refire_after_cooldown_creates_problem_and_alert() {
    let (_dir, repos) = test_repos().await;
    let (rule, state) = switchable("cond");
    let engine = engine(&repos, Arc::new(RecordingSink::default()), vec![rule]);

    set(&state, Some("up"));
    engine.run_diagnostics_at(T0).await.unwrap();
    let resolved_at = T0 + MINUTE;
    set(&state, None);
    engine.run_diagnostics_at(resolved_at).await.unwrap();

    set(&state, Some("up again"));
    let again = engine.run_diagnostics_at(resolved_at + 35 * MINUTE).await.unwrap();
    assert_eq!(again.len(), 1);

    let alerts = repos.alerts.get_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0].alert_type, AlertType::ProblemDetected);
    assert_eq!(alerts[0].problem_id.as_deref(), Some(again[0].id.as_str()));
    assert_eq!(repos.problems.get_by_rule_id("cond").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failing_rules_do_not_abort_the_pass() {
    let (_dir, repos) = test_repos().await;
    let (good, state) = switchable("good");
    set(&state, Some("fine"));
    let erroring = Rule::custom("erroring", |_ctx| Err(anyhow::anyhow!("no data")));
    let panicking = Rule::custom("panicking", |ctx| {
        let first = &ctx.devices[0];
        Ok(vec![RuleResult::new(
            first.id.clone(),
            Severity::Info,
            ProblemCategory::Configuration,
            "unreachable",
        )])
    });
    let engine = engine(
        &repos,
        Arc::new(RecordingSink::default()),
        vec![erroring, panicking, good],
    );

    let created = engine.run_diagnostics_at(T0).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].rule_id, "good");
}

#[tokio::test]
async fn test_only_rules_that_stop_firing_are_resolved() {
    let (_dir, repos) = test_repos().await;
    let (a, state_a) = switchable("a");
    let (b, state_b) = switchable("b");
    let engine = engine(&repos, Arc::new(RecordingSink::default()), vec![a, b]);
    set(&state_a, Some("a"));
    set(&state_b, Some("b"));
    engine.run_diagnostics_at(T0).await.unwrap();

    set(&state_b, None);
    engine.run_diagnostics_at(T0 + MINUTE).await.unwrap();
    let active = repos.problems.get_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].rule_id, "a");
}

#[tokio::test]
async fn test_duplicate_rule_id_in_one_pass_is_ignored() {
    let (_dir, repos) = test_repos().await;
    let twice = Rule::custom("twice", |_ctx| {
        let r = RuleResult::new("dup", Severity::Warning, ProblemCategory::Latency, "Dup");
        Ok(vec![r.clone(), r.description("again")])
    });
    let engine = engine(&repos, Arc::new(RecordingSink::default()), vec![twice]);
    let created = engine.run_diagnostics_at(T0).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].description, "");
    assert_eq!(repos.problems.get_active().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_alert_names_the_device_when_exactly_one_is_affected() {
    let (_dir, repos) = test_repos().await;
    let one = Rule::custom("one", |_ctx| {
        Ok(vec![
            RuleResult::new("one:d1", Severity::Warning, ProblemCategory::Latency, "One")
                .affecting(vec!["d1".into()]),
            RuleResult::new("many", Severity::Warning, ProblemCategory::Latency, "Many")
                .affecting(vec!["d1".into(), "d2".into()]),
        ])
    });
    let engine = engine(&repos, Arc::new(RecordingSink::default()), vec![one]);
    engine.run_diagnostics_at(T0).await.unwrap();

    let alerts = repos.alerts.get_recent(10).await.unwrap();
    let by_title = |t: &str| alerts.iter().find(|a| a.title == t).unwrap().clone();
    assert_eq!(by_title("One").device_id.as_deref(), Some("d1"));
    assert_eq!(by_title("Many").device_id, None);
}

#[tokio::test]
async fn test_builtin_rules_read_the_store() {
    let (_dir, repos) = test_repos().await;
    let now = T0;
    let mut gw = device("192.168.1.1", "10:00:00:00:00:01", now - 120 * MINUTE);
    gw.is_gateway = true;
    repos.devices.create(&gw).await.unwrap();
    let metrics: Vec<_> = (1..=5)
        .map(|i| sample(&gw.id, now - i * MINUTE, Some(260.0), 0.0))
        .chain(std::iter::once(sample(&gw.id, now - 300 * MINUTE, Some(1.0), 0.0)))
        .collect();
    repos.metrics.insert_many(&metrics).await.unwrap();

    let dns = Arc::new(FakeDns::default());
    *dns.latency.lock().unwrap() = Some(1_200.0);
    let engine = DiagnosticEngine::new(
        repos.clone(),
        dns,
        Arc::new(RecordingSink::default()),
        settings(),
    );
    assert_eq!(engine.rules().len(), Rule::builtin().len());

    let ctx = engine.build_context(now).await.unwrap();
    assert_eq!(ctx.metrics_for(&gw.id).len(), 5);
    assert_eq!(ctx.dns_latency_ms, Some(1_200.0));

    let created = engine.run_diagnostics_at(now).await.unwrap();
    let gw_problem = created
        .iter()
        .find(|p| p.rule_id == "high-latency-gateway")
        .expect("gateway latency problem");
    assert_eq!(gw_problem.severity, Severity::Critical);
    assert_eq!(gw_problem.affected_devices, vec![gw.id.clone()]);
    let dns_problem = created.iter().find(|p| p.rule_id == "slow-dns").expect("dns problem");
    assert_eq!(dns_problem.severity, Severity::Warning);
}
