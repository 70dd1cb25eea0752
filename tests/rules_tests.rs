// Built-in diagnostic rules evaluated against hand-built snapshots

mod common;

use common::{MINUTE, sample};
use lanwatch::diagnostics::context::DiagnosticContext;
use lanwatch::diagnostics::rules::Rule;
use lanwatch::diagnostics::rules::availability::reachability_transitions;
use lanwatch::models::*;

const NOW: i64 = 1_000 * MINUTE;

fn dev(id: &str, ip: &str) -> Device {
    let mut d = Device::new(ip, format!("10:00:00:00:00:{}", &id[id.len() - 2..]), NOW - 60 * MINUTE);
    d.id = id.to_string();
    d.device_type = DeviceType::Desktop;
    d
}

fn gateway() -> Device {
    let mut d = dev("gw-01", "192.168.1.1");
    d.is_gateway = true;
    d.device_type = DeviceType::Router;
    d
}

fn ctx(devices: Vec<Device>) -> DiagnosticContext {
    DiagnosticContext {
        now: NOW,
        devices,
        ..Default::default()
    }
}

fn latencies(ctx: &mut DiagnosticContext, id: &str, values: &[f64]) {
    let metrics = values
        .iter()
        .enumerate()
        .map(|(i, v)| sample(id, NOW - (values.len() - i) as i64 * MINUTE, Some(*v), 0.0))
        .collect();
    ctx.metrics_by_device.insert(id.to_string(), metrics);
}

fn speed_test(down: f64, up: f64, ping: f64) -> SpeedTestResult {
    SpeedTestResult {
        id: format!("st-{}", down),
        timestamp: NOW,
        download_mbps: down,
        upload_mbps: up,
        ping_ms: ping,
        jitter_ms: None,
        isp: None,
        server_name: None,
        server_location: None,
        contracted_download_mbps: None,
        contracted_upload_mbps: None,
        download_percent: None,
        upload_percent: None,
        triggered_by: Trigger::Scheduled,
    }
}

#[test]
fn test_builtin_rule_names_are_unique() {
    let rules = Rule::builtin();
    let mut names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);
    assert!(names.contains(&"slow-dns"));
}

#[test]
fn test_empty_snapshot_fires_nothing() {
    let c = ctx(Vec::new());
    for rule in Rule::builtin() {
        assert!(rule.evaluate(&c).unwrap().is_empty(), "{} fired", rule.name());
    }
}

#[test]
fn test_high_latency_gateway_escalates() {
    let mut c = ctx(vec![gateway()]);
    latencies(&mut c, "gw-01", &[30.0, 40.0]);
    assert!(Rule::HighLatencyGateway.evaluate(&c).unwrap().is_empty());

    latencies(&mut c, "gw-01", &[80.0, 90.0]);
    let r = Rule::HighLatencyGateway.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "high-latency-gateway");
    assert_eq!(r[0].severity, Severity::Warning);
    assert_eq!(r[0].affected_devices, vec!["gw-01".to_string()]);

    latencies(&mut c, "gw-01", &[250.0, 300.0]);
    let r = Rule::HighLatencyGateway.evaluate(&c).unwrap();
    assert_eq!(r[0].severity, Severity::Critical);
}

#[test]
fn test_high_latency_device_is_per_device() {
    let mut c = ctx(vec![gateway(), dev("pc-01", "192.168.1.20"), dev("pc-02", "192.168.1.21")]);
    latencies(&mut c, "gw-01", &[500.0]);
    latencies(&mut c, "pc-01", &[150.0, 170.0]);
    latencies(&mut c, "pc-02", &[10.0, 12.0]);
    let r = Rule::HighLatencyDevice.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "high-latency-device:pc-01");
    assert_eq!(r[0].category, ProblemCategory::Latency);
}

#[test]
fn test_unreachable_samples_do_not_count_as_latency() {
    let mut c = ctx(vec![dev("pc-01", "192.168.1.20")]);
    c.metrics_by_device.insert(
        "pc-01".into(),
        vec![sample("pc-01", NOW - MINUTE, None, 100.0), sample("pc-01", NOW, Some(20.0), 0.0)],
    );
    assert!(Rule::HighLatencyDevice.evaluate(&c).unwrap().is_empty());
}

#[test]
fn test_latency_spikes() {
    let mut c = ctx(vec![dev("pc-01", "192.168.1.20"), dev("pc-02", "192.168.1.21")]);
    latencies(&mut c, "pc-01", &[10.0, 400.0, 15.0, 350.0]);
    latencies(&mut c, "pc-02", &[10.0, 11.0, 12.0, 10.0]);
    let r = Rule::LatencySpikes.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].affected_devices, vec!["pc-01".to_string()]);
}

#[test]
fn test_frequent_offline_counts_transitions() {
    let flapping: Vec<Metric> = (0..8)
        .map(|i| {
            let up = i % 2 == 0;
            sample("pc-01", NOW - (8 - i) * MINUTE, up.then_some(5.0), if up { 0.0 } else { 100.0 })
        })
        .collect();
    assert_eq!(reachability_transitions(&flapping), 7);

    let mut c = ctx(vec![dev("pc-01", "192.168.1.20")]);
    c.metrics_by_device.insert("pc-01".into(), flapping);
    let r = Rule::DeviceFrequentOffline.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "device-frequent-offline:pc-01");
    assert_eq!(r[0].category, ProblemCategory::Availability);
}

#[test]
fn test_multiple_devices_offline_needs_count_and_fraction() {
    let mut devices: Vec<Device> = (10..20)
        .map(|i| dev(&format!("pc-{}", i), &format!("192.168.1.{}", i)))
        .collect();
    for d in devices.iter_mut().take(3) {
        d.status = DeviceStatus::Offline;
    }
    // 3 of 10: count not above 3.
    assert!(Rule::MultipleDevicesOffline.evaluate(&ctx(devices.clone())).unwrap().is_empty());

    devices[3].status = DeviceStatus::Offline;
    let r = Rule::MultipleDevicesOffline.evaluate(&ctx(devices.clone())).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].severity, Severity::Critical);
    assert_eq!(r[0].category, ProblemCategory::Infrastructure);
    assert_eq!(r[0].affected_devices.len(), 4);

    // 4 offline out of 20 is only 20%.
    let mut many = devices;
    many.extend((20..30).map(|i| dev(&format!("pc-{}", i), &format!("192.168.1.{}", i))));
    assert!(Rule::MultipleDevicesOffline.evaluate(&ctx(many)).unwrap().is_empty());
}

#[test]
fn test_high_packet_loss_severity_scales() {
    let mut c = ctx(vec![dev("pc-01", "192.168.1.20"), dev("pc-02", "192.168.1.21")]);
    c.metrics_by_device.insert(
        "pc-01".into(),
        vec![sample("pc-01", NOW, Some(5.0), 10.0), sample("pc-01", NOW, Some(5.0), 10.0)],
    );
    c.metrics_by_device.insert(
        "pc-02".into(),
        vec![sample("pc-02", NOW, Some(5.0), 50.0)],
    );
    let mut r = Rule::HighPacketLoss.evaluate(&c).unwrap();
    r.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
    assert_eq!(r.len(), 2);
    assert_eq!(r[0].rule_id, "high-packet-loss:pc-01");
    assert_eq!(r[0].severity, Severity::Warning);
    assert_eq!(r[1].severity, Severity::Critical);
    assert_eq!(r[1].category, ProblemCategory::PacketLoss);
}

#[test]
fn test_broadcast_storm() {
    let ids = ["pc-01", "pc-02", "pc-03", "pc-04"];
    let mut c = ctx(ids
        .iter()
        .enumerate()
        .map(|(i, id)| dev(id, &format!("192.168.1.{}", 20 + i)))
        .collect());
    let noisy = |id: &str| -> Vec<Metric> {
        [10.0, 400.0, 5.0, 380.0]
            .iter()
            .enumerate()
            .map(|(i, l)| sample(id, NOW - (4 - i as i64) * MINUTE, Some(*l), 40.0))
            .collect()
    };
    c.metrics_by_device.insert("pc-01".into(), noisy("pc-01"));
    assert!(Rule::BroadcastStorm.evaluate(&c).unwrap().is_empty());

    c.metrics_by_device.insert("pc-02".into(), noisy("pc-02"));
    let r = Rule::BroadcastStorm.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "possible-broadcast-storm");
    assert_eq!(r[0].severity, Severity::Critical);
}

#[test]
fn test_gateway_bottleneck() {
    let mut c = ctx(vec![gateway()]);
    latencies(&mut c, "gw-01", &[80.0, 80.0]);
    c.latest_speed_test = Some(speed_test(100.0, 20.0, 90.0));
    let r = Rule::GatewayBottleneck.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "gateway-is-bottleneck");

    // External ping well above the gateway latency: the ISP path is the slow part.
    c.latest_speed_test = Some(speed_test(100.0, 20.0, 200.0));
    assert!(Rule::GatewayBottleneck.evaluate(&c).unwrap().is_empty());
}

#[test]
fn test_no_gateway_needs_two_devices() {
    assert!(Rule::NoGateway.evaluate(&ctx(vec![dev("pc-01", "192.168.1.20")])).unwrap().is_empty());
    let two = ctx(vec![dev("pc-01", "192.168.1.20"), dev("pc-02", "192.168.1.21")]);
    let r = Rule::NoGateway.evaluate(&two).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].severity, Severity::Info);
    assert_eq!(r[0].category, ProblemCategory::Configuration);
    let with_gw = ctx(vec![gateway(), dev("pc-01", "192.168.1.20")]);
    assert!(Rule::NoGateway.evaluate(&with_gw).unwrap().is_empty());
}

#[test]
fn test_speed_below_contracted() {
    let mut c = ctx(Vec::new());
    c.latest_speed_test = Some(speed_test(40.0, 10.0, 10.0));
    // No contracted speed anywhere: nothing to compare against.
    assert!(Rule::SpeedBelowContracted.evaluate(&c).unwrap().is_empty());

    c.contracted_download_mbps = Some(100.0);
    let r = Rule::SpeedBelowContracted.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].severity, Severity::Warning);

    c.latest_speed_test = Some(speed_test(15.0, 10.0, 10.0));
    assert_eq!(Rule::SpeedBelowContracted.evaluate(&c).unwrap()[0].severity, Severity::Critical);

    c.latest_speed_test = Some(speed_test(60.0, 10.0, 10.0));
    assert!(Rule::SpeedBelowContracted.evaluate(&c).unwrap().is_empty());
}

#[test]
fn test_speed_degrading_trend() {
    let mut c = ctx(Vec::new());
    c.recent_speed_tests = [100.0, 95.0, 98.0, 60.0, 55.0]
        .iter()
        .map(|d| speed_test(*d, 10.0, 10.0))
        .collect();
    let r = Rule::SpeedDegradingTrend.evaluate(&c).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "speed-degrading-trend");

    c.recent_speed_tests = [100.0, 95.0, 90.0, 85.0]
        .iter()
        .map(|d| speed_test(*d, 10.0, 10.0))
        .collect();
    assert!(Rule::SpeedDegradingTrend.evaluate(&c).unwrap().is_empty());

    c.recent_speed_tests.truncate(3);
    assert!(Rule::SpeedDegradingTrend.evaluate(&c).unwrap().is_empty());
}

#[test]
fn test_upload_slow() {
    let mut c = ctx(Vec::new());
    c.latest_speed_test = Some(speed_test(200.0, 5.0, 10.0));
    assert_eq!(Rule::UploadSlow.evaluate(&c).unwrap().len(), 1);
    c.latest_speed_test = Some(speed_test(200.0, 40.0, 10.0));
    assert!(Rule::UploadSlow.evaluate(&c).unwrap().is_empty());
}

#[test]
fn test_new_unknown_device_needs_established_baseline() {
    let mut fresh = dev("xx-99", "192.168.1.99");
    fresh.device_type = DeviceType::Unknown;
    fresh.first_seen = NOW - 2 * MINUTE;

    let mut devices = vec![dev("pc-01", "192.168.1.20"), dev("pc-02", "192.168.1.21"), fresh.clone()];
    assert!(Rule::NewUnknownDevice.evaluate(&ctx(devices.clone())).unwrap().is_empty());

    devices.push(dev("pc-03", "192.168.1.22"));
    let r = Rule::NewUnknownDevice.evaluate(&ctx(devices)).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "new-unknown-device:xx-99");
    assert_eq!(r[0].category, ProblemCategory::Security);
}

#[test]
fn test_many_unknown_devices() {
    let devices: Vec<Device> = (10..16)
        .map(|i| {
            let mut d = dev(&format!("pc-{}", i), &format!("192.168.1.{}", i));
            if i < 15 {
                d.device_type = DeviceType::Unknown;
            }
            d
        })
        .collect();
    let r = Rule::ManyUnknownDevices.evaluate(&ctx(devices.clone())).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].affected_devices.len(), 5);

    assert!(Rule::ManyUnknownDevices.evaluate(&ctx(devices[..4].to_vec())).unwrap().is_empty());
}

#[test]
fn test_open_common_ports() {
    let mut exposed = dev("pc-01", "192.168.1.20");
    exposed.open_ports = vec![22, 23, 3389];
    let mut fine = dev("pc-02", "192.168.1.21");
    fine.open_ports = vec![22, 443];
    let r = Rule::OpenCommonPorts.evaluate(&ctx(vec![exposed, fine])).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r[0].rule_id, "open-common-ports:pc-01");
    assert_eq!(r[0].severity, Severity::Warning);
    assert!(r[0].description.contains("Telnet"));
    assert!(r[0].description.contains("RDP"));
}

#[test]
fn test_slow_dns() {
    let mut c = ctx(Vec::new());
    assert!(Rule::SlowDns.evaluate(&c).unwrap().is_empty());
    c.dns_latency_ms = Some(150.0);
    assert!(Rule::SlowDns.evaluate(&c).unwrap().is_empty());
    c.dns_latency_ms = Some(450.0);
    assert_eq!(Rule::SlowDns.evaluate(&c).unwrap()[0].severity, Severity::Info);
    c.dns_latency_ms = Some(1_500.0);
    let r = Rule::SlowDns.evaluate(&c).unwrap();
    assert_eq!(r[0].severity, Severity::Warning);
    assert_eq!(r[0].category, ProblemCategory::Dns);
}

#[test]
fn test_custom_rule() {
    let rule = Rule::custom("always", |_ctx| {
        Ok(vec![lanwatch::diagnostics::rules::RuleResult::new(
            "always",
            Severity::Info,
            ProblemCategory::Configuration,
            "Always fires",
        )])
    });
    assert_eq!(rule.name(), "always");
    assert_eq!(rule.evaluate(&ctx(Vec::new())).unwrap().len(), 1);
}
