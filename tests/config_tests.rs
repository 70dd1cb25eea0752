// Config loading and validation tests

use lanwatch::config::AppConfig;
use lanwatch::diagnostics::DiagnosticsSettings;

const VALID_CONFIG: &str = r#"
[database]
path = "data/lanwatch.db"
max_pool_size = 5

[discovery]
interval_minutes = 30
sweep_concurrency = 50

[monitoring]
interval_secs = 60
ping_count = 3
batch_size = 10

[diagnostics]
schedule = "0 */5 * * * *"

[thresholds]
high_latency_ms = 100.0
packet_loss_percent = 5.0

[alerts]
cooldown_minutes = 30

[isp]
contracted_download_mbps = 100.0
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.database.path, "data/lanwatch.db");
    assert_eq!(config.database.max_pool_size, 5);
    assert_eq!(config.discovery.sweep_concurrency, 50);
    assert_eq!(config.monitoring.batch_size, 10);
    assert_eq!(config.alerts.cooldown_minutes, 30);
    assert_eq!(config.isp.contracted_download_mbps, Some(100.0));
    assert_eq!(config.isp.contracted_upload_mbps, None);
}

#[test]
fn test_config_defaults_fill_missing_sections() {
    let config = AppConfig::load_from_str(
        r#"
[database]
path = "x.db"
max_pool_size = 1
"#,
    )
    .expect("minimal config");
    assert_eq!(config.database.metric_retention_days, 7);
    assert_eq!(config.discovery.interval_minutes, 30);
    assert!(config.discovery.scan_ports.contains(&9100));
    assert_eq!(config.discovery.probe_timeout_ms, 2000);
    assert_eq!(config.discovery.retry_timeout_ms, 500);
    assert_eq!(config.monitoring.ping_count, 3);
    assert_eq!(config.monitoring.lookback_minutes, 60);
    assert_eq!(config.diagnostics.dns_domain, "google.com");
    assert_eq!(config.thresholds.high_latency_ms, 100.0);
    assert_eq!(config.thresholds.packet_loss_percent, 5.0);
    assert_eq!(config.alerts.cooldown_minutes, 30);
    assert!(!config.speedtest.enabled);
    assert_eq!(config.events.broadcast_capacity, 64);
}

#[test]
fn test_config_requires_database_section() {
    assert!(AppConfig::load_from_str("[monitoring]\ninterval_secs = 5\n").is_err());
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/lanwatch.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 5", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_sweep_concurrency_out_of_range() {
    let bad = VALID_CONFIG.replace("sweep_concurrency = 50", "sweep_concurrency = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("discovery.sweep_concurrency"));

    let bad = VALID_CONFIG.replace("sweep_concurrency = 50", "sweep_concurrency = 300");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("discovery.sweep_concurrency"));
}

#[test]
fn test_config_validation_rejects_ping_count_zero() {
    let bad = VALID_CONFIG.replace("ping_count = 3", "ping_count = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.ping_count"));
}

#[test]
fn test_config_validation_rejects_batch_size_zero() {
    let bad = VALID_CONFIG.replace("batch_size = 10", "batch_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.batch_size"));
}

#[test]
fn test_config_validation_rejects_bad_cron() {
    let bad = VALID_CONFIG.replace("schedule = \"0 */5 * * * *\"", "schedule = \"every five\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("diagnostics.schedule"));
}

#[test]
fn test_config_validation_rejects_packet_loss_over_100() {
    let bad = VALID_CONFIG.replace("packet_loss_percent = 5.0", "packet_loss_percent = 150.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("thresholds.packet_loss_percent"));
}

#[test]
fn test_config_validation_rejects_negative_cooldown() {
    let bad = VALID_CONFIG.replace("cooldown_minutes = 30", "cooldown_minutes = -1");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("alerts.cooldown_minutes"));
}

#[test]
fn test_config_validation_rejects_non_positive_contracted_speed() {
    let bad = VALID_CONFIG.replace(
        "contracted_download_mbps = 100.0",
        "contracted_download_mbps = 0.0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("isp.contracted_download_mbps"));
}

#[test]
fn test_config_validation_rejects_retry_timeout_zero() {
    let bad = VALID_CONFIG.replace("sweep_concurrency = 50", "sweep_concurrency = 50\nretry_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("discovery.retry_timeout_ms"));
}

#[test]
fn test_config_windows_in_millis() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    assert_eq!(config.lookback_ms(), 60 * 60_000);
    assert_eq!(config.cooldown_ms(), 30 * 60_000);
    assert_eq!(config.metric_retention_ms(), 7 * 86_400_000);
}

#[test]
fn test_config_huge_windows_saturate() {
    let huge = VALID_CONFIG
        .replace("cooldown_minutes = 30", "cooldown_minutes = 9223372036854775807")
        .replace("batch_size = 10", "batch_size = 10\nlookback_minutes = 9223372036854775807");
    let config = AppConfig::load_from_str(&huge).unwrap();
    assert_eq!(config.lookback_ms(), i64::MAX);
    assert_eq!(config.cooldown_ms(), i64::MAX);
    let settings = DiagnosticsSettings::from_config(&config);
    assert_eq!(settings.lookback_ms, i64::MAX);
    assert_eq!(settings.cooldown_ms, i64::MAX);
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.database.path, "data/lanwatch.db");
    assert_eq!(config.monitoring.interval_secs, 60);
}
