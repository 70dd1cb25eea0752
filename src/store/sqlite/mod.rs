// SQLite store. One pool, one table per entity; implements every repository trait.

mod alerts;
mod blob;
mod devices;
mod health;
mod metrics;
mod problems;
mod scans;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        id TEXT PRIMARY KEY,
        ip_address TEXT NOT NULL,
        mac_address TEXT NOT NULL UNIQUE,
        hostname TEXT,
        custom_name TEXT,
        vendor TEXT,
        device_type TEXT NOT NULL,
        status TEXT NOT NULL,
        is_gateway INTEGER NOT NULL DEFAULT 0,
        is_monitored INTEGER NOT NULL DEFAULT 1,
        first_seen INTEGER NOT NULL,
        last_seen INTEGER NOT NULL,
        latency_ms REAL,
        packet_loss REAL,
        open_ports BLOB NOT NULL,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        latency_ms REAL,
        packet_loss REAL NOT NULL,
        jitter_ms REAL,
        is_reachable INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_device ON metrics(device_id, timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS speed_tests (
        id TEXT PRIMARY KEY,
        timestamp INTEGER NOT NULL,
        download_mbps REAL NOT NULL,
        upload_mbps REAL NOT NULL,
        ping_ms REAL NOT NULL,
        jitter_ms REAL,
        isp TEXT,
        server_name TEXT,
        server_location TEXT,
        contracted_download_mbps REAL,
        contracted_upload_mbps REAL,
        download_percent REAL,
        upload_percent REAL,
        triggered_by TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_speed_tests_timestamp ON speed_tests(timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS problems (
        id TEXT PRIMARY KEY,
        rule_id TEXT NOT NULL,
        severity TEXT NOT NULL,
        category TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        impact TEXT NOT NULL,
        recommendation TEXT NOT NULL,
        affected_devices BLOB NOT NULL,
        is_active INTEGER NOT NULL,
        detected_at INTEGER NOT NULL,
        resolved_at INTEGER
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_problems_active_rule ON problems(rule_id) WHERE is_active = 1",
    "CREATE INDEX IF NOT EXISTS idx_problems_rule ON problems(rule_id, resolved_at)",
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        alert_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        device_id TEXT,
        problem_id TEXT,
        created_at INTEGER NOT NULL,
        read_at INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS health_scores (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        score INTEGER NOT NULL,
        category TEXT NOT NULL,
        factors BLOB NOT NULL,
        trend TEXT NOT NULL,
        previous_score INTEGER,
        calculated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scans (
        id TEXT PRIMARY KEY,
        scan_type TEXT NOT NULL,
        status TEXT NOT NULL,
        started_at INTEGER NOT NULL,
        completed_at INTEGER,
        devices_found INTEGER NOT NULL DEFAULT 0,
        new_devices INTEGER NOT NULL DEFAULT 0,
        duration_ms INTEGER,
        triggered_by TEXT NOT NULL,
        error TEXT
    )
    "#,
];

impl SqliteStore {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
