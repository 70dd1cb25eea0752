use super::SqliteStore;
use crate::models::Scan;
use crate::store::ScanRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const COLUMNS: &str = "id, scan_type, status, started_at, completed_at, devices_found, new_devices, \
     duration_ms, triggered_by, error";

fn parse_scan_row(row: &SqliteRow) -> anyhow::Result<Scan> {
    let devices_found: i64 = row.try_get("devices_found")?;
    let new_devices: i64 = row.try_get("new_devices")?;
    Ok(Scan {
        id: row.try_get("id")?,
        scan_type: row.try_get::<String, _>("scan_type")?.parse()?,
        status: row.try_get::<String, _>("status")?.parse()?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        devices_found: u32::try_from(devices_found)?,
        new_devices: u32::try_from(new_devices)?,
        duration_ms: row.try_get("duration_ms")?,
        triggered_by: row.try_get::<String, _>("triggered_by")?.parse()?,
        error: row.try_get("error")?,
    })
}

#[async_trait]
impl ScanRepo for SqliteStore {
    async fn create(&self, scan: &Scan) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO scans ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            COLUMNS
        ))
        .bind(&scan.id)
        .bind(scan.scan_type.as_str())
        .bind(scan.status.as_str())
        .bind(scan.started_at)
        .bind(scan.completed_at)
        .bind(scan.devices_found as i64)
        .bind(scan.new_devices as i64)
        .bind(scan.duration_ms)
        .bind(scan.triggered_by.as_str())
        .bind(&scan.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, scan: &Scan) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE scans SET status = $1, completed_at = $2, devices_found = $3, new_devices = $4, \
             duration_ms = $5, error = $6 WHERE id = $7",
        )
        .bind(scan.status.as_str())
        .bind(scan.completed_at)
        .bind(scan.devices_found as i64)
        .bind(scan.new_devices as i64)
        .bind(scan.duration_ms)
        .bind(&scan.error)
        .bind(&scan.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(&self) -> anyhow::Result<Option<Scan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM scans ORDER BY started_at DESC, rowid DESC LIMIT 1",
            COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_scan_row).transpose()
    }
}
