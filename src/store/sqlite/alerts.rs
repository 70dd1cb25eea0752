use super::SqliteStore;
use crate::models::Alert;
use crate::store::AlertRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

const COLUMNS: &str =
    "id, alert_type, severity, title, message, device_id, problem_id, created_at, read_at";

fn parse_alert_row(row: &SqliteRow) -> anyhow::Result<Alert> {
    Ok(Alert {
        id: row.try_get("id")?,
        alert_type: row.try_get::<String, _>("alert_type")?.parse()?,
        severity: row.try_get::<String, _>("severity")?.parse()?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        device_id: row.try_get("device_id")?,
        problem_id: row.try_get("problem_id")?,
        created_at: row.try_get("created_at")?,
        read_at: row.try_get("read_at")?,
    })
}

#[async_trait]
impl AlertRepo for SqliteStore {
    #[instrument(skip(self, alert), fields(repo = "alerts", operation = "create", alert_type = %alert.alert_type))]
    async fn create(&self, alert: &Alert) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO alerts ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            COLUMNS
        ))
        .bind(&alert.id)
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(&alert.device_id)
        .bind(&alert.problem_id)
        .bind(alert.created_at)
        .bind(alert.read_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_recent(&self, limit: u32) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM alerts ORDER BY created_at DESC, rowid DESC LIMIT $1",
            COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_alert_row).collect()
    }

    async fn get_unread(&self) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM alerts WHERE read_at IS NULL ORDER BY created_at DESC, rowid DESC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_alert_row).collect()
    }

    async fn mark_read(&self, id: &str, read_at: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE alerts SET read_at = $1 WHERE id = $2 AND read_at IS NULL")
            .bind(read_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
