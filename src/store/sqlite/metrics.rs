use super::SqliteStore;
use crate::models::Metric;
use crate::store::MetricRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

fn parse_metric_row(row: &SqliteRow) -> anyhow::Result<Metric> {
    Ok(Metric {
        device_id: row.try_get("device_id")?,
        timestamp: row.try_get("timestamp")?,
        latency_ms: row.try_get("latency_ms")?,
        packet_loss: row.try_get("packet_loss")?,
        jitter_ms: row.try_get("jitter_ms")?,
        is_reachable: row.try_get("is_reachable")?,
    })
}

#[async_trait]
impl MetricRepo for SqliteStore {
    #[instrument(skip(self, metrics), fields(repo = "metrics", operation = "insert_many", metrics_count = metrics.len()))]
    async fn insert_many(&self, metrics: &[Metric]) -> anyhow::Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for m in metrics {
            sqlx::query(
                "INSERT INTO metrics (device_id, timestamp, latency_ms, packet_loss, jitter_ms, is_reachable) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&m.device_id)
            .bind(m.timestamp)
            .bind(m.latency_ms)
            .bind(m.packet_loss)
            .bind(m.jitter_ms)
            .bind(m.is_reachable)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "get_since"))]
    async fn get_since(&self, since: i64) -> anyhow::Result<Vec<Metric>> {
        let rows = sqlx::query(
            "SELECT device_id, timestamp, latency_ms, packet_loss, jitter_ms, is_reachable
             FROM metrics WHERE timestamp >= $1 ORDER BY timestamp ASC, id ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_metric_row).collect()
    }

    async fn get_for_device_since(
        &self,
        device_id: &str,
        since: i64,
    ) -> anyhow::Result<Vec<Metric>> {
        let rows = sqlx::query(
            "SELECT device_id, timestamp, latency_ms, packet_loss, jitter_ms, is_reachable
             FROM metrics WHERE device_id = $1 AND timestamp >= $2 ORDER BY timestamp ASC, id ASC",
        )
        .bind(device_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_metric_row).collect()
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_before"))]
    async fn prune_before(&self, cutoff: i64) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
