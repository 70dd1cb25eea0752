use super::{SqliteStore, blob};
use crate::models::HealthScore;
use crate::store::HealthRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

const COLUMNS: &str = "id, score, category, factors, trend, previous_score, calculated_at";

fn parse_health_row(row: &SqliteRow) -> anyhow::Result<HealthScore> {
    let factors: Vec<u8> = row.try_get("factors")?;
    let score: i64 = row.try_get("score")?;
    let previous_score: Option<i64> = row.try_get("previous_score")?;
    Ok(HealthScore {
        id: row.try_get("id")?,
        score: score.clamp(0, 100) as u8,
        category: row.try_get::<String, _>("category")?.parse()?,
        factors: blob::decode_factors(&factors)?,
        trend: row.try_get::<String, _>("trend")?.parse()?,
        previous_score: previous_score.map(|p| p.clamp(0, 100) as u8),
        calculated_at: row.try_get("calculated_at")?,
    })
}

#[async_trait]
impl HealthRepo for SqliteStore {
    #[instrument(skip(self, score), fields(repo = "health", operation = "insert", score = score.score))]
    async fn insert(&self, score: &HealthScore) -> anyhow::Result<()> {
        let factors = blob::encode_factors(&score.factors)?;
        sqlx::query(&format!(
            "INSERT INTO health_scores ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            COLUMNS
        ))
        .bind(&score.id)
        .bind(score.score as i64)
        .bind(score.category.as_str())
        .bind(&factors)
        .bind(score.trend.as_str())
        .bind(score.previous_score.map(|p| p as i64))
        .bind(score.calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(&self) -> anyhow::Result<Option<HealthScore>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM health_scores ORDER BY seq DESC LIMIT 1",
            COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_health_row).transpose()
    }

    async fn history(&self, limit: u32) -> anyhow::Result<Vec<HealthScore>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM health_scores ORDER BY seq DESC LIMIT $1",
            COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_health_row).collect()
    }

    #[instrument(skip(self), fields(repo = "health", operation = "trim"))]
    async fn trim(&self, keep: u32) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "DELETE FROM health_scores WHERE seq NOT IN (SELECT seq FROM health_scores ORDER BY seq DESC LIMIT $1)",
        )
        .bind(keep as i64)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
