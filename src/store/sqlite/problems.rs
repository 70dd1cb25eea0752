use super::{SqliteStore, blob};
use crate::models::Problem;
use crate::store::ProblemRepo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

const COLUMNS: &str = "id, rule_id, severity, category, title, description, impact, recommendation, \
     affected_devices, is_active, detected_at, resolved_at";

fn parse_problem_row(row: &SqliteRow) -> anyhow::Result<Problem> {
    let affected: Vec<u8> = row.try_get("affected_devices")?;
    Ok(Problem {
        id: row.try_get("id")?,
        rule_id: row.try_get("rule_id")?,
        severity: row.try_get::<String, _>("severity")?.parse()?,
        category: row.try_get::<String, _>("category")?.parse()?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        impact: row.try_get("impact")?,
        recommendation: row.try_get("recommendation")?,
        affected_devices: blob::decode_ids(&affected)?,
        is_active: row.try_get("is_active")?,
        detected_at: row.try_get("detected_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

#[async_trait]
impl ProblemRepo for SqliteStore {
    async fn find_active_by_rule_id(&self, rule_id: &str) -> anyhow::Result<Option<Problem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM problems WHERE rule_id = $1 AND is_active = 1",
            COLUMNS
        ))
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_problem_row).transpose()
    }

    #[instrument(skip(self, problem), fields(repo = "problems", operation = "create", rule_id = %problem.rule_id))]
    async fn create(&self, problem: &Problem) -> anyhow::Result<()> {
        let affected = blob::encode_ids(&problem.affected_devices)?;
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query("SELECT id FROM problems WHERE rule_id = $1 AND is_active = 1")
            .bind(&problem.rule_id)
            .fetch_optional(&mut *tx)
            .await?;
        anyhow::ensure!(
            existing.is_none() || !problem.is_active,
            "active problem already exists for rule {}",
            problem.rule_id
        );
        sqlx::query(&format!(
            "INSERT INTO problems ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            COLUMNS
        ))
        .bind(&problem.id)
        .bind(&problem.rule_id)
        .bind(problem.severity.as_str())
        .bind(problem.category.as_str())
        .bind(&problem.title)
        .bind(&problem.description)
        .bind(&problem.impact)
        .bind(&problem.recommendation)
        .bind(&affected)
        .bind(problem.is_active)
        .bind(problem.detected_at)
        .bind(problem.resolved_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_active(&self, problem: &Problem) -> anyhow::Result<()> {
        let affected = blob::encode_ids(&problem.affected_devices)?;
        sqlx::query(
            "UPDATE problems SET severity = $1, category = $2, title = $3, description = $4, impact = $5, \
             recommendation = $6, affected_devices = $7 WHERE id = $8 AND is_active = 1",
        )
        .bind(problem.severity.as_str())
        .bind(problem.category.as_str())
        .bind(&problem.title)
        .bind(&problem.description)
        .bind(&problem.impact)
        .bind(&problem.recommendation)
        .bind(&affected)
        .bind(&problem.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "problems", operation = "get_active"))]
    async fn get_active(&self) -> anyhow::Result<Vec<Problem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM problems WHERE is_active = 1 ORDER BY detected_at ASC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_problem_row).collect()
    }

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Problem>> {
        let row = sqlx::query(&format!("SELECT {} FROM problems WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_problem_row).transpose()
    }

    #[instrument(skip(self), fields(repo = "problems", operation = "resolve"))]
    async fn resolve(&self, id: &str, resolved_at: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE problems SET is_active = 0, resolved_at = $1 WHERE id = $2 AND is_active = 1")
            .bind(resolved_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn last_resolved_at(&self, rule_id: &str) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT MAX(resolved_at) AS resolved_at FROM problems WHERE rule_id = $1 AND is_active = 0",
        )
        .bind(rule_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("resolved_at")?)
    }

    async fn get_by_rule_id(&self, rule_id: &str) -> anyhow::Result<Vec<Problem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM problems WHERE rule_id = $1 ORDER BY detected_at ASC",
            COLUMNS
        ))
        .bind(rule_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_problem_row).collect()
    }
}
