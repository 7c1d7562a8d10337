use async_trait::async_trait;
use calc_domain::{Expression, ExpressionRepository, ExpressionStatus};
use calc_errors::{CalcError, CalcResult};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// SQLite implementation of ExpressionRepository
pub struct SqliteExpressionRepository {
    pool: SqlitePool,
}

impl SqliteExpressionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> CalcResult<Expression> {
        Ok(Expression {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expression: row.try_get("expression")?,
            status: row.try_get("status")?,
            result: row.try_get("result")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ExpressionRepository for SqliteExpressionRepository {
    async fn create(&self, user_id: i64, text: &str) -> CalcResult<Expression> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO expressions (user_id, expression, status, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(ExpressionStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(Expression {
            id: row.try_get("id")?,
            user_id,
            expression: text.to_string(),
            status: ExpressionStatus::Pending,
            result: None,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64, user_id: i64) -> CalcResult<Option<Expression>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, expression, status, result, created_at
            FROM expressions
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::map_row(&r)).transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> CalcResult<Vec<Expression>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, expression, status, result, created_at
            FROM expressions
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn update_status(
        &self,
        id: i64,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> CalcResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM expressions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CalcError::expression_not_found(id))?;

        let current: ExpressionStatus = row.try_get("status")?;
        if !current.can_transition_to(status) {
            return Err(CalcError::InvalidStatusTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        sqlx::query("UPDATE expressions SET status = ?, result = ? WHERE id = ?")
            .bind(status)
            .bind(result)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Expression {} moved to {}", id, status);
        Ok(())
    }

    async fn get_unfinished(&self) -> CalcResult<Vec<Expression>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, expression, status, result, created_at
            FROM expressions
            WHERE status IN ('pending', 'in_progress')
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn delete(&self, id: i64, user_id: i64) -> CalcResult<()> {
        sqlx::query("DELETE FROM expressions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
