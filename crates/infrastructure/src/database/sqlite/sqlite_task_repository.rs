use async_trait::async_trait;
use calc_domain::{NewTask, Task, TaskCompletion, TaskRepository};
use calc_errors::CalcResult;
use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const TASK_COLUMNS: &str =
    "id, expression_id, arg1, arg2, operation, operation_time, started_at, completed, result";

/// SQLite implementation of TaskRepository
///
/// The claim and complete operations are the concurrency hinge of the whole
/// system and run as single statements / single transactions. A naive
/// read-then-write here would hand the same task to two workers.
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> CalcResult<Task> {
        Ok(Task {
            id: row.try_get("id")?,
            expression_id: row.try_get("expression_id")?,
            arg1: row.try_get("arg1")?,
            arg2: row.try_get("arg2")?,
            operation: row.try_get("operation")?,
            operation_time_ms: row.try_get("operation_time")?,
            started_at: row.try_get("started_at")?,
            completed: row.try_get("completed")?,
            result: row.try_get("result")?,
        })
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &NewTask) -> CalcResult<Task> {
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (expression_id, arg1, arg2, operation, operation_time)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(task.expression_id)
        .bind(task.arg1)
        .bind(task.arg2)
        .bind(task.operation)
        .bind(task.operation_time_ms)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        debug!(
            "Created task {}: {} {} {}",
            id, task.arg1, task.operation, task.arg2
        );

        Ok(Task {
            id,
            expression_id: task.expression_id,
            arg1: task.arg1,
            arg2: task.arg2,
            operation: task.operation,
            operation_time_ms: task.operation_time_ms,
            started_at: None,
            completed: false,
            result: None,
        })
    }

    async fn claim_next(&self, stale_after: Duration) -> CalcResult<Option<Task>> {
        let now = Utc::now();
        let stale_cutoff = now - stale_after;

        // Single-statement claim: select the smallest-id claimable task and
        // stamp it in one atomic UPDATE. A claimed-but-unfinished task whose
        // started_at predates the stale cutoff is claimable again; this is
        // the only retry path for crashed workers.
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET started_at = ?
            WHERE id = (
                SELECT id FROM tasks
                WHERE completed = FALSE
                  AND (started_at IS NULL OR started_at <= ?)
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(stale_cutoff)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let task = Self::map_row(&row)?;
                debug!("Claimed task {} for dispatch", task.id);
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, task_id: i64, result: f64) -> CalcResult<Option<TaskCompletion>> {
        let mut tx = self.pool.begin().await?;

        // completed = FALSE in the predicate makes a duplicate submit a
        // no-op: once completed, a task row is immutable.
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET completed = TRUE, result = ?
            WHERE id = ? AND completed = FALSE
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(result)
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let task = Self::map_row(&row)?;

        let siblings_remaining: i64 = sqlx::query(
            "SELECT COUNT(*) AS remaining FROM tasks WHERE expression_id = ? AND completed = FALSE",
        )
        .bind(task.expression_id)
        .fetch_one(&mut *tx)
        .await?
        .try_get("remaining")?;

        tx.commit().await?;

        debug!(
            "Completed task {} = {}, {} sibling(s) remaining",
            task_id, result, siblings_remaining
        );

        Ok(Some(TaskCompletion {
            task,
            siblings_remaining,
        }))
    }

    async fn get_by_id(&self, id: i64) -> CalcResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::map_row(&r)).transpose()
    }

    async fn get_by_expression(&self, expression_id: i64) -> CalcResult<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE expression_id = ? ORDER BY id ASC"
        ))
        .bind(expression_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn count_pending(&self) -> CalcResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM tasks WHERE completed = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn count_completed(&self) -> CalcResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM tasks WHERE completed = TRUE")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }
}
