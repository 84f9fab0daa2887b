use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use pancheck_core::{PanCheckError, PanCheckResult};
use pancheck_domain::entities::TaskExecution;
use pancheck_domain::repositories::{PageQuery, TaskExecutionRepository};

pub struct SqliteTaskExecutionRepository {
    pool: SqlitePool,
}

impl SqliteTaskExecutionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_execution(row: &sqlx::sqlite::SqliteRow) -> PanCheckResult<TaskExecution> {
        Ok(TaskExecution {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            status: row.try_get("status")?,
            links_count: row.try_get("links_count")?,
            checked_count: row.try_get("checked_count")?,
            valid_count: row.try_get("valid_count")?,
            invalid_count: row.try_get("invalid_count")?,
            error_message: row.try_get("error_message")?,
            duration_ms: row.try_get("duration_ms")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TaskExecutionRepository for SqliteTaskExecutionRepository {
    async fn create(&self, execution: &TaskExecution) -> PanCheckResult<TaskExecution> {
        let row = sqlx::query(
            r#"
            INSERT INTO task_executions
                (task_id, status, links_count, checked_count, valid_count, invalid_count,
                 error_message, duration_ms, started_at, finished_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(execution.task_id)
        .bind(execution.status)
        .bind(execution.links_count)
        .bind(execution.checked_count)
        .bind(execution.valid_count)
        .bind(execution.invalid_count)
        .bind(&execution.error_message)
        .bind(execution.duration_ms)
        .bind(execution.started_at)
        .bind(execution.finished_at)
        .bind(execution.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_execution(&row)
    }

    async fn update(&self, execution: &TaskExecution) -> PanCheckResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE task_executions
            SET status = ?, links_count = ?, checked_count = ?, valid_count = ?,
                invalid_count = ?, error_message = ?, duration_ms = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(execution.status)
        .bind(execution.links_count)
        .bind(execution.checked_count)
        .bind(execution.valid_count)
        .bind(execution.invalid_count)
        .bind(&execution.error_message)
        .bind(execution.duration_ms)
        .bind(execution.finished_at)
        .bind(execution.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PanCheckError::execution_not_found(execution.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<TaskExecution>> {
        let row = sqlx::query("SELECT * FROM task_executions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_execution(&r)).transpose()
    }

    async fn list_by_task(
        &self,
        task_id: i64,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<TaskExecution>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM task_executions WHERE task_id = ?")
                .bind(task_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(
            "SELECT * FROM task_executions WHERE task_id = ? ORDER BY started_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(task_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let executions = rows
            .iter()
            .map(Self::row_to_execution)
            .collect::<PanCheckResult<Vec<_>>>()?;
        Ok((executions, total))
    }
}
