use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use pancheck_core::{PanCheckError, PanCheckResult};
use pancheck_domain::entities::ScheduledTask;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{PageQuery, ScheduledTaskRepository, TaskFilter};

pub struct SqliteScheduledTaskRepository {
    pool: SqlitePool,
}

impl SqliteScheduledTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> PanCheckResult<ScheduledTask> {
        let tags_json: String = row.try_get("tags")?;
        let tags: Vec<String> = serde_json::from_str(&tags_json)
            .map_err(|e| PanCheckError::Serialization(format!("解析任务标签失败: {e}")))?;

        let platforms_json: String = row.try_get("selected_platforms")?;
        let selected_platforms: Vec<Platform> = serde_json::from_str(&platforms_json)
            .map_err(|e| PanCheckError::Serialization(format!("解析平台选择失败: {e}")))?;

        Ok(ScheduledTask {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            tags,
            fetch_command: row.try_get("fetch_command")?,
            transform_script: row.try_get("transform_script")?,
            cron_expression: row.try_get("cron_expression")?,
            selected_platforms,
            auto_destroy_at: row.try_get("auto_destroy_at")?,
            status: row.try_get("status")?,
            last_run_at: row.try_get("last_run_at")?,
            next_run_at: row.try_get("next_run_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// 组装列表查询的WHERE子句，标签为集合OR匹配，状态精确匹配
    fn filter_clause(filter: &TaskFilter) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            binds.push(status.as_db_str().to_string());
        }
        if !filter.tags.is_empty() {
            let placeholders = vec!["?"; filter.tags.len()].join(", ");
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(scheduled_tasks.tags) WHERE json_each.value IN ({placeholders}))"
            ));
            binds.extend(filter.tags.iter().cloned());
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, binds)
    }
}

#[async_trait]
impl ScheduledTaskRepository for SqliteScheduledTaskRepository {
    async fn create(&self, task: &ScheduledTask) -> PanCheckResult<ScheduledTask> {
        let tags = serde_json::to_string(&task.tags)?;
        let platforms = serde_json::to_string(&task.selected_platforms)?;

        let row = sqlx::query(
            r#"
            INSERT INTO scheduled_tasks
                (name, description, tags, fetch_command, transform_script, cron_expression,
                 selected_platforms, auto_destroy_at, status, last_run_at, next_run_at,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(&tags)
        .bind(&task.fetch_command)
        .bind(&task.transform_script)
        .bind(&task.cron_expression)
        .bind(&platforms)
        .bind(task.auto_destroy_at)
        .bind(task.status)
        .bind(task.last_run_at)
        .bind(task.next_run_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_task(&row)
    }

    async fn update(&self, task: &ScheduledTask) -> PanCheckResult<()> {
        let tags = serde_json::to_string(&task.tags)?;
        let platforms = serde_json::to_string(&task.selected_platforms)?;

        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET name = ?, description = ?, tags = ?, fetch_command = ?, transform_script = ?,
                cron_expression = ?, selected_platforms = ?, auto_destroy_at = ?, status = ?,
                last_run_at = ?, next_run_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(&tags)
        .bind(&task.fetch_command)
        .bind(&task.transform_script)
        .bind(&task.cron_expression)
        .bind(&platforms)
        .bind(task.auto_destroy_at)
        .bind(task.status)
        .bind(task.last_run_at)
        .bind(task.next_run_at)
        .bind(task.updated_at)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PanCheckError::task_not_found(task.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> PanCheckResult<bool> {
        let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<ScheduledTask>> {
        let row = sqlx::query("SELECT * FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_task(&r)).transpose()
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> PanCheckResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM scheduled_tasks WHERE name = ? AND id != ?",
                )
                .bind(name)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM scheduled_tasks WHERE name = ?")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<ScheduledTask>, i64)> {
        let (clause, binds) = Self::filter_clause(filter);

        let count_sql = format!("SELECT COUNT(*) FROM scheduled_tasks{clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT * FROM scheduled_tasks{clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query(&list_sql);
        for bind in &binds {
            list_query = list_query.bind(bind);
        }
        let rows = list_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let tasks = rows
            .iter()
            .map(Self::row_to_task)
            .collect::<PanCheckResult<Vec<_>>>()?;
        Ok((tasks, total))
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> PanCheckResult<Vec<ScheduledTask>> {
        let rows = sqlx::query(
            "SELECT * FROM scheduled_tasks WHERE status = 'ACTIVE' AND auto_destroy_at IS NOT NULL AND auto_destroy_at <= ?",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn all_tags(&self) -> PanCheckResult<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT json_each.value FROM scheduled_tasks, json_each(scheduled_tasks.tags) ORDER BY json_each.value",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }
}
