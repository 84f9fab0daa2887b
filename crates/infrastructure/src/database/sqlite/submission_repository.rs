use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use pancheck_core::{PanCheckError, PanCheckResult};
use pancheck_domain::entities::{CheckedLink, SubmissionRecord};
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{PageQuery, SubmissionRepository};

pub struct SqliteSubmissionRepository {
    pool: SqlitePool,
}

impl SqliteSubmissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> PanCheckResult<SubmissionRecord> {
        let links_json: String = row.try_get("links")?;
        let links: Vec<CheckedLink> = serde_json::from_str(&links_json)
            .map_err(|e| PanCheckError::Serialization(format!("解析提交链接失败: {e}")))?;

        let platforms_json: String = row.try_get("selected_platforms")?;
        let selected_platforms: Vec<Platform> = serde_json::from_str(&platforms_json)
            .map_err(|e| PanCheckError::Serialization(format!("解析平台选择失败: {e}")))?;

        Ok(SubmissionRecord {
            id: row.try_get("id")?,
            source: row.try_get("source")?,
            client_ip: row.try_get("client_ip")?,
            selected_platforms,
            links,
            duplicate_count: row.try_get("duplicate_count")?,
            invalid_format_count: row.try_get("invalid_format_count")?,
            status: row.try_get("status")?,
            total_duration_ms: row.try_get("total_duration_ms")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl SubmissionRepository for SqliteSubmissionRepository {
    async fn create(&self, record: &SubmissionRecord) -> PanCheckResult<SubmissionRecord> {
        let links = serde_json::to_string(&record.links)?;
        let platforms = serde_json::to_string(&record.selected_platforms)?;

        let row = sqlx::query(
            r#"
            INSERT INTO submission_records
                (source, client_ip, selected_platforms, links, duplicate_count,
                 invalid_format_count, status, total_duration_ms, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(record.source)
        .bind(&record.client_ip)
        .bind(&platforms)
        .bind(&links)
        .bind(record.duplicate_count)
        .bind(record.invalid_format_count)
        .bind(record.status)
        .bind(record.total_duration_ms)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_record(&row)
    }

    async fn update(&self, record: &SubmissionRecord) -> PanCheckResult<()> {
        let links = serde_json::to_string(&record.links)?;

        let result = sqlx::query(
            r#"
            UPDATE submission_records
            SET links = ?, status = ?, total_duration_ms = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&links)
        .bind(record.status)
        .bind(record.total_duration_ms)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PanCheckError::submission_not_found(record.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<SubmissionRecord>> {
        let row = sqlx::query("SELECT * FROM submission_records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_record(&r)).transpose()
    }

    async fn list(&self, page: &PageQuery) -> PanCheckResult<(Vec<SubmissionRecord>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submission_records")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT * FROM submission_records ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<PanCheckResult<Vec<_>>>()?;
        Ok((records, total))
    }
}
