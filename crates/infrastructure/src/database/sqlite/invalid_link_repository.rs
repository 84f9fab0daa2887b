use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use pancheck_core::PanCheckResult;
use pancheck_domain::entities::InvalidLink;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{InvalidLinkRepository, PageQuery};

pub struct SqliteInvalidLinkRepository {
    pool: SqlitePool,
}

impl SqliteInvalidLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_link(row: &sqlx::sqlite::SqliteRow) -> PanCheckResult<InvalidLink> {
        Ok(InvalidLink {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            platform: row.try_get("platform")?,
            failure_reason: row.try_get("failure_reason")?,
            is_rate_limited: row.try_get("is_rate_limited")?,
            check_duration_ms: row.try_get("check_duration_ms")?,
            submission_id: row.try_get("submission_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl InvalidLinkRepository for SqliteInvalidLinkRepository {
    async fn find_by_urls(&self, urls: &[String]) -> PanCheckResult<Vec<InvalidLink>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; urls.len()].join(", ");
        let sql = format!("SELECT * FROM invalid_links WHERE url IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for url in urls {
            query = query.bind(url);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_link).collect()
    }

    async fn upsert_many(&self, links: &[InvalidLink]) -> PanCheckResult<()> {
        for link in links {
            sqlx::query(
                r#"
                INSERT INTO invalid_links
                    (url, platform, failure_reason, is_rate_limited, check_duration_ms,
                     submission_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET
                    platform = excluded.platform,
                    failure_reason = excluded.failure_reason,
                    is_rate_limited = excluded.is_rate_limited,
                    check_duration_ms = excluded.check_duration_ms,
                    submission_id = excluded.submission_id,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&link.url)
            .bind(link.platform)
            .bind(&link.failure_reason)
            .bind(link.is_rate_limited)
            .bind(link.check_duration_ms)
            .bind(link.submission_id)
            .bind(link.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn list_rate_limited(
        &self,
        platform: Option<Platform>,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<InvalidLink>, i64)> {
        let (total, rows) = match platform {
            Some(platform) => {
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM invalid_links WHERE is_rate_limited = 1 AND platform = ?",
                )
                .bind(platform)
                .fetch_one(&self.pool)
                .await?;

                let rows = sqlx::query(
                    "SELECT * FROM invalid_links WHERE is_rate_limited = 1 AND platform = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(platform)
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;
                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM invalid_links WHERE is_rate_limited = 1",
                )
                .fetch_one(&self.pool)
                .await?;

                let rows = sqlx::query(
                    "SELECT * FROM invalid_links WHERE is_rate_limited = 1 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;
                (total, rows)
            }
        };

        let links = rows
            .iter()
            .map(Self::row_to_link)
            .collect::<PanCheckResult<Vec<_>>>()?;
        Ok((links, total))
    }

    async fn delete_rate_limited(&self) -> PanCheckResult<u64> {
        let result = sqlx::query("DELETE FROM invalid_links WHERE is_rate_limited = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> PanCheckResult<u64> {
        let result = sqlx::query("DELETE FROM invalid_links WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
