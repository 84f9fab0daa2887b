use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use pancheck_core::PanCheckResult;
use pancheck_domain::entities::SubmissionStatus;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{StatisticsRepository, TimeGranularity, TimeSeriesPoint};

pub struct SqliteStatisticsRepository {
    pool: SqlitePool,
}

impl SqliteStatisticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> PanCheckResult<i64> {
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl StatisticsRepository for SqliteStatisticsRepository {
    async fn count_submissions(&self) -> PanCheckResult<i64> {
        self.count("SELECT COUNT(*) FROM submission_records").await
    }

    async fn count_submissions_by_status(&self, status: SubmissionStatus) -> PanCheckResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM submission_records WHERE status = ?")
                .bind(status)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_invalid_links(&self) -> PanCheckResult<i64> {
        self.count("SELECT COUNT(*) FROM invalid_links").await
    }

    async fn count_rate_limited_links(&self) -> PanCheckResult<i64> {
        self.count("SELECT COUNT(*) FROM invalid_links WHERE is_rate_limited = 1")
            .await
    }

    async fn invalid_counts_by_platform(&self) -> PanCheckResult<Vec<(Platform, i64)>> {
        let rows = sqlx::query(
            "SELECT platform, COUNT(*) AS cnt FROM invalid_links GROUP BY platform",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let platform: Platform = row.try_get("platform")?;
                let count: i64 = row.try_get("cnt")?;
                Ok((platform, count))
            })
            .collect()
    }

    async fn count_tasks(&self) -> PanCheckResult<i64> {
        self.count("SELECT COUNT(*) FROM scheduled_tasks").await
    }

    async fn submission_time_series(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        granularity: TimeGranularity,
    ) -> PanCheckResult<Vec<TimeSeriesPoint>> {
        let format = match granularity {
            TimeGranularity::Day => "%Y-%m-%d",
            TimeGranularity::Hour => "%Y-%m-%d %H:00",
        };

        let mut sql = String::from(
            "SELECT strftime(?, created_at) AS bucket, COUNT(*) AS cnt FROM submission_records",
        );
        let mut conditions = Vec::new();
        if start.is_some() {
            conditions.push("created_at >= ?");
        }
        if end.is_some() {
            conditions.push("created_at <= ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" GROUP BY bucket ORDER BY bucket");

        let mut query = sqlx::query(&sql).bind(format);
        if let Some(start) = start {
            query = query.bind(start);
        }
        if let Some(end) = end {
            query = query.bind(end);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(TimeSeriesPoint {
                    bucket: row.try_get("bucket")?,
                    count: row.try_get("cnt")?,
                })
            })
            .collect()
    }
}
