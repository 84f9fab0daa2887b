use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pancheck_core::PanCheckResult;

use crate::platform::Platform;
use crate::repositories::{StatisticsRepository, TimeGranularity, TimeSeriesPoint};

/// 全局统计概览
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsOverview {
    pub total_invalid_links: i64,
    pub total_submissions: i64,
    pub completed_submissions: i64,
    pub pending_submissions: i64,
    /// 疑似限流导致误判的链接数
    pub rate_limited_links: i64,
    pub total_scheduled_tasks: i64,
}

/// 单个平台的无效登记数
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInvalidCount {
    pub platform: Platform,
    pub count: i64,
}

/// 统计聚合服务
pub struct StatisticsService {
    repo: Arc<dyn StatisticsRepository>,
}

impl StatisticsService {
    pub fn new(repo: Arc<dyn StatisticsRepository>) -> Self {
        Self { repo }
    }

    pub async fn overview(&self) -> PanCheckResult<StatisticsOverview> {
        use crate::entities::SubmissionStatus;

        Ok(StatisticsOverview {
            total_invalid_links: self.repo.count_invalid_links().await?,
            total_submissions: self.repo.count_submissions().await?,
            completed_submissions: self
                .repo
                .count_submissions_by_status(SubmissionStatus::Checked)
                .await?,
            pending_submissions: self
                .repo
                .count_submissions_by_status(SubmissionStatus::Pending)
                .await?,
            rate_limited_links: self.repo.count_rate_limited_links().await?,
            total_scheduled_tasks: self.repo.count_tasks().await?,
        })
    }

    /// 各平台的无效登记数，没有登记的平台补零
    pub async fn platform_invalid_counts(&self) -> PanCheckResult<Vec<PlatformInvalidCount>> {
        let counted: HashMap<Platform, i64> =
            self.repo.invalid_counts_by_platform().await?.into_iter().collect();

        let mut results: Vec<PlatformInvalidCount> = Platform::supported()
            .iter()
            .map(|&platform| PlatformInvalidCount {
                platform,
                count: counted.get(&platform).copied().unwrap_or(0),
            })
            .collect();
        results.push(PlatformInvalidCount {
            platform: Platform::Unknown,
            count: counted.get(&Platform::Unknown).copied().unwrap_or(0),
        });
        Ok(results)
    }

    pub async fn submission_time_series(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        granularity: TimeGranularity,
    ) -> PanCheckResult<Vec<TimeSeriesPoint>> {
        self.repo.submission_time_series(start, end, granularity).await
    }
}
