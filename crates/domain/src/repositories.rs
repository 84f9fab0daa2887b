use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pancheck_core::PanCheckResult;

use crate::entities::{
    InvalidLink, ScheduledTask, SubmissionRecord, SubmissionStatus, TaskExecution, TaskStatus,
};
use crate::platform::Platform;

/// 分页查询参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl PageQuery {
    /// 规整非法取值：页码从1起，页大小限制在1..=100
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        let q = self.normalized();
        (q.page - 1) * q.page_size
    }

    pub fn limit(&self) -> i64 {
        self.normalized().page_size
    }
}

/// 定时任务列表过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// 标签集合命中任意一个即可
    pub tags: Vec<String>,
    /// 状态精确匹配
    pub status: Option<TaskStatus>,
}

/// 提交记录仓储
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, record: &SubmissionRecord) -> PanCheckResult<SubmissionRecord>;
    async fn update(&self, record: &SubmissionRecord) -> PanCheckResult<()>;
    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<SubmissionRecord>>;
    async fn list(&self, page: &PageQuery) -> PanCheckResult<(Vec<SubmissionRecord>, i64)>;
}

/// 定时任务仓储
#[async_trait]
pub trait ScheduledTaskRepository: Send + Sync {
    async fn create(&self, task: &ScheduledTask) -> PanCheckResult<ScheduledTask>;
    async fn update(&self, task: &ScheduledTask) -> PanCheckResult<()>;
    async fn delete(&self, id: i64) -> PanCheckResult<bool>;
    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<ScheduledTask>>;
    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> PanCheckResult<bool>;
    async fn list(
        &self,
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<ScheduledTask>, i64)>;
    /// 已到自毁时间但仍为active的任务
    async fn find_expired(&self, now: DateTime<Utc>) -> PanCheckResult<Vec<ScheduledTask>>;
    /// 所有任务上出现过的标签，去重排序
    async fn all_tags(&self) -> PanCheckResult<Vec<String>>;
}

/// 执行记录仓储
#[async_trait]
pub trait TaskExecutionRepository: Send + Sync {
    async fn create(&self, execution: &TaskExecution) -> PanCheckResult<TaskExecution>;
    async fn update(&self, execution: &TaskExecution) -> PanCheckResult<()>;
    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<TaskExecution>>;
    async fn list_by_task(
        &self,
        task_id: i64,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<TaskExecution>, i64)>;
}

/// 无效链接登记仓储
#[async_trait]
pub trait InvalidLinkRepository: Send + Sync {
    /// 按URL批量查询已登记的无效链接
    async fn find_by_urls(&self, urls: &[String]) -> PanCheckResult<Vec<InvalidLink>>;
    /// 登记新的无效链接，已存在的URL覆盖更新
    async fn upsert_many(&self, links: &[InvalidLink]) -> PanCheckResult<()>;
    async fn list_rate_limited(
        &self,
        platform: Option<Platform>,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<InvalidLink>, i64)>;
    /// 清除限流误判的登记，返回删除条数
    async fn delete_rate_limited(&self) -> PanCheckResult<u64>;
    /// 清理超过保留时长的登记，返回删除条数
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> PanCheckResult<u64>;
}

/// 统计聚合的时间粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Hour,
    Day,
}

/// 单个时间桶内的提交记录数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// 按粒度截断的时间桶，天为YYYY-MM-DD，小时为YYYY-MM-DD HH:00
    pub bucket: String,
    pub count: i64,
}

/// 统计聚合查询
#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn count_submissions(&self) -> PanCheckResult<i64>;
    async fn count_submissions_by_status(&self, status: SubmissionStatus) -> PanCheckResult<i64>;
    async fn count_invalid_links(&self) -> PanCheckResult<i64>;
    async fn count_rate_limited_links(&self) -> PanCheckResult<i64>;
    /// 各平台的无效登记数，只含有登记的平台
    async fn invalid_counts_by_platform(&self) -> PanCheckResult<Vec<(Platform, i64)>>;
    async fn count_tasks(&self) -> PanCheckResult<i64>;
    /// 时间范围内每个时间桶的提交记录数，按桶升序
    async fn submission_time_series(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        granularity: TimeGranularity,
    ) -> PanCheckResult<Vec<TimeSeriesPoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_normalized() {
        let q = PageQuery {
            page: 0,
            page_size: 500,
        };
        assert_eq!(q.offset(), 0);
        assert_eq!(q.limit(), 100);

        let q = PageQuery {
            page: 3,
            page_size: 10,
        };
        assert_eq!(q.offset(), 20);
        assert_eq!(q.limit(), 10);
    }
}
