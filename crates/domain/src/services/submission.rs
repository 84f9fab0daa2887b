use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::entities::{InvalidLink, SubmissionRecord, SubmissionSource};
use crate::links::parse_batch;
use crate::partition::{classify_batch, partition, ClassifiedLink};
use crate::platform::Platform;
use crate::ports::LinkValidator;
use crate::repositories::{InvalidLinkRepository, PageQuery, SubmissionRepository};

/// 链接提交与立即检测服务
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionRepository>,
    invalid_links: Arc<dyn InvalidLinkRepository>,
    validator: Arc<dyn LinkValidator>,
    /// 手动提交的整批检测超时
    check_timeout: Duration,
    /// 定时任务触发时在基础超时上追加的余量
    scheduled_timeout_extra: Duration,
}

impl SubmissionService {
    pub fn new(
        submissions: Arc<dyn SubmissionRepository>,
        invalid_links: Arc<dyn InvalidLinkRepository>,
        validator: Arc<dyn LinkValidator>,
        check_timeout: Duration,
        scheduled_timeout_extra: Duration,
    ) -> Self {
        Self {
            submissions,
            invalid_links,
            validator,
            check_timeout,
            scheduled_timeout_extra,
        }
    }

    /// 提交一批链接并立即检测命中选择的平台
    ///
    /// 上游检测服务不可用时提交仍然落库，受影响的链接保持pending。
    pub async fn submit(
        &self,
        raw_text: &str,
        selection: &[Platform],
        source: SubmissionSource,
        client_ip: Option<String>,
    ) -> PanCheckResult<SubmissionRecord> {
        let batch = parse_batch(raw_text);
        if batch.is_empty() {
            return Err(PanCheckError::validation("提交内容不能为空"));
        }

        let now = Utc::now();
        let classified = classify_batch(&batch.links);

        // 已登记的无效链接直接命中，不再送检
        let known_invalid = self.invalid_links.find_by_urls(&batch.links).await?;
        let fresh: Vec<ClassifiedLink> = classified
            .iter()
            .filter(|l| !known_invalid.iter().any(|k| k.url == l.url))
            .cloned()
            .collect();

        let split = partition(fresh, selection);

        let mut record = SubmissionRecord::new(
            source,
            client_ip,
            selection.to_vec(),
            classified,
            batch.duplicate_count,
            batch.invalid_format_count,
            now,
        );
        for hit in &known_invalid {
            record.mark_invalid(&hit.url, &hit.failure_reason);
        }

        let mut record = self.submissions.create(&record).await?;

        if split.instant.is_empty() {
            // 没有需要立即检测的链接；全部已有结论时直接落定
            if record.pending_count() == 0 {
                record.finish_check(0, Utc::now());
                self.submissions.update(&record).await?;
            }
            return Ok(record);
        }

        let timeout = match source {
            SubmissionSource::Manual => self.check_timeout,
            SubmissionSource::Scheduled => self.check_timeout + self.scheduled_timeout_extra,
        };

        match self.validator.check_batch(&split.instant, timeout).await {
            Ok(outcome) => {
                for url in &outcome.valid {
                    record.mark_valid(url);
                }
                let mut registrations = Vec::with_capacity(outcome.invalid.len());
                for verdict in &outcome.invalid {
                    record.mark_invalid(&verdict.url, &verdict.failure_reason);
                    registrations.push(InvalidLink {
                        id: 0,
                        url: verdict.url.clone(),
                        platform: verdict.platform,
                        failure_reason: verdict.failure_reason.clone(),
                        is_rate_limited: verdict.is_rate_limited,
                        check_duration_ms: verdict.check_duration_ms,
                        submission_id: Some(record.id),
                        created_at: Utc::now(),
                    });
                }
                if !registrations.is_empty() {
                    self.invalid_links.upsert_many(&registrations).await?;
                }

                record.finish_check(outcome.total_duration_ms, Utc::now());
                self.submissions.update(&record).await?;
                info!(
                    submission_id = record.id,
                    valid = record.valid_count(),
                    invalid = record.invalid_count(),
                    pending = record.pending_count(),
                    "链接提交检测完成"
                );
                Ok(record)
            }
            Err(e) if e.is_retryable() => {
                // 提交保留，立即检测分支整体降级为pending
                warn!(submission_id = record.id, error = %e, "检测服务不可用，链接保持pending");
                Ok(record)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: i64) -> PanCheckResult<SubmissionRecord> {
        self.submissions
            .find_by_id(id)
            .await?
            .ok_or(PanCheckError::SubmissionNotFound { id })
    }

    pub async fn list(&self, page: &PageQuery) -> PanCheckResult<(Vec<SubmissionRecord>, i64)> {
        self.submissions.list(page).await
    }

    pub async fn list_rate_limited(
        &self,
        platform: Option<Platform>,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<InvalidLink>, i64)> {
        self.invalid_links.list_rate_limited(platform, page).await
    }

    /// 清除限流导致的无效登记，让这些链接下次重新送检
    pub async fn clear_rate_limited(&self) -> PanCheckResult<u64> {
        let removed = self.invalid_links.delete_rate_limited().await?;
        info!(removed, "已清除限流登记");
        Ok(removed)
    }
}
