use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::partition::ClassifiedLink;
use crate::platform::Platform;

/// 单条链接的检测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Valid,
    Invalid,
}

/// 提交记录的整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Checked,
}

/// 提交来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionSource {
    Manual,
    Scheduled,
}

/// 定时任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Stopped,
    Expired,
}

/// 单次执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// 提交中的一条链接及其检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedLink {
    pub url: String,
    pub platform: Platform,
    pub status: LinkStatus,
    pub failure_reason: Option<String>,
}

impl CheckedLink {
    pub fn pending(link: ClassifiedLink) -> Self {
        Self {
            url: link.url,
            platform: link.platform,
            status: LinkStatus::Pending,
            failure_reason: None,
        }
    }
}

/// 一次链接提交的完整记录，只追加不删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub source: SubmissionSource,
    pub client_ip: Option<String>,
    pub selected_platforms: Vec<Platform>,
    pub links: Vec<CheckedLink>,
    pub duplicate_count: i64,
    pub invalid_format_count: i64,
    pub status: SubmissionStatus,
    /// 立即检测分支的总耗时
    pub total_duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(
        source: SubmissionSource,
        client_ip: Option<String>,
        selected_platforms: Vec<Platform>,
        links: Vec<ClassifiedLink>,
        duplicate_count: i64,
        invalid_format_count: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            source,
            client_ip,
            selected_platforms,
            links: links.into_iter().map(CheckedLink::pending).collect(),
            duplicate_count,
            invalid_format_count,
            status: SubmissionStatus::Pending,
            total_duration_ms: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_links(&self) -> i64 {
        self.links.len() as i64
    }

    pub fn valid_count(&self) -> i64 {
        self.count_status(LinkStatus::Valid)
    }

    pub fn invalid_count(&self) -> i64 {
        self.count_status(LinkStatus::Invalid)
    }

    pub fn pending_count(&self) -> i64 {
        self.count_status(LinkStatus::Pending)
    }

    fn count_status(&self, status: LinkStatus) -> i64 {
        self.links.iter().filter(|l| l.status == status).count() as i64
    }

    /// 链接状态只允许从pending改写，检测结果到达后不再变动
    pub fn mark_valid(&mut self, url: &str) {
        if let Some(link) = self.pending_link_mut(url) {
            link.status = LinkStatus::Valid;
        }
    }

    pub fn mark_invalid(&mut self, url: &str, reason: &str) {
        if let Some(link) = self.pending_link_mut(url) {
            link.status = LinkStatus::Invalid;
            link.failure_reason = Some(reason.to_string());
        }
    }

    fn pending_link_mut(&mut self, url: &str) -> Option<&mut CheckedLink> {
        self.links
            .iter_mut()
            .find(|l| l.url == url && l.status == LinkStatus::Pending)
    }

    /// 立即检测分支完成后落定记录状态
    pub fn finish_check(&mut self, duration_ms: i64, now: DateTime<Utc>) {
        self.status = SubmissionStatus::Checked;
        self.total_duration_ms = Some(duration_ms);
        self.updated_at = now;
    }
}

/// 定时检测任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// 取数规格，原样透传给执行管道，本核心不解释
    pub fetch_command: String,
    /// 转换规格，同样原样透传
    pub transform_script: Option<String>,
    pub cron_expression: String,
    pub selected_platforms: Vec<Platform>,
    /// 自毁时间，过点后任务永不再触发
    pub auto_destroy_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledTask {
    /// 基础字段校验
    pub fn validate(&self) -> PanCheckResult<()> {
        if self.name.trim().is_empty() {
            return Err(PanCheckError::validation("任务名称不能为空"));
        }
        if self.fetch_command.trim().is_empty() {
            return Err(PanCheckError::validation("取数规格不能为空"));
        }
        if self.cron_expression.trim().is_empty() {
            return Err(PanCheckError::validation("CRON表达式不能为空"));
        }
        Ok(())
    }

    /// 自毁时间是否已过
    pub fn past_deadline(&self, now: DateTime<Utc>) -> bool {
        matches!(self.auto_destroy_at, Some(deadline) if deadline <= now)
    }

    /// 启用任务并写入下一次触发时间
    ///
    /// 自毁时间不在将来时一律拒绝，不看当前状态。
    pub fn enable(&mut self, next_run: DateTime<Utc>, now: DateTime<Utc>) -> PanCheckResult<()> {
        if self.past_deadline(now) {
            return Err(PanCheckError::state_transition(format!(
                "任务 '{}' 的自毁时间已过，不能启用",
                self.name
            )));
        }
        if self.status == TaskStatus::Expired {
            return Err(PanCheckError::state_transition(format!(
                "任务 '{}' 已过期，不能直接启用",
                self.name
            )));
        }
        self.status = TaskStatus::Active;
        self.next_run_at = Some(next_run);
        self.updated_at = now;
        Ok(())
    }

    /// 停用任务，任何状态下都允许，同时清除下一次触发时间
    pub fn disable(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Stopped;
        self.next_run_at = None;
        self.updated_at = now;
    }

    /// 到达自毁时间则标记过期，返回是否发生了状态变化
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TaskStatus::Active && self.past_deadline(now) {
            self.status = TaskStatus::Expired;
            self.next_run_at = None;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// 定时触发后的运行簿记，手动运行不调用
    pub fn record_run(&mut self, fired_at: DateTime<Utc>, next_run: Option<DateTime<Utc>>) {
        self.last_run_at = Some(fired_at);
        if self.status == TaskStatus::Active {
            self.next_run_at = next_run;
        }
        self.updated_at = fired_at;
    }

    /// 手动运行是否允许：active或stopped可运行，expired不可
    pub fn can_run_manually(&self) -> bool {
        matches!(self.status, TaskStatus::Active | TaskStatus::Stopped)
    }
}

/// 定时任务的一次执行记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    pub id: i64,
    pub task_id: i64,
    pub status: ExecutionStatus,
    pub links_count: i64,
    pub checked_count: i64,
    pub valid_count: i64,
    pub invalid_count: i64,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TaskExecution {
    pub fn start(task_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            task_id,
            status: ExecutionStatus::Running,
            links_count: 0,
            checked_count: 0,
            valid_count: 0,
            invalid_count: 0,
            error_message: None,
            duration_ms: None,
            started_at: now,
            finished_at: None,
            created_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success | ExecutionStatus::Failed)
    }

    fn ensure_running(&self) -> PanCheckResult<()> {
        if self.is_terminal() {
            return Err(PanCheckError::state_transition(format!(
                "执行记录 {} 已是终态，不允许再变更",
                self.id
            )));
        }
        Ok(())
    }

    /// 成功收尾，计数须满足 valid+invalid ≤ checked ≤ links
    pub fn finish_success(
        &mut self,
        links_count: i64,
        checked_count: i64,
        valid_count: i64,
        invalid_count: i64,
        now: DateTime<Utc>,
    ) -> PanCheckResult<()> {
        self.ensure_running()?;
        if valid_count + invalid_count > checked_count || checked_count > links_count {
            return Err(PanCheckError::validation(format!(
                "执行计数不满足约束: valid={valid_count} invalid={invalid_count} checked={checked_count} links={links_count}"
            )));
        }
        self.status = ExecutionStatus::Success;
        self.links_count = links_count;
        self.checked_count = checked_count;
        self.valid_count = valid_count;
        self.invalid_count = invalid_count;
        self.finish_at(now);
        Ok(())
    }

    /// 失败收尾，必须携带错误信息
    pub fn finish_failed(&mut self, message: &str, now: DateTime<Utc>) -> PanCheckResult<()> {
        self.ensure_running()?;
        if message.trim().is_empty() {
            return Err(PanCheckError::validation("失败的执行必须携带错误信息"));
        }
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message.to_string());
        self.finish_at(now);
        Ok(())
    }

    fn finish_at(&mut self, now: DateTime<Utc>) {
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
    }
}

/// 无效链接登记，供后续提交直接命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidLink {
    pub id: i64,
    pub url: String,
    pub platform: Platform,
    pub failure_reason: String,
    pub is_rate_limited: bool,
    pub check_duration_ms: Option<i64>,
    pub submission_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
