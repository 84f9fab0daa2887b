use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::entities::{ScheduledTask, TaskStatus};
use crate::platform::Platform;
use crate::repositories::{PageQuery, ScheduledTaskRepository, TaskFilter};
use crate::schedule::CronPlanner;

/// 创建定时任务的输入
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub fetch_command: String,
    pub transform_script: Option<String>,
    pub cron_expression: String,
    pub selected_platforms: Vec<Platform>,
    pub auto_destroy_at: Option<DateTime<Utc>>,
    /// 创建后直接启用
    pub activate: bool,
}

/// 更新定时任务的输入，None表示保持不变
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub fetch_command: Option<String>,
    pub transform_script: Option<Option<String>>,
    pub cron_expression: Option<String>,
    pub selected_platforms: Option<Vec<Platform>>,
    /// 外层None保持不变，Some(None)清除自毁时间
    pub auto_destroy_at: Option<Option<DateTime<Utc>>>,
}

/// 定时任务生命周期管理
pub struct ScheduledTaskService {
    tasks: Arc<dyn ScheduledTaskRepository>,
}

impl ScheduledTaskService {
    pub fn new(tasks: Arc<dyn ScheduledTaskRepository>) -> Self {
        Self { tasks }
    }

    pub async fn create(&self, input: NewTask) -> PanCheckResult<ScheduledTask> {
        let now = Utc::now();
        let mut task = ScheduledTask {
            id: 0,
            name: input.name,
            description: input.description,
            tags: input.tags,
            fetch_command: input.fetch_command,
            transform_script: input.transform_script,
            cron_expression: input.cron_expression,
            selected_platforms: input.selected_platforms,
            auto_destroy_at: input.auto_destroy_at,
            status: TaskStatus::Stopped,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        };

        task.validate()?;
        CronPlanner::validate_expression(&task.cron_expression)?;
        self.ensure_name_available(&task.name, None).await?;

        if input.activate {
            let next = self.plan_next(&task.cron_expression, now)?;
            task.enable(next, now)?;
        }

        let task = self.tasks.create(&task).await?;
        info!(task_id = task.id, name = %task.name, "定时任务已创建");
        Ok(task)
    }

    pub async fn get(&self, id: i64) -> PanCheckResult<ScheduledTask> {
        self.tasks
            .find_by_id(id)
            .await?
            .ok_or(PanCheckError::TaskNotFound { id })
    }

    pub async fn update(&self, id: i64, update: TaskUpdate) -> PanCheckResult<ScheduledTask> {
        let mut task = self.get(id).await?;
        if task.status == TaskStatus::Expired {
            return Err(PanCheckError::state_transition(format!(
                "任务 '{}' 已过期，不能修改",
                task.name
            )));
        }

        let now = Utc::now();
        let mut schedule_changed = false;

        if let Some(name) = update.name {
            if name != task.name {
                self.ensure_name_available(&name, Some(id)).await?;
                task.name = name;
            }
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(tags) = update.tags {
            task.tags = tags;
        }
        if let Some(fetch_command) = update.fetch_command {
            task.fetch_command = fetch_command;
        }
        if let Some(transform_script) = update.transform_script {
            task.transform_script = transform_script;
        }
        if let Some(cron_expression) = update.cron_expression {
            if cron_expression != task.cron_expression {
                CronPlanner::validate_expression(&cron_expression)?;
                task.cron_expression = cron_expression;
                schedule_changed = true;
            }
        }
        if let Some(selected_platforms) = update.selected_platforms {
            task.selected_platforms = selected_platforms;
        }
        if let Some(auto_destroy_at) = update.auto_destroy_at {
            if auto_destroy_at != task.auto_destroy_at {
                task.auto_destroy_at = auto_destroy_at;
                schedule_changed = true;
            }
        }

        task.validate()?;

        // 运行中的任务改了调度相关字段必须立刻重算，不留陈旧的触发时间
        if task.status == TaskStatus::Active && schedule_changed {
            if task.expire_if_due(now) {
                info!(task_id = task.id, "自毁时间已过，任务转为过期");
            } else {
                let next = self.plan_next(&task.cron_expression, now)?;
                task.next_run_at = Some(next);
            }
        }
        task.updated_at = now;

        self.tasks.update(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, id: i64) -> PanCheckResult<()> {
        // 执行记录保留作审计，不随任务删除
        if !self.tasks.delete(id).await? {
            return Err(PanCheckError::TaskNotFound { id });
        }
        info!(task_id = id, "定时任务已删除");
        Ok(())
    }

    pub async fn enable(&self, id: i64) -> PanCheckResult<ScheduledTask> {
        let mut task = self.get(id).await?;
        let now = Utc::now();
        let next = self.plan_next(&task.cron_expression, now)?;
        task.enable(next, now)?;
        self.tasks.update(&task).await?;
        info!(task_id = task.id, next_run = %next, "定时任务已启用");
        Ok(task)
    }

    pub async fn disable(&self, id: i64) -> PanCheckResult<ScheduledTask> {
        let mut task = self.get(id).await?;
        task.disable(Utc::now());
        self.tasks.update(&task).await?;
        info!(task_id = task.id, "定时任务已停用");
        Ok(task)
    }

    pub async fn list(
        &self,
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<ScheduledTask>, i64)> {
        self.tasks.list(filter, page).await
    }

    pub async fn all_tags(&self) -> PanCheckResult<Vec<String>> {
        self.tasks.all_tags().await
    }

    /// 巡检所有到达自毁时间的active任务并标记过期，返回处理条数
    pub async fn check_expired(&self, now: DateTime<Utc>) -> PanCheckResult<u64> {
        let due = self.tasks.find_expired(now).await?;
        let mut count = 0u64;
        for mut task in due {
            if task.expire_if_due(now) {
                self.tasks.update(&task).await?;
                info!(task_id = task.id, name = %task.name, "任务到达自毁时间，已标记过期");
                count += 1;
            }
        }
        Ok(count)
    }

    async fn ensure_name_available(&self, name: &str, exclude_id: Option<i64>) -> PanCheckResult<()> {
        if self.tasks.exists_by_name(name, exclude_id).await? {
            return Err(PanCheckError::conflict(format!("任务名称 '{name}' 已存在")));
        }
        Ok(())
    }

    fn plan_next(&self, cron_expr: &str, from: DateTime<Utc>) -> PanCheckResult<DateTime<Utc>> {
        CronPlanner::new(cron_expr)?
            .next_execution_time(from)
            .ok_or_else(|| {
                PanCheckError::validation(format!("CRON表达式 '{cron_expr}' 无法计算下一次触发时间"))
            })
    }
}
