use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::entities::TaskExecution;
use crate::repositories::{PageQuery, TaskExecutionRepository};

/// 执行记录器：一次触发对应一条执行记录，终态只写一次
pub struct ExecutionRecorder {
    executions: Arc<dyn TaskExecutionRepository>,
}

impl ExecutionRecorder {
    pub fn new(executions: Arc<dyn TaskExecutionRepository>) -> Self {
        Self { executions }
    }

    /// 开始一次执行，立即落库为running
    pub async fn start(&self, task_id: i64, now: DateTime<Utc>) -> PanCheckResult<TaskExecution> {
        let execution = TaskExecution::start(task_id, now);
        self.executions.create(&execution).await
    }

    pub async fn finish_success(
        &self,
        mut execution: TaskExecution,
        links_count: i64,
        checked_count: i64,
        valid_count: i64,
        invalid_count: i64,
    ) -> PanCheckResult<TaskExecution> {
        execution.finish_success(links_count, checked_count, valid_count, invalid_count, Utc::now())?;
        self.executions.update(&execution).await?;
        info!(
            execution_id = execution.id,
            task_id = execution.task_id,
            links = links_count,
            valid = valid_count,
            invalid = invalid_count,
            "任务执行成功"
        );
        Ok(execution)
    }

    pub async fn finish_failed(
        &self,
        mut execution: TaskExecution,
        message: &str,
    ) -> PanCheckResult<TaskExecution> {
        execution.finish_failed(message, Utc::now())?;
        self.executions.update(&execution).await?;
        Ok(execution)
    }

    pub async fn get(&self, id: i64) -> PanCheckResult<TaskExecution> {
        self.executions
            .find_by_id(id)
            .await?
            .ok_or(PanCheckError::ExecutionNotFound { id })
    }

    pub async fn list_by_task(
        &self,
        task_id: i64,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<TaskExecution>, i64)> {
        self.executions.list_by_task(task_id, page).await
    }
}
