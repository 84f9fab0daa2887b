use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::entities::{ScheduledTask, SubmissionSource, TaskExecution, TaskStatus};
use crate::repositories::ScheduledTaskRepository;
use crate::schedule::CronPlanner;
use crate::services::{ExecutionRecorder, SubmissionService};
use crate::ports::SourceFetcher;

/// 触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 用户手动触发，不改动任务的调度簿记
    Manual,
    /// 外部触发器按CRON时间触发，推进last_run_at/next_run_at
    Scheduled,
}

/// 定时任务执行管道：取数 → 转换 → 提交检测 → 记录执行
pub struct TaskRunner {
    tasks: Arc<dyn ScheduledTaskRepository>,
    fetcher: Arc<dyn SourceFetcher>,
    submissions: Arc<SubmissionService>,
    recorder: Arc<ExecutionRecorder>,
}

impl TaskRunner {
    pub fn new(
        tasks: Arc<dyn ScheduledTaskRepository>,
        fetcher: Arc<dyn SourceFetcher>,
        submissions: Arc<SubmissionService>,
        recorder: Arc<ExecutionRecorder>,
    ) -> Self {
        Self {
            tasks,
            fetcher,
            submissions,
            recorder,
        }
    }

    /// 执行一次任务
    ///
    /// 管道失败记为failed执行，不影响任务本身的状态。
    /// 同一任务的并发执行不做互斥，调用方自行约束。
    pub async fn run_task(&self, task_id: i64, mode: RunMode) -> PanCheckResult<TaskExecution> {
        let now = Utc::now();
        let mut task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or(PanCheckError::TaskNotFound { id: task_id })?;

        // 触发前先落定过期状态
        if task.expire_if_due(now) {
            self.tasks.update(&task).await?;
        }

        match mode {
            RunMode::Manual => {
                if !task.can_run_manually() {
                    return Err(PanCheckError::state_transition(format!(
                        "任务 '{}' 已过期，不能手动运行",
                        task.name
                    )));
                }
            }
            RunMode::Scheduled => {
                if task.status != TaskStatus::Active {
                    return Err(PanCheckError::state_transition(format!(
                        "任务 '{}' 当前状态为 {:?}，不接受定时触发",
                        task.name, task.status
                    )));
                }
                // 触发即推进簿记，与管道成败无关
                let next = CronPlanner::new(&task.cron_expression)?.next_execution_time(now);
                task.record_run(now, next);
                self.tasks.update(&task).await?;
            }
        }

        let execution = self.recorder.start(task.id, now).await?;
        info!(task_id = task.id, execution_id = execution.id, mode = ?mode, "开始执行任务");

        match self.pipeline(&task).await {
            Ok((links, checked, valid, invalid)) => {
                self.recorder
                    .finish_success(execution, links, checked, valid, invalid)
                    .await
            }
            Err(e) => {
                warn!(task_id = task.id, error = %e, "任务执行失败");
                self.recorder.finish_failed(execution, &e.to_string()).await
            }
        }
    }

    async fn pipeline(&self, task: &ScheduledTask) -> PanCheckResult<(i64, i64, i64, i64)> {
        let text = self
            .fetcher
            .fetch_links(&task.fetch_command, task.transform_script.as_deref())
            .await?;

        let record = self
            .submissions
            .submit(
                &text,
                &task.selected_platforms,
                SubmissionSource::Scheduled,
                None,
            )
            .await?;

        let valid = record.valid_count();
        let invalid = record.invalid_count();
        Ok((record.total_links(), valid + invalid, valid, invalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ExecutionStatus;
    use crate::platform::Platform;
    use crate::ports::{BatchOutcome, LinkVerdict};
    use crate::services::test_support::{
        FailingFetcher, InMemoryExecutions, InMemoryInvalidLinks, InMemorySubmissions,
        InMemoryTasks, StubFetcher, StubValidator,
    };
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn sample_task(status: TaskStatus) -> ScheduledTask {
        let now = Utc::now();
        ScheduledTask {
            id: 0,
            name: "资源巡检".to_string(),
            description: None,
            tags: vec![],
            fetch_command: "curl https://source.example.com/links".to_string(),
            transform_script: None,
            cron_expression: "0 0 3 * * *".to_string(),
            selected_platforms: vec![],
            auto_destroy_at: None,
            status,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn runner_with(
        fetcher: Arc<dyn SourceFetcher>,
        outcome: BatchOutcome,
    ) -> (TaskRunner, Arc<InMemoryTasks>, Arc<InMemoryExecutions>) {
        let tasks = Arc::new(InMemoryTasks::default());
        let executions = Arc::new(InMemoryExecutions::default());
        let submissions = Arc::new(SubmissionService::new(
            Arc::new(InMemorySubmissions::default()),
            Arc::new(InMemoryInvalidLinks::default()),
            Arc::new(StubValidator::new(outcome)),
            Duration::from_secs(30),
            Duration::from_secs(270),
        ));
        let recorder = Arc::new(ExecutionRecorder::new(executions.clone()));
        (
            TaskRunner::new(tasks.clone(), fetcher, submissions, recorder),
            tasks,
            executions,
        )
    }

    fn outcome_one_valid_one_invalid() -> BatchOutcome {
        BatchOutcome {
            valid: vec!["https://pan.baidu.com/s/ok".to_string()],
            invalid: vec![LinkVerdict {
                url: "https://pan.quark.cn/s/dead".to_string(),
                platform: Platform::Quark,
                failure_reason: "分享已失效".to_string(),
                is_rate_limited: false,
                check_duration_ms: Some(120),
            }],
            total_duration_ms: 500,
        }
    }

    #[tokio::test]
    async fn test_manual_run_success() {
        let fetcher = Arc::new(StubFetcher {
            text: "pan.baidu.com/s/ok\npan.quark.cn/s/dead".to_string(),
        });
        let (runner, tasks, _) = runner_with(fetcher, outcome_one_valid_one_invalid());
        let id = tasks.seed(sample_task(TaskStatus::Stopped));

        let execution = runner.run_task(id, RunMode::Manual).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.links_count, 2);
        assert_eq!(execution.checked_count, 2);
        assert_eq!(execution.valid_count, 1);
        assert_eq!(execution.invalid_count, 1);

        // 手动运行不改动调度簿记
        let task = tasks.get(id).unwrap();
        assert!(task.last_run_at.is_none());
        assert!(task.next_run_at.is_none());
        assert_eq!(task.status, TaskStatus::Stopped);
    }

    #[tokio::test]
    async fn test_scheduled_run_advances_bookkeeping() {
        let fetcher = Arc::new(StubFetcher {
            text: "pan.baidu.com/s/ok".to_string(),
        });
        let (runner, tasks, _) = runner_with(
            fetcher,
            BatchOutcome {
                valid: vec!["https://pan.baidu.com/s/ok".to_string()],
                invalid: vec![],
                total_duration_ms: 100,
            },
        );
        let mut task = sample_task(TaskStatus::Active);
        task.next_run_at = Some(Utc::now());
        let id = tasks.seed(task);

        let execution = runner.run_task(id, RunMode::Scheduled).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Success);

        let stored = tasks.get(id).unwrap();
        assert!(stored.last_run_at.is_some());
        assert!(stored.next_run_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_scheduled_run_rejected_for_stopped_task() {
        let fetcher = Arc::new(StubFetcher { text: String::new() });
        let (runner, tasks, executions) = runner_with(fetcher, BatchOutcome::default());
        let id = tasks.seed(sample_task(TaskStatus::Stopped));

        let err = runner.run_task(id, RunMode::Scheduled).await.unwrap_err();
        assert!(matches!(err, PanCheckError::StateTransition(_)));
        assert_eq!(executions.len(), 0);
    }

    #[tokio::test]
    async fn test_run_expires_due_task_first() {
        let fetcher = Arc::new(StubFetcher { text: String::new() });
        let (runner, tasks, _) = runner_with(fetcher, BatchOutcome::default());
        let mut task = sample_task(TaskStatus::Active);
        task.auto_destroy_at = Some(Utc::now() - ChronoDuration::minutes(1));
        let id = tasks.seed(task);

        let err = runner.run_task(id, RunMode::Manual).await.unwrap_err();
        assert!(matches!(err, PanCheckError::StateTransition(_)));
        assert_eq!(tasks.get(id).unwrap().status, TaskStatus::Expired);
    }

    #[tokio::test]
    async fn test_fetch_failure_records_failed_execution() {
        let (runner, tasks, executions) =
            runner_with(Arc::new(FailingFetcher), BatchOutcome::default());
        let id = tasks.seed(sample_task(TaskStatus::Active));

        let execution = runner.run_task(id, RunMode::Manual).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error_message.is_some());
        assert!(execution.finished_at.is_some());
        assert_eq!(executions.len(), 1);

        // 失败不改动任务状态
        assert_eq!(tasks.get(id).unwrap().status, TaskStatus::Active);
    }

    #[tokio::test]
    async fn test_empty_fetch_result_records_failure() {
        let fetcher = Arc::new(StubFetcher { text: String::new() });
        let (runner, tasks, _) = runner_with(fetcher, BatchOutcome::default());
        let id = tasks.seed(sample_task(TaskStatus::Active));

        let execution = runner.run_task(id, RunMode::Manual).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_run_missing_task() {
        let fetcher = Arc::new(StubFetcher { text: String::new() });
        let (runner, _, _) = runner_with(fetcher, BatchOutcome::default());

        let err = runner.run_task(404, RunMode::Manual).await.unwrap_err();
        assert!(matches!(err, PanCheckError::TaskNotFound { id: 404 }));
    }
}
