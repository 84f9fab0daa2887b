use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use pancheck_domain::services::{
    ExecutionRecorder, ScheduledTaskService, StatisticsService, SubmissionService, TaskRunner,
};

use crate::handlers::{
    health::health_check,
    links::{clear_rate_limited, get_submission, list_rate_limited, list_submissions, submit_links},
    statistics::{platform_invalid_counts, statistics_overview, submission_time_series},
    tasks::{
        create_task, delete_task, disable_task, enable_task, get_execution, get_task,
        list_task_executions, list_task_tags, list_tasks, run_task, update_task,
    },
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<SubmissionService>,
    pub tasks: Arc<ScheduledTaskService>,
    pub runner: Arc<TaskRunner>,
    pub recorder: Arc<ExecutionRecorder>,
    pub statistics: Arc<StatisticsService>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 链接提交与查询
        .route("/api/links/check", post(submit_links))
        .route("/api/submissions", get(list_submissions))
        .route("/api/submissions/{id}", get(get_submission))
        // 限流误判登记
        .route(
            "/api/invalid-links/rate-limited",
            get(list_rate_limited).delete(clear_rate_limited),
        )
        // 定时任务管理
        .route("/api/scheduled-tasks", get(list_tasks).post(create_task))
        .route("/api/scheduled-tasks/tags", get(list_task_tags))
        .route(
            "/api/scheduled-tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/scheduled-tasks/{id}/enable", post(enable_task))
        .route("/api/scheduled-tasks/{id}/disable", post(disable_task))
        .route("/api/scheduled-tasks/{id}/run", post(run_task))
        .route(
            "/api/scheduled-tasks/{id}/executions",
            get(list_task_executions),
        )
        .route("/api/executions/{id}", get(get_execution))
        // 统计
        .route("/api/statistics/overview", get(statistics_overview))
        .route(
            "/api/statistics/platform-invalid-counts",
            get(platform_invalid_counts),
        )
        .route(
            "/api/statistics/submission-time-series",
            get(submission_time_series),
        )
        .with_state(state)
}
