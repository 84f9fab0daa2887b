use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use pancheck_domain::entities::TaskStatus;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{PageQuery, TaskFilter};
use pancheck_domain::services::{NewTask, RunMode, TaskUpdate};

use crate::{
    error::ApiResult,
    response::{created, no_content, success, PaginatedResponse},
    routes::AppState,
};

/// 任务创建请求
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fetch_command: String,
    pub transform_script: Option<String>,
    pub cron_expression: String,
    #[serde(default)]
    pub selected_platforms: Vec<Platform>,
    pub auto_destroy_at: Option<DateTime<Utc>>,
    /// 创建后直接启用
    #[serde(default)]
    pub activate: bool,
}

/// 任务更新请求，缺省字段保持不变
///
/// description、transform_script和auto_destroy_at用双层Option区分
/// 「不修改」与「清空」：字段缺省为不修改，显式null为清空。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub fetch_command: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub transform_script: Option<Option<String>>,
    pub cron_expression: Option<String>,
    pub selected_platforms: Option<Vec<Platform>>,
    #[serde(default, deserialize_with = "double_option")]
    pub auto_destroy_at: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// 任务列表查询参数
#[derive(Debug, Deserialize)]
pub struct TaskQueryParams {
    /// 逗号分隔的标签集合，命中任意一个即可
    pub tags: Option<String>,
    pub status: Option<TaskStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunTaskRequest {
    /// true表示按定时触发处理，推进调度簿记
    #[serde(default)]
    pub scheduled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionQueryParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// 创建定时任务
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state
        .tasks
        .create(NewTask {
            name: request.name,
            description: request.description,
            tags: request.tags,
            fetch_command: request.fetch_command,
            transform_script: request.transform_script,
            cron_expression: request.cron_expression,
            selected_platforms: request.selected_platforms,
            auto_destroy_at: request.auto_destroy_at,
            activate: request.activate,
        })
        .await?;
    Ok(created(task))
}

/// 获取任务列表
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let filter = TaskFilter {
        tags: params
            .tags
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        status: params.status,
    };
    let page = PageQuery {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(20),
    }
    .normalized();

    let (tasks, total) = state.tasks.list(&filter, &page).await?;
    Ok(success(PaginatedResponse::new(
        tasks,
        total,
        page.page,
        page.page_size,
    )))
}

/// 获取单个任务
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.tasks.get(id).await?;
    Ok(success(task))
}

/// 更新任务
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state
        .tasks
        .update(
            id,
            TaskUpdate {
                name: request.name,
                description: request.description,
                tags: request.tags,
                fetch_command: request.fetch_command,
                transform_script: request.transform_script,
                cron_expression: request.cron_expression,
                selected_platforms: request.selected_platforms,
                auto_destroy_at: request.auto_destroy_at,
            },
        )
        .await?;
    Ok(success(task))
}

/// 删除任务，执行记录保留
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.tasks.delete(id).await?;
    Ok(no_content())
}

/// 启用任务
pub async fn enable_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.tasks.enable(id).await?;
    Ok(success(task))
}

/// 停用任务
pub async fn disable_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.tasks.disable(id).await?;
    Ok(success(task))
}

/// 运行一次任务
///
/// 默认按手动触发处理，不改动调度簿记；
/// 外部定时触发器带scheduled=true调用。
pub async fn run_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: Option<Json<RunTaskRequest>>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let mode = match request {
        Some(Json(r)) if r.scheduled => RunMode::Scheduled,
        _ => RunMode::Manual,
    };
    let execution = state.runner.run_task(id, mode).await?;
    Ok(success(execution))
}

/// 获取任务的执行记录列表
pub async fn list_task_executions(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Query(params): Query<ExecutionQueryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let page = PageQuery {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(20),
    }
    .normalized();
    let (executions, total) = state.recorder.list_by_task(task_id, &page).await?;
    Ok(success(PaginatedResponse::new(
        executions,
        total,
        page.page,
        page.page_size,
    )))
}

/// 获取单条执行记录
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let execution = state.recorder.get(id).await?;
    Ok(success(execution))
}

/// 所有任务上出现过的标签
pub async fn list_task_tags(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let tags = state.tasks.all_tags().await?;
    Ok(success(tags))
}
