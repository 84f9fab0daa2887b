use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pancheck_core::PanCheckError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("业务错误: {0}")]
    Domain(#[from] PanCheckError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Domain(PanCheckError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("定时任务 ID {id} 不存在"),
                "TASK_NOT_FOUND".to_string(),
                vec![
                    "请检查任务ID是否正确".to_string(),
                    "使用 GET /api/scheduled-tasks 查看所有任务".to_string(),
                ],
            ),
            ApiError::Domain(PanCheckError::SubmissionNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("提交记录 ID {id} 不存在"),
                "SUBMISSION_NOT_FOUND".to_string(),
                vec![
                    "请检查提交记录ID是否正确".to_string(),
                    "使用 GET /api/submissions 查看所有提交记录".to_string(),
                ],
            ),
            ApiError::Domain(PanCheckError::ExecutionNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("执行记录 ID {id} 不存在"),
                "EXECUTION_NOT_FOUND".to_string(),
                vec![
                    "请检查执行记录ID是否正确".to_string(),
                    "使用 GET /api/scheduled-tasks/{task_id}/executions 查看任务的执行记录"
                        .to_string(),
                ],
            ),
            ApiError::Domain(PanCheckError::InvalidCron { expr, message }) => (
                StatusCode::BAD_REQUEST,
                format!("CRON表达式 '{expr}' 无效: {message}"),
                "INVALID_CRON_EXPRESSION".to_string(),
                vec![
                    "请使用六段式CRON表达式".to_string(),
                    "示例: '0 0 3 * * *' (每天凌晨3点)".to_string(),
                ],
            ),
            ApiError::Domain(PanCheckError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("数据验证失败: {msg}"),
                "VALIDATION_ERROR".to_string(),
                vec!["请检查请求参数是否符合要求".to_string()],
            ),
            ApiError::Domain(PanCheckError::Serialization(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("数据格式错误: {msg}"),
                "SERIALIZATION_ERROR".to_string(),
                vec!["请检查JSON格式是否正确".to_string()],
            ),
            ApiError::Domain(PanCheckError::StateTransition(msg)) => (
                StatusCode::CONFLICT,
                format!("当前状态不允许该操作: {msg}"),
                "STATE_TRANSITION_ERROR".to_string(),
                vec!["请刷新资源状态后重试".to_string()],
            ),
            ApiError::Domain(PanCheckError::Conflict(msg)) => (
                StatusCode::CONFLICT,
                format!("资源冲突: {msg}"),
                "CONFLICT".to_string(),
                vec!["请求的操作与当前资源状态冲突".to_string()],
            ),
            ApiError::Domain(PanCheckError::Upstream(msg)) => (
                StatusCode::BAD_GATEWAY,
                format!("检测服务不可用: {msg}"),
                "UPSTREAM_ERROR".to_string(),
                vec![
                    "检测服务暂时不可用，请稍后重试".to_string(),
                    "受影响的链接保持pending，不会丢失".to_string(),
                ],
            ),
            ApiError::Domain(PanCheckError::Timeout(msg)) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("操作超时: {msg}"),
                "UPSTREAM_TIMEOUT".to_string(),
                vec!["请稍后重试".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {msg}"),
                "BAD_REQUEST".to_string(),
                vec!["请检查请求格式和参数".to_string()],
            ),
            ApiError::Domain(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
