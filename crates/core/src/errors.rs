use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PanCheckError {
    #[error("数据验证失败: {0}")]
    Validation(String),
    #[error("非法状态转换: {0}")]
    StateTransition(String),
    #[error("资源冲突: {0}")]
    Conflict(String),
    #[error("定时任务不存在: id={id}")]
    TaskNotFound { id: i64 },
    #[error("提交记录不存在: id={id}")]
    SubmissionNotFound { id: i64 },
    #[error("执行记录不存在: id={id}")]
    ExecutionNotFound { id: i64 },
    #[error("CRON表达式 '{expr}' 无效: {message}")]
    InvalidCron { expr: String, message: String },
    #[error("上游服务调用失败: {0}")]
    Upstream(String),
    #[error("操作超时: {0}")]
    Timeout(String),
    #[error("数据库操作失败: {0}")]
    DatabaseOperation(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("数据序列化错误: {0}")]
    Serialization(String),
    #[error("系统内部错误: {0}")]
    Internal(String),
}

pub type PanCheckResult<T> = Result<T, PanCheckError>;

impl PanCheckError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
    pub fn state_transition<S: Into<String>>(msg: S) -> Self {
        Self::StateTransition(msg.into())
    }
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn task_not_found(id: i64) -> Self {
        Self::TaskNotFound { id }
    }
    pub fn submission_not_found(id: i64) -> Self {
        Self::SubmissionNotFound { id }
    }
    pub fn execution_not_found(id: i64) -> Self {
        Self::ExecutionNotFound { id }
    }
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PanCheckError::DatabaseOperation(_)
                | PanCheckError::Upstream(_)
                | PanCheckError::Timeout(_)
        )
    }

    pub fn user_message(&self) -> &str {
        match self {
            PanCheckError::Validation(_) => "输入数据验证失败",
            PanCheckError::StateTransition(_) => "当前状态不允许该操作",
            PanCheckError::Conflict(_) => "资源已存在或状态冲突",
            PanCheckError::TaskNotFound { .. } => "请求的定时任务不存在",
            PanCheckError::SubmissionNotFound { .. } => "请求的提交记录不存在",
            PanCheckError::ExecutionNotFound { .. } => "请求的执行记录不存在",
            PanCheckError::InvalidCron { .. } => "CRON表达式格式有误",
            PanCheckError::Upstream(_) => "检测服务暂时不可用，请稍后重试",
            PanCheckError::Timeout(_) => "操作超时，请稍后重试",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<sqlx::Error> for PanCheckError {
    fn from(err: sqlx::Error) -> Self {
        PanCheckError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for PanCheckError {
    fn from(err: serde_json::Error) -> Self {
        PanCheckError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for PanCheckError {
    fn from(err: anyhow::Error) -> Self {
        PanCheckError::Internal(err.to_string())
    }
}
