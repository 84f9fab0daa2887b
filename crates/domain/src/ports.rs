use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pancheck_core::PanCheckResult;

use crate::partition::ClassifiedLink;
use crate::platform::Platform;

/// 单条链接的失败判定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkVerdict {
    pub url: String,
    pub platform: Platform,
    pub failure_reason: String,
    pub is_rate_limited: bool,
    pub check_duration_ms: Option<i64>,
}

/// 一批链接的检测结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// 仍然有效的链接URL
    pub valid: Vec<String>,
    /// 判定无效的链接及原因
    pub invalid: Vec<LinkVerdict>,
    /// 整批检测的总耗时
    pub total_duration_ms: i64,
}

/// 外部检测服务
///
/// 真正的网络探测、平台限速和反爬处理都在检测服务内完成，
/// 这里只约定批量调用的数据契约。
#[async_trait]
pub trait LinkValidator: Send + Sync {
    /// 同步检测一批链接，整批一次调用，超时须显著长于普通请求
    async fn check_batch(
        &self,
        links: &[ClassifiedLink],
        timeout: Duration,
    ) -> PanCheckResult<BatchOutcome>;
}

/// 定时任务的取数管道
///
/// fetch与transform两段规格对本核心都是不透明文本，原样传出。
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_links(
        &self,
        fetch_command: &str,
        transform_script: Option<&str>,
    ) -> PanCheckResult<String>;
}
