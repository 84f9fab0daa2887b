//! PanCheck的REST API层
//!
//! 基于Axum构建，对外提供：
//! - 链接提交与立即检测
//! - 提交记录查询
//! - 定时任务管理（创建、更新、启停、手动运行）
//! - 执行记录查询
//! - 限流误判登记的查询与清理
//! - 统计概览、平台失效分布与提交时间序列

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
pub use routes::AppState;

/// 组装完整的API应用
pub fn create_app(state: AppState) -> Router {
    routes::create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
