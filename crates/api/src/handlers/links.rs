use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use pancheck_domain::entities::SubmissionSource;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::PageQuery;

use crate::{
    error::ApiResult,
    response::{success, PaginatedResponse},
    routes::AppState,
};

/// 链接提交请求
#[derive(Debug, Deserialize)]
pub struct SubmitLinksRequest {
    /// 多行文本，每行一条链接
    pub content: String,
    /// 立即检测的平台选择，空表示全部立即检测
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

/// 分页查询参数
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    fn to_query(&self) -> PageQuery {
        PageQuery {
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(20),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateLimitedParams {
    pub platform: Option<Platform>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

/// 提交一批链接并立即检测
pub async fn submit_links(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitLinksRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = state
        .submissions
        .submit(
            &request.content,
            &request.platforms,
            SubmissionSource::Manual,
            client_ip(&headers),
        )
        .await?;
    Ok(success(record))
}

/// 获取提交记录列表
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let page = params.to_query().normalized();
    let (records, total) = state.submissions.list(&page).await?;
    Ok(success(PaginatedResponse::new(
        records,
        total,
        page.page,
        page.page_size,
    )))
}

/// 获取单条提交记录
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = state.submissions.get(id).await?;
    Ok(success(record))
}

/// 查询限流误判的无效登记
pub async fn list_rate_limited(
    State(state): State<AppState>,
    Query(params): Query<RateLimitedParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let page = PageQuery {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(20),
    }
    .normalized();
    let (links, total) = state
        .submissions
        .list_rate_limited(params.platform, &page)
        .await?;
    Ok(success(PaginatedResponse::new(
        links,
        total,
        page.page,
        page.page_size,
    )))
}

/// 清除限流误判的登记，让这些链接下次重新送检
pub async fn clear_rate_limited(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let removed = state.submissions.clear_rate_limited().await?;
    Ok(success(serde_json::json!({ "removed": removed })))
}
