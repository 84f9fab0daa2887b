use axum::extract::{Query, State};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use pancheck_domain::repositories::TimeGranularity;

use crate::{
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

/// 时间序列查询参数，日期为YYYY-MM-DD
#[derive(Debug, Deserialize)]
pub struct TimeSeriesParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<TimeGranularity>,
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("日期格式无效，应为YYYY-MM-DD: {value}")))
}

/// 统计概览
pub async fn statistics_overview(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let overview = state.statistics.overview().await?;
    Ok(success(overview))
}

/// 各平台的无效登记数
pub async fn platform_invalid_counts(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let counts = state.statistics.platform_invalid_counts().await?;
    Ok(success(counts))
}

/// 各时间段的提交记录数
pub async fn submission_time_series(
    State(state): State<AppState>,
    Query(params): Query<TimeSeriesParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let start: Option<DateTime<Utc>> = params
        .start_date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|d| d.and_time(NaiveTime::MIN).and_utc());
    // 结束日期含当天整天：取次日零点前一秒
    let end: Option<DateTime<Utc>> = params
        .end_date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|d| {
            let next_midnight = d
                .checked_add_days(Days::new(1))
                .unwrap_or(d)
                .and_time(NaiveTime::MIN)
                .and_utc();
            next_midnight - chrono::Duration::seconds(1)
        });
    let granularity = params.granularity.unwrap_or(TimeGranularity::Day);

    let series = state
        .statistics
        .submission_time_series(start, end, granularity)
        .await?;
    Ok(success(series))
}
