//! Statistics endpoints
//!
//! Stored statistics are read-only; rows are produced by the scheduled jobs
//! or by an explicit recalculation.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::{page_of, page_window, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::{Page, PageParams, SleepStatistics, StatisticsFilter};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_statistics))
        .route("/summary", get(summary))
        .route("/recalculate", post(recalculate))
        .route("/:id", get(get_statistics))
}

pub async fn list_statistics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(filter): Query<StatisticsFilter>,
) -> AppResult<Json<Page<SleepStatistics>>> {
    let (page, limit, offset) = page_window(&state, PageParams { page: filter.page });
    let (stats, count) = state
        .db
        .list_statistics(&user.id, filter.period_type, limit, offset)
        .await?;
    Ok(Json(page_of(&state, page, stats, count)))
}

pub async fn get_statistics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SleepStatistics>> {
    state
        .db
        .get_statistics(&user.id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Sleep statistics"))
}

/// Overview of the last 30 days
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Response> {
    match state.statistics.summary(&user.id).await? {
        Some(summary) => Ok(Json(summary).into_response()),
        None => Ok(Json(json!({
            "message": "No sleep data available",
            "sessions_count": 0,
        }))
        .into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecalculateRequest {
    pub date: Option<NaiveDate>,
}

/// Recompute the caller's rows for the periods containing `date`
///
/// The body is optional, but a body that is present must be valid JSON.
pub async fn recalculate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> AppResult<Json<Vec<SleepStatistics>>> {
    let date = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RecalculateRequest>(&body)
            .map_err(|e| AppError::bad_request(&format!("Invalid request body: {}", e)))?
            .date
    };
    let stats = state.statistics.recalculate(&user.id, date).await?;
    Ok(Json(stats))
}
