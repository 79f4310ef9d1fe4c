//! Staff-only, read-only listings across all users

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};

use super::{page_of, page_window, StaffUser};
use crate::database::{AdminFilter, AdminRecord};
use crate::error::AppResult;
use crate::models::{
    Page, PageParams, SleepGoal, SleepReminder, SleepSessionView, SleepStatistics, UserProfile,
};
use crate::AppState;

type AdminPage<T> = AppResult<Json<Page<AdminRecord<T>>>>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(profiles))
        .route("/sleep-sessions", get(sleep_sessions))
        .route("/goals", get(goals))
        .route("/reminders", get(reminders))
        .route("/statistics", get(statistics))
}

fn window(state: &AppState, filter: &AdminFilter) -> (u32, i64, i64) {
    page_window(state, PageParams { page: filter.page })
}

pub async fn profiles(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Query(filter): Query<AdminFilter>,
) -> AdminPage<UserProfile> {
    let (page, limit, offset) = window(&state, &filter);
    let (records, count) = state.db.admin_profiles(&filter, limit, offset).await?;
    tracing::debug!(staff_id = %staff.id, count, "Admin profile listing");
    Ok(Json(page_of(&state, page, records, count)))
}

pub async fn sleep_sessions(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(filter): Query<AdminFilter>,
) -> AdminPage<SleepSessionView> {
    let (page, limit, offset) = window(&state, &filter);
    let (records, count) = state.db.admin_sessions(&filter, limit, offset).await?;
    Ok(Json(page_of(&state, page, records, count)))
}

pub async fn goals(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(filter): Query<AdminFilter>,
) -> AdminPage<SleepGoal> {
    let (page, limit, offset) = window(&state, &filter);
    let (records, count) = state.db.admin_goals(&filter, limit, offset).await?;
    Ok(Json(page_of(&state, page, records, count)))
}

pub async fn reminders(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(filter): Query<AdminFilter>,
) -> AdminPage<SleepReminder> {
    let (page, limit, offset) = window(&state, &filter);
    let (records, count) = state.db.admin_reminders(&filter, limit, offset).await?;
    Ok(Json(page_of(&state, page, records, count)))
}

pub async fn statistics(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(filter): Query<AdminFilter>,
) -> AdminPage<SleepStatistics> {
    let (page, limit, offset) = window(&state, &filter);
    let (records, count) = state.db.admin_statistics(&filter, limit, offset).await?;
    Ok(Json(page_of(&state, page, records, count)))
}
