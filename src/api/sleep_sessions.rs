//! Sleep session endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Days, Duration};
use serde_json::json;

use super::{page_of, page_window, AuthUser};
use crate::database::SleepTimeRange;
use crate::error::{AppError, AppResult};
use crate::models::{
    NewSleepSession, Page, PageParams, SessionFilter, SleepSession, SleepSessionPatch,
    SleepSessionView, User,
};
use crate::services::statistics_service::start_of_day;
use crate::AppState;

const RECENT_DAYS: i64 = 7;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/recent", get(recent_sessions))
        .route("/today", get(today_sessions))
        .route(
            "/:id",
            get(get_session)
                .put(replace_session)
                .patch(update_session)
                .delete(delete_session),
        )
        .route("/:id/sync_to_calendar", post(sync_to_calendar))
}

async fn owned_session(state: &AppState, user: &User, id: &str) -> AppResult<SleepSession> {
    state
        .db
        .get_session(&user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Sleep session"))
}

/// Queue a calendar sync when the owner has calendar sync enabled
async fn sync_if_connected(state: &AppState, session: &SleepSession) -> AppResult<()> {
    let profile = state.db.get_or_create_profile(&session.user_id).await?;
    if profile.calendar_connected() {
        state.calendar.enqueue_sync(session.id.clone());
    }
    Ok(())
}

fn views(sessions: Vec<SleepSession>) -> Vec<SleepSessionView> {
    sessions.into_iter().map(SleepSessionView::from).collect()
}

/// Sessions newest first; `end_date` is inclusive
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(filter): Query<SessionFilter>,
) -> AppResult<Json<Page<SleepSessionView>>> {
    let range = SleepTimeRange {
        from: filter.start_date.map(start_of_day),
        to: filter
            .end_date
            .and_then(|date| date.checked_add_days(Days::new(1)))
            .map(start_of_day),
    };
    let (page, limit, offset) = page_window(&state, PageParams { page: filter.page });

    let (sessions, count) = state.db.list_sessions(&user.id, range, limit, offset).await?;
    Ok(Json(page_of(&state, page, views(sessions), count)))
}

pub async fn create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewSleepSession>,
) -> AppResult<(StatusCode, Json<SleepSessionView>)> {
    input.validate()?;
    let session = SleepSession::new(&user.id, input);
    state.db.insert_session(&session).await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        duration_hours = session.duration_hours,
        "Sleep session recorded"
    );

    sync_if_connected(&state, &session).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SleepSessionView>> {
    Ok(Json(owned_session(&state, &user, &id).await?.into()))
}

/// Full update
pub async fn replace_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<NewSleepSession>,
) -> AppResult<Json<SleepSessionView>> {
    let mut session = owned_session(&state, &user, &id).await?;
    input.validate()?;
    session.replace(input);
    state.db.update_session(&session).await?;

    // Calendar fields may have moved on under a running sync
    let session = owned_session(&state, &user, &id).await?;
    sync_if_connected(&state, &session).await?;
    Ok(Json(session.into()))
}

/// Partial update; the merged session must still be valid
pub async fn update_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SleepSessionPatch>,
) -> AppResult<Json<SleepSessionView>> {
    let mut session = owned_session(&state, &user, &id).await?;
    session.apply(patch);
    session.validate()?;
    state.db.update_session(&session).await?;

    // Calendar fields may have moved on under a running sync
    let session = owned_session(&state, &user, &id).await?;
    sync_if_connected(&state, &session).await?;
    Ok(Json(session.into()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let session = owned_session(&state, &user, &id).await?;
    state.db.delete_session(&user.id, &id).await?;

    if session.synced_to_calendar {
        if let Some(event_id) = session.calendar_event_id {
            state.calendar.enqueue_delete(user.id.clone(), event_id);
        }
    }

    tracing::info!(user_id = %user.id, session_id = %id, "Sleep session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Sessions started within the last week
pub async fn recent_sessions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SleepSessionView>>> {
    let since = state.time_provider.now_utc() - Duration::days(RECENT_DAYS);
    let sessions = state
        .db
        .sessions_in_range(&user.id, SleepTimeRange::since(since))
        .await?;
    Ok(Json(views(sessions)))
}

/// Sessions started on the current UTC date
pub async fn today_sessions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SleepSessionView>>> {
    let today = state.time_provider.today();
    let range = SleepTimeRange::between(start_of_day(today), start_of_day(today) + Duration::days(1));
    let sessions = state.db.sessions_in_range(&user.id, range).await?;
    Ok(Json(views(sessions)))
}

pub async fn sync_to_calendar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let session = owned_session(&state, &user, &id).await?;
    let profile = state.db.get_or_create_profile(&user.id).await?;

    if !profile.calendar_connected() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Google Calendar not connected" })),
        )
            .into_response());
    }

    state.calendar.enqueue_sync(session.id);
    Ok(Json(json!({ "message": "Sync initiated" })).into_response())
}
