//! Profile endpoints
//!
//! Each user owns exactly one profile; other profiles are reported as
//! missing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{page_of, AuthUser};
use crate::error::{AppError, AppResult};
use crate::integrations::google_calendar::CalendarEvent;
use crate::models::{Page, ProfileUpdate, User, UserProfile};
use crate::services::ConnectCalendarRequest;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_profiles))
        .route("/me", get(my_profile))
        .route("/:id", get(get_profile).put(update_profile).patch(update_profile))
        .route("/:id/connect_google_calendar", post(connect_google_calendar))
        .route("/:id/disconnect_google_calendar", post(disconnect_google_calendar))
        .route("/:id/calendar_events", get(calendar_events))
}

async fn owned_profile(state: &AppState, user: &User, id: &str) -> AppResult<UserProfile> {
    state
        .db
        .get_profile(id)
        .await?
        .filter(|profile| profile.user_id == user.id)
        .ok_or_else(|| AppError::not_found("Profile"))
}

pub async fn list_profiles(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Page<UserProfile>>> {
    let profile = state.db.get_or_create_profile(&user.id).await?;
    Ok(Json(page_of(&state, 1, vec![profile], 1)))
}

/// The caller's profile, created with defaults on first access
pub async fn my_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.db.get_or_create_profile(&user.id).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(owned_profile(&state, &user, &id).await?))
}

/// Partial update; PUT and PATCH behave the same
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    let mut profile = owned_profile(&state, &user, &id).await?;
    update.validate()?;
    update.apply(&mut profile);
    state.db.update_profile(&profile).await?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(profile))
}

pub async fn connect_google_calendar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<ConnectCalendarRequest>,
) -> AppResult<Response> {
    let mut profile = owned_profile(&state, &user, &id).await?;

    match state.calendar.connect(&mut profile, request).await {
        Ok(()) => Ok(Json(json!({
            "message": "Google Calendar connected successfully",
            "enabled": true,
        }))
        .into_response()),
        Err(AppError::Calendar(e)) => {
            tracing::warn!(user_id = %user.id, error = %e, "Google Calendar connection failed");
            Ok((StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response())
        }
        Err(AppError::BadRequest(message)) => {
            Ok((StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn disconnect_google_calendar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let mut profile = owned_profile(&state, &user, &id).await?;
    state.calendar.disconnect(&mut profile).await?;
    Ok(Json(json!({
        "message": "Google Calendar disconnected",
        "enabled": false,
    })))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    10
}

/// Upcoming events on the connected calendar
pub async fn calendar_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Response> {
    let profile = owned_profile(&state, &user, &id).await?;
    if !profile.calendar_connected() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Google Calendar not connected" })),
        )
            .into_response());
    }

    let events: Vec<CalendarEvent> = state
        .calendar
        .upcoming_events(&profile, query.max_results.clamp(1, 250))
        .await?;
    Ok(Json(events).into_response())
}
