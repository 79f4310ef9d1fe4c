//! Sleep reminder endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use super::{page_of, page_window, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::{NewSleepReminder, Page, PageParams, SleepReminder, SleepReminderPatch, User};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reminders).post(create_reminder))
        .route("/active", get(active_reminders))
        .route(
            "/:id",
            get(get_reminder)
                .put(replace_reminder)
                .patch(update_reminder)
                .delete(delete_reminder),
        )
}

async fn owned_reminder(state: &AppState, user: &User, id: &str) -> AppResult<SleepReminder> {
    state
        .db
        .get_reminder(&user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Sleep reminder"))
}

pub async fn list_reminders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<SleepReminder>>> {
    let (page, limit, offset) = page_window(&state, params);
    let (reminders, count) = state.db.list_reminders(&user.id, limit, offset).await?;
    Ok(Json(page_of(&state, page, reminders, count)))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewSleepReminder>,
) -> AppResult<(StatusCode, Json<SleepReminder>)> {
    input.validate()?;
    let reminder = SleepReminder::new(&user.id, input);
    state.db.insert_reminder(&reminder).await?;

    tracing::info!(
        user_id = %user.id,
        reminder_id = %reminder.id,
        reminder_type = %reminder.reminder_type,
        "Sleep reminder created"
    );
    Ok((StatusCode::CREATED, Json(reminder)))
}

pub async fn get_reminder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SleepReminder>> {
    Ok(Json(owned_reminder(&state, &user, &id).await?))
}

pub async fn replace_reminder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<NewSleepReminder>,
) -> AppResult<Json<SleepReminder>> {
    let mut reminder = owned_reminder(&state, &user, &id).await?;
    input.validate()?;
    reminder.replace(input);
    state.db.update_reminder(&reminder).await?;
    Ok(Json(reminder))
}

pub async fn update_reminder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SleepReminderPatch>,
) -> AppResult<Json<SleepReminder>> {
    let mut reminder = owned_reminder(&state, &user, &id).await?;
    patch.validate()?;
    reminder.apply(patch);
    state.db.update_reminder(&reminder).await?;
    Ok(Json(reminder))
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.db.delete_reminder(&user.id, &id).await? {
        return Err(AppError::not_found("Sleep reminder"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn active_reminders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SleepReminder>>> {
    Ok(Json(state.db.active_reminders(&user.id).await?))
}
