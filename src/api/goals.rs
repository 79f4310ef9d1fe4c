//! Sleep goal endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use super::{page_of, page_window, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::{NewSleepGoal, Page, PageParams, SleepGoal, SleepGoalPatch, User};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/active", get(active_goals))
        .route(
            "/:id",
            get(get_goal)
                .put(replace_goal)
                .patch(update_goal)
                .delete(delete_goal),
        )
}

async fn owned_goal(state: &AppState, user: &User, id: &str) -> AppResult<SleepGoal> {
    state
        .db
        .get_goal(&user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Sleep goal"))
}

pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<SleepGoal>>> {
    let (page, limit, offset) = page_window(&state, params);
    let (goals, count) = state.db.list_goals(&user.id, limit, offset).await?;
    Ok(Json(page_of(&state, page, goals, count)))
}

pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewSleepGoal>,
) -> AppResult<(StatusCode, Json<SleepGoal>)> {
    input.validate()?;
    let goal = SleepGoal::new(&user.id, input);
    state.db.insert_goal(&goal).await?;

    tracing::info!(user_id = %user.id, goal_id = %goal.id, "Sleep goal created");
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn get_goal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SleepGoal>> {
    Ok(Json(owned_goal(&state, &user, &id).await?))
}

pub async fn replace_goal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<NewSleepGoal>,
) -> AppResult<Json<SleepGoal>> {
    let mut goal = owned_goal(&state, &user, &id).await?;
    input.validate()?;
    goal.replace(input);
    state.db.update_goal(&goal).await?;
    Ok(Json(goal))
}

pub async fn update_goal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SleepGoalPatch>,
) -> AppResult<Json<SleepGoal>> {
    let mut goal = owned_goal(&state, &user, &id).await?;
    goal.apply(patch);
    goal.validate()?;
    state.db.update_goal(&goal).await?;
    Ok(Json(goal))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !state.db.delete_goal(&user.id, &id).await? {
        return Err(AppError::not_found("Sleep goal"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Goals currently in effect
pub async fn active_goals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SleepGoal>>> {
    Ok(Json(state.db.active_goals(&user.id).await?))
}
