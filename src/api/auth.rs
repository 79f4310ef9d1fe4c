//! Authentication endpoints and request extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};

use crate::error::{AppError, AppResult};
use crate::models::user::LoginRequest;
use crate::models::{NewUser, User};
use crate::services::LoginResponse;
use crate::AppState;

/// Alternative header carrying the raw token
pub const TOKEN_HEADER: &str = "x-auth-token";

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// An authenticated caller with staff rights
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided".to_string()))?;

        let user = state.auth.authenticate(&token).await?;
        tracing::Span::current().record("user_id", user.id.as_str());
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::warn!(user_id = %user.id, "Non-staff user requested an admin endpoint");
            return Err(AppError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.auth.login(request).await?;
    tracing::info!(user_id = %response.user.id, "User logged in");
    Ok(Json(response))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
