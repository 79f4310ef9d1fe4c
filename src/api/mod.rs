//! API module for AmbiDream
//!
//! REST endpoints, mounted under `/api`.

pub mod admin;
pub mod auth;
pub mod goals;
pub mod health;
pub mod profiles;
pub mod reminders;
pub mod sleep_sessions;
pub mod statistics;

use axum::Router;

use crate::models::{Page, PageParams};
use crate::AppState;

pub use auth::{AuthUser, StaffUser};

/// All API routes, relative to `/api`
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/auth", auth::routes())
        .nest("/profiles", profiles::routes())
        .nest("/sleep-sessions", sleep_sessions::routes())
        .nest("/goals", goals::routes())
        .nest("/reminders", reminders::routes())
        .nest("/statistics", statistics::routes())
        .nest("/admin", admin::routes())
}

/// Limit and offset for the requested page
pub(crate) fn page_window(state: &AppState, params: PageParams) -> (u32, i64, i64) {
    let page_size = state.page_size();
    (params.page(), i64::from(page_size), params.offset(page_size))
}

pub(crate) fn page_of<T>(state: &AppState, page: u32, results: Vec<T>, count: i64) -> Page<T> {
    Page::new(results, count, page, state.page_size())
}
