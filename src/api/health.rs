//! Health check endpoint

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Reports service status and database reachability
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = state.db.test_connection().await;
    let status = if database.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    if let Err(e) = &database {
        tracing::error!(error = %e, "Health check database probe failed");
    }

    (
        status,
        Json(json!({
            "status": if database.is_ok() { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "database": if database.is_ok() { "connected" } else { "unavailable" },
            "timestamp": state.time_provider.now_utc(),
        })),
    )
}
