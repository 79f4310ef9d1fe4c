//! AmbiDream sleep tracker
//!
//! REST API for logging sleep sessions, managing goals and reminders,
//! browsing statistics and mirroring sessions to Google Calendar, plus the
//! scheduled jobs that send reminders and compute statistics.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod models;
pub mod services;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::database::DatabaseManager;
use crate::integrations::{CalendarProvider, Mailer};
use crate::services::{
    AuthService, CalendarSyncService, NotificationService, ReminderService, StatisticsService,
    TimeProvider,
};

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseManager>,
    pub auth: AuthService,
    pub statistics: StatisticsService,
    pub reminders: ReminderService,
    pub calendar: CalendarSyncService,
    pub time_provider: Arc<dyn TimeProvider>,
}

impl AppState {
    /// Wire the services together
    pub fn new(
        config: Config,
        db: DatabaseManager,
        mailer: Arc<dyn Mailer>,
        calendar_provider: Arc<dyn CalendarProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let db = Arc::new(db);

        let auth = AuthService::new(
            db.clone(),
            config.token_secret.clone(),
            config.token_ttl_seconds,
            time_provider.clone(),
        );
        let statistics = StatisticsService::new(db.clone(), time_provider.clone());
        let reminders = ReminderService::new(
            db.clone(),
            NotificationService::new(mailer),
            statistics.clone(),
            time_provider.clone(),
        );
        let calendar = CalendarSyncService::new(
            db.clone(),
            calendar_provider,
            config.calendar_retry_attempts,
            Duration::from_millis(config.calendar_retry_backoff_ms),
        );

        Self {
            config,
            db,
            auth,
            statistics,
            reminders,
            calendar,
            time_provider,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size.max(1)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(api::auth::TOKEN_HEADER),
        ]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout.max(1));
    let cors = cors_layer(&state.config.cors_origins);
    let frontend_dir = state.config.frontend_dir.clone();

    let mut app = Router::new()
        .nest("/api", api::routes())
        .with_state(state);

    if let Some(dir) = frontend_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request| request_span!(request.method(), request.uri().path())),
            )
            .layer(cors)
            .layer(TimeoutLayer::new(timeout)),
    )
}
