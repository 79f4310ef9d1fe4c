//! Logging configuration for AmbiDream
//!
//! Structured logging setup with appropriate levels and formatting.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the application logging system
///
/// `RUST_LOG` takes precedence over `level`. JSON output is used in
/// production, compact console output otherwise. Calling this more than once
/// is harmless.
pub fn init_logging(level: &str, json: bool) {
    let default_filter = format!("ambidream={level},tower_http=info,axum::rejection=trace");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact()
                    .with_ansi(true),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::info!("Logging system initialized");
    }
}

/// Create a span for request logging
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            user_id = tracing::field::Empty,
        )
    };
}

/// Create a span for database operations
#[macro_export]
macro_rules! db_span {
    ($operation:expr, $table:expr) => {
        tracing::debug_span!(
            "database_operation",
            operation = %$operation,
            table = %$table,
        )
    };
}

/// Create a span for a scheduled job run
#[macro_export]
macro_rules! job_span {
    ($job:expr) => {
        tracing::info_span!(
            "scheduled_job",
            job = %$job,
            processed = tracing::field::Empty,
        )
    };
}

/// Log application startup
pub fn log_startup() {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git_commit = option_env!("GIT_COMMIT").unwrap_or("unknown"),
        "AmbiDream starting up"
    );
}

/// Log notification delivery
pub fn log_notification_delivery(recipient: &str, notification_type: &str, success: bool) {
    if success {
        tracing::info!(
            recipient = %recipient,
            notification_type = %notification_type,
            "Notification delivered successfully"
        );
    } else {
        tracing::warn!(
            recipient = %recipient,
            notification_type = %notification_type,
            "Notification delivery failed"
        );
    }
}

/// Log the outcome of a scheduled job
pub fn log_job_completed(job: &str, processed: usize, duration_ms: u128) {
    tracing::info!(
        job = %job,
        processed = processed,
        duration_ms = %duration_ms,
        "Scheduled job completed"
    );
}

/// Log a calendar sync attempt outcome
pub fn log_calendar_sync(session_id: &str, action: &str, attempt: u32, success: bool) {
    if success {
        tracing::info!(
            session_id = %session_id,
            action = %action,
            attempt = attempt,
            "Calendar sync succeeded"
        );
    } else {
        tracing::warn!(
            session_id = %session_id,
            action = %action,
            attempt = attempt,
            "Calendar sync attempt failed"
        );
    }
}
