//! AmbiDream server: serves the REST API, the optional frontend and runs
//! the scheduled reminder and statistics jobs

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use ambidream::{
    config::Config,
    create_app,
    database::DatabaseManager,
    integrations::{build_mailer, GoogleCalendarClient},
    logging::{init_logging, log_startup},
    services::{task_handlers::register_default_handlers, SchedulingService, SystemTimeProvider, TimeProvider},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load and check configuration before anything else
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.log_level, config.is_production());
    log_startup();
    config.log_config();

    // Database
    config.ensure_data_dir()?;
    let db = DatabaseManager::new(&config.resolved_database_url())
        .await
        .context("Failed to open database")?;
    db.migrate().await.context("Failed to run migrations")?;

    // External integrations
    let mailer = build_mailer(&config.email).context("Failed to configure e-mail delivery")?;
    let calendar = Arc::new(GoogleCalendarClient::new(config.google.clone())?);
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());

    let addr = config.bind_address();
    let enable_scheduler = config.enable_scheduler;
    let state = AppState::new(config, db, mailer, calendar, time_provider.clone());

    // Scheduled jobs
    let scheduler = SchedulingService::new(time_provider);
    if enable_scheduler {
        scheduler.start().await?;
        register_default_handlers(&scheduler, &state.reminders, &state.statistics).await;
        let jobs = scheduler.schedule_system_tasks().await?;
        tracing::info!(jobs = jobs.len(), "Scheduled jobs registered");
    } else {
        tracing::info!("Scheduler disabled");
    }

    let app = create_app(state);

    // Start server
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "AmbiDream listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    tracing::info!("AmbiDream stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
