//! Database connection manager
//!
//! Owns the SQLite connection pool and creates the schema.

use anyhow::Result;
use sqlx::query;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Database connection manager
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pub pool: SqlitePool,
}

impl DatabaseManager {
    /// Create a new database manager with the given connection URL
    ///
    /// The database file is created when missing and foreign keys are
    /// enforced on every connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| anyhow::anyhow!("Invalid database URL: {}", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

        debug!("Successfully connected to SQLite database");
        Ok(Self { pool })
    }

    /// Private in-memory database, kept alive for the lifetime of the pool
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection would otherwise get its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        self.create_tables().await?;
        self.create_indexes().await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn create_tables(&self) -> Result<()> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                first_name TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_sleep_hours REAL NOT NULL DEFAULT 8.0
                    CHECK (target_sleep_hours >= 1.0 AND target_sleep_hours <= 24.0),
                timezone TEXT NOT NULL DEFAULT 'UTC',
                notification_enabled BOOLEAN NOT NULL DEFAULT TRUE,
                notification_time TEXT,
                google_calendar_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                google_refresh_token TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS sleep_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                sleep_time INTEGER NOT NULL,
                wake_time INTEGER NOT NULL,
                quality_rating INTEGER CHECK (quality_rating BETWEEN 1 AND 5),
                notes TEXT NOT NULL DEFAULT '',
                duration_hours REAL NOT NULL DEFAULT 0,
                synced_to_calendar BOOLEAN NOT NULL DEFAULT FALSE,
                calendar_event_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                CHECK (wake_time > sleep_time)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS sleep_goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_bedtime TEXT NOT NULL,
                target_wake_time TEXT NOT NULL,
                target_duration_hours REAL NOT NULL DEFAULT 8.0,
                days_of_week TEXT NOT NULL DEFAULT '[]',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS sleep_reminders (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                reminder_type TEXT NOT NULL CHECK (reminder_type IN ('bedtime', 'wake', 'log')),
                reminder_time TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                message TEXT NOT NULL DEFAULT '',
                last_sent INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS sleep_statistics (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                period_type TEXT NOT NULL CHECK (period_type IN ('daily', 'weekly', 'monthly')),
                total_sleep_hours REAL NOT NULL DEFAULT 0,
                average_sleep_hours REAL NOT NULL DEFAULT 0,
                average_quality REAL,
                sessions_count INTEGER NOT NULL DEFAULT 0,
                goal_achievement_rate REAL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, date, period_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite tables created successfully");
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        let statements = [
            "CREATE INDEX IF NOT EXISTS idx_sleep_sessions_sleep_time ON sleep_sessions (sleep_time DESC)",
            "CREATE INDEX IF NOT EXISTS idx_sleep_sessions_user_sleep_time ON sleep_sessions (user_id, sleep_time DESC)",
            "CREATE INDEX IF NOT EXISTS idx_sleep_goals_user ON sleep_goals (user_id, is_active)",
            "CREATE INDEX IF NOT EXISTS idx_sleep_reminders_type ON sleep_reminders (reminder_type, is_active)",
            "CREATE INDEX IF NOT EXISTS idx_sleep_statistics_user_date ON sleep_statistics (user_id, date DESC)",
        ];
        for statement in statements {
            query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Test database connection
    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").fetch_one(&self.pool).await?;
        debug!("Database connection test successful");
        Ok(())
    }

    /// Get connection pool statistics
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }
}
