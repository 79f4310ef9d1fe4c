//! Configuration management for AmbiDream
//!
//! Handles environment variables and application settings, including the
//! e-mail and Google Calendar credentials used by background jobs.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_SECRET: &str = "change-me-in-production";

/// SMTP settings used by the notification mailer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host; empty selects the logging mailer
    pub host: String,

    /// SMTP port
    pub port: u16,

    /// Use STARTTLS when connecting
    pub use_tls: bool,

    /// SMTP username
    pub username: String,

    /// SMTP password
    #[serde(skip_serializing)]
    pub password: String,

    /// Sender address for all outgoing mail
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            use_tls: true,
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
        }
    }
}

impl EmailConfig {
    /// Whether an SMTP relay is configured
    pub fn smtp_enabled(&self) -> bool {
        !self.host.trim().is_empty() && !self.username.is_empty()
    }
}

/// Google Calendar API credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleCalendarConfig {
    pub client_id: String,

    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Calendar v3 REST base URL
    pub api_base: String,

    /// OAuth token endpoint
    pub token_url: String,
}

impl Default for GoogleCalendarConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Database URL
    pub database_url: String,

    /// Secret used to sign API tokens
    #[serde(skip_serializing)]
    pub token_secret: String,

    /// Lifetime of issued API tokens in seconds
    pub token_ttl_seconds: i64,

    /// Environment (development, production)
    pub environment: String,

    /// Log level
    pub log_level: String,

    /// Optional static frontend directory served at `/`
    pub frontend_dir: Option<PathBuf>,

    /// Data directory for SQLite database
    pub data_dir: PathBuf,

    /// CORS origins (empty means allow all)
    pub cors_origins: Vec<String>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Page size for list endpoints
    pub page_size: u32,

    /// Run the periodic job scheduler
    pub enable_scheduler: bool,

    /// Attempts made for a calendar call before giving up
    pub calendar_retry_attempts: u32,

    /// Base backoff between calendar retries in milliseconds
    pub calendar_retry_backoff_ms: u64,

    pub email: EmailConfig,

    pub google: GoogleCalendarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: "sqlite:ambidream.db".to_string(),
            token_secret: DEFAULT_SECRET.to_string(),
            token_ttl_seconds: 7 * 24 * 3600,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            frontend_dir: None,
            data_dir: PathBuf::from("./data"),
            cors_origins: vec![],
            request_timeout: 30,
            page_size: 10,
            enable_scheduler: true,
            calendar_retry_attempts: 3,
            calendar_retry_backoff_ms: 2000,
            email: EmailConfig::default(),
            google: GoogleCalendarConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(host) = env::var("AMBIDREAM_HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("AMBIDREAM_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        if let Ok(database_url) = env::var("AMBIDREAM_DATABASE_URL") {
            config.database_url = database_url;
        }

        if let Ok(data_dir) = env::var("AMBIDREAM_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(secret) = env::var("AMBIDREAM_SECRET") {
            config.token_secret = secret;
        }

        if let Ok(ttl) = env::var("AMBIDREAM_TOKEN_TTL") {
            config.token_ttl_seconds = parse_number(&ttl)?;
        }

        if let Ok(environment) = env::var("AMBIDREAM_ENVIRONMENT") {
            config.environment = environment;
        }

        if let Ok(log_level) = env::var("AMBIDREAM_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Ok(frontend_dir) = env::var("AMBIDREAM_FRONTEND_DIR") {
            if !frontend_dir.is_empty() {
                config.frontend_dir = Some(PathBuf::from(frontend_dir));
            }
        }

        if let Ok(cors_origins) = env::var("AMBIDREAM_CORS_ORIGINS") {
            config.cors_origins = cors_origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(timeout) = env::var("AMBIDREAM_REQUEST_TIMEOUT") {
            config.request_timeout = parse_number(&timeout)?;
        }

        if let Ok(page_size) = env::var("AMBIDREAM_PAGE_SIZE") {
            config.page_size = parse_number(&page_size)?;
        }

        if let Ok(enable) = env::var("AMBIDREAM_ENABLE_SCHEDULER") {
            config.enable_scheduler = parse_bool(&enable)?;
        }

        if let Ok(attempts) = env::var("AMBIDREAM_CALENDAR_RETRY_ATTEMPTS") {
            config.calendar_retry_attempts = parse_number(&attempts)?;
        }

        if let Ok(backoff) = env::var("AMBIDREAM_CALENDAR_RETRY_BACKOFF_MS") {
            config.calendar_retry_backoff_ms = parse_number(&backoff)?;
        }

        // E-mail
        if let Ok(host) = env::var("EMAIL_HOST") {
            config.email.host = host;
        }

        if let Ok(port) = env::var("EMAIL_PORT") {
            config.email.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        if let Ok(use_tls) = env::var("EMAIL_USE_TLS") {
            config.email.use_tls = parse_bool(&use_tls)?;
        }

        if let Ok(user) = env::var("EMAIL_HOST_USER") {
            config.email.username = user;
        }

        if let Ok(password) = env::var("EMAIL_HOST_PASSWORD") {
            config.email.password = password;
        }

        config.email.from_address =
            env::var("DEFAULT_FROM_EMAIL").unwrap_or_else(|_| config.email.username.clone());

        // Google Calendar
        if let Ok(client_id) = env::var("GOOGLE_CALENDAR_CLIENT_ID") {
            config.google.client_id = client_id;
        }

        if let Ok(client_secret) = env::var("GOOGLE_CALENDAR_CLIENT_SECRET") {
            config.google.client_secret = client_secret;
        }

        if let Ok(api_base) = env::var("GOOGLE_CALENDAR_API_BASE") {
            config.google.api_base = api_base;
        }

        if let Ok(token_url) = env::var("GOOGLE_OAUTH_TOKEN_URL") {
            config.google.token_url = token_url;
        }

        config.validate()?;

        Ok(config)
    }

    /// Configuration suitable for tests: in-memory database, no scheduler,
    /// no retry delay
    pub fn for_test() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            token_secret: "test-secret-which-is-long-enough".to_string(),
            enable_scheduler: false,
            calendar_retry_attempts: 1,
            calendar_retry_backoff_ms: 0,
            email: EmailConfig {
                host: String::new(),
                from_address: "noreply@ambidream.test".to_string(),
                ..EmailConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret == DEFAULT_SECRET && self.is_production() {
            return Err(ConfigError::InsecureProductionSecret);
        }

        if self.token_secret.len() < 16 {
            return Err(ConfigError::SecretTooShort);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        if self.database_url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        if self.page_size == 0 {
            return Err(ConfigError::InvalidNumber("0".to_string()));
        }

        if self.token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidNumber(self.token_ttl_seconds.to_string()));
        }

        Ok(())
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Create data directory if it doesn't exist
    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| ConfigError::DataDirCreationFailed(e.to_string()))?;
        Ok(())
    }

    /// Resolve the database URL, placing relative SQLite files in the data
    /// directory
    pub fn resolved_database_url(&self) -> String {
        match self.database_url.strip_prefix("sqlite:") {
            Some(path) if !path.starts_with(':') && !path.starts_with('/') => {
                format!("sqlite:{}", self.data_dir.join(path).display())
            }
            _ => self.database_url.clone(),
        }
    }

    /// Log configuration (excluding sensitive data)
    pub fn log_config(&self) {
        info!("Configuration loaded:");
        info!("  Environment: {}", self.environment);
        info!("  Bind address: {}", self.bind_address());
        info!("  Database URL: {}", self.mask_database_url());
        info!("  Data directory: {:?}", self.data_dir);
        info!("  Frontend directory: {:?}", self.frontend_dir);
        info!("  Log level: {}", self.log_level);
        info!("  CORS origins: {:?}", self.cors_origins);
        info!("  Request timeout: {}s", self.request_timeout);
        info!("  Page size: {}", self.page_size);
        info!("  Scheduler: {}", self.enable_scheduler);
        if self.email.smtp_enabled() {
            info!("  SMTP: {}:{} as ***", self.email.host, self.email.port);
        } else {
            info!("  SMTP: disabled, e-mails are logged");
        }
        info!(
            "  Google Calendar: {}",
            if self.google.client_id.is_empty() { "not configured" } else { "configured" }
        );

        if self.token_secret == DEFAULT_SECRET {
            warn!("Using default token secret - CHANGE IN PRODUCTION!");
        }
    }

    /// Mask database URL for logging
    fn mask_database_url(&self) -> String {
        if self.database_url.starts_with("sqlite:") {
            self.database_url.clone()
        } else if let Some((scheme, _)) = self.database_url.split_once("://") {
            format!("{}://***", scheme)
        } else {
            "***".to_string()
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(value.to_string()))
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool(value.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid numeric value: {0}")]
    InvalidNumber(String),

    #[error("Invalid boolean value: {0}")]
    InvalidBool(String),

    #[error("Insecure token secret for production environment")]
    InsecureProductionSecret,

    #[error("Token secret too short (minimum 16 characters)")]
    SecretTooShort,

    #[error("Empty database URL")]
    EmptyDatabaseUrl,

    #[error("Empty data directory")]
    EmptyDataDir,

    #[error("Data directory creation failed: {0}")]
    DataDirCreationFailed(String),
}
