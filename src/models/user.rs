//! User accounts and per-user profile settings

use chrono::{DateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{double_option, format_time, from_timestamp, now, parse_time};
use crate::error::{AppResult, Validator};
use crate::services::timezone::validate_timezone;

/// Default nightly sleep target in hours
pub const DEFAULT_TARGET_SLEEP_HOURS: f64 = 8.0;

/// Whether `value` matches `pattern`; a pattern that fails to compile never matches
fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name used to greet the user in e-mails
    pub fn display_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

/// `users` table row
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub password_hash: String,
    pub salt: String,
    pub is_staff: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            password_hash: row.password_hash,
            salt: row.salt,
            is_staff: row.is_staff,
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> AppResult<()> {
        let mut validator = Validator::new();
        validator
            .check(
                matches(r"^[\w.@+-]{1,150}$", &self.username),
                "username",
                "Username may contain only letters, digits and @/./+/-/_ (max 150)",
            )
            .check(
                matches(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", &self.email),
                "email",
                "Enter a valid email address",
            )
            .check(
                self.password.chars().count() >= 8,
                "password",
                "Password must be at least 8 characters",
            );
        validator.finish()
    }
}

/// Login payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Per-user preferences and integration state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub target_sleep_hours: f64,
    pub timezone: String,
    pub notification_enabled: bool,
    pub notification_time: Option<NaiveTime>,
    pub google_calendar_enabled: bool,
    #[serde(skip_serializing)]
    pub google_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile with default settings
    pub fn new(user_id: &str) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            target_sleep_hours: DEFAULT_TARGET_SLEEP_HOURS,
            timezone: "UTC".to_string(),
            notification_enabled: true,
            notification_time: None,
            google_calendar_enabled: false,
            google_refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether calendar sync can run for this profile
    pub fn calendar_connected(&self) -> bool {
        self.google_calendar_enabled
            && self
                .google_refresh_token
                .as_deref()
                .is_some_and(|token| !token.is_empty())
    }

    pub fn notification_time_str(&self) -> Option<String> {
        self.notification_time.map(format_time)
    }
}

/// `user_profiles` table row
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub user_id: String,
    pub target_sleep_hours: f64,
    pub timezone: String,
    pub notification_enabled: bool,
    pub notification_time: Option<String>,
    pub google_calendar_enabled: bool,
    pub google_refresh_token: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            target_sleep_hours: row.target_sleep_hours,
            timezone: row.timezone,
            notification_enabled: row.notification_enabled,
            notification_time: row.notification_time.as_deref().map(parse_time).transpose()?,
            google_calendar_enabled: row.google_calendar_enabled,
            google_refresh_token: row.google_refresh_token,
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        })
    }
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub target_sleep_hours: Option<f64>,
    pub timezone: Option<String>,
    pub notification_enabled: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub notification_time: Option<Option<NaiveTime>>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> AppResult<()> {
        let mut validator = Validator::new();
        if let Some(hours) = self.target_sleep_hours {
            validator.check(
                (1.0..=24.0).contains(&hours),
                "target_sleep_hours",
                "Ensure this value is between 1.0 and 24.0",
            );
        }
        if let Some(timezone) = &self.timezone {
            if let Err(message) = validate_timezone(timezone) {
                validator.push("timezone", message);
            }
        }
        validator.finish()
    }

    pub fn apply(self, profile: &mut UserProfile) {
        if let Some(hours) = self.target_sleep_hours {
            profile.target_sleep_hours = hours;
        }
        if let Some(timezone) = self.timezone {
            profile.timezone = timezone;
        }
        if let Some(enabled) = self.notification_enabled {
            profile.notification_enabled = enabled;
        }
        if let Some(time) = self.notification_time {
            profile.notification_time = time;
        }
        profile.updated_at = now();
    }
}
