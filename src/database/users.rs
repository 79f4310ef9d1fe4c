//! User account and profile persistence

use anyhow::Result;
use sqlx::query;
use tracing::Instrument;

use super::DatabaseManager;
use crate::db_span;
use crate::models::user::{ProfileRow, UserRow};
use crate::models::{User, UserProfile};

const USER_COLUMNS: &str =
    "id, username, email, first_name, password_hash, salt, is_staff, created_at, updated_at";

pub(crate) const PROFILE_COLUMNS: &str = "id, user_id, target_sleep_hours, timezone, notification_enabled, \
     notification_time, google_calendar_enabled, google_refresh_token, created_at, updated_at";

impl DatabaseManager {
    /// Create a new user
    ///
    /// # Returns
    /// `false` when the username is already taken
    pub async fn create_user(&self, user: &User) -> Result<bool> {
        let inserted = query(
            r#"
            INSERT INTO users (id, username, email, first_name, password_hash, salt, is_staff, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.is_staff)
        .bind(user.created_at.timestamp())
        .bind(user.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("INSERT", "users"))
        .await;

        match inserted {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Failed to create user: {}", e)),
        }
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get user: {}", e))?;

        Ok(row.map(User::from))
    }

    /// Get user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get user by username: {}", e))?;

        Ok(row.map(User::from))
    }

    pub async fn set_user_staff(&self, id: &str, is_staff: bool) -> Result<bool> {
        let result = query("UPDATE users SET is_staff = ?, updated_at = ? WHERE id = ?")
            .bind(is_staff)
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_profile(&self, profile: &UserProfile) -> Result<()> {
        query(
            r#"
            INSERT INTO user_profiles (id, user_id, target_sleep_hours, timezone, notification_enabled,
                notification_time, google_calendar_enabled, google_refresh_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(profile.target_sleep_hours)
        .bind(&profile.timezone)
        .bind(profile.notification_enabled)
        .bind(profile.notification_time_str())
        .bind(profile.google_calendar_enabled)
        .bind(&profile.google_refresh_token)
        .bind(profile.created_at.timestamp())
        .bind(profile.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("INSERT", "user_profiles"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create profile: {}", e))?;

        Ok(())
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    pub async fn get_profile_by_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    /// Fetch the user's profile, creating one with default settings if needed
    pub async fn get_or_create_profile(&self, user_id: &str) -> Result<UserProfile> {
        if let Some(profile) = self.get_profile_by_user(user_id).await? {
            return Ok(profile);
        }

        let profile = UserProfile::new(user_id);
        query(
            r#"
            INSERT OR IGNORE INTO user_profiles (id, user_id, target_sleep_hours, timezone,
                notification_enabled, google_calendar_enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(profile.target_sleep_hours)
        .bind(&profile.timezone)
        .bind(profile.notification_enabled)
        .bind(profile.google_calendar_enabled)
        .bind(profile.created_at.timestamp())
        .bind(profile.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        // A concurrent request may have won the insert.
        self.get_profile_by_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile for user {} vanished after insert", user_id))
    }

    pub async fn update_profile(&self, profile: &UserProfile) -> Result<bool> {
        let result = query(
            r#"
            UPDATE user_profiles
            SET target_sleep_hours = ?, timezone = ?, notification_enabled = ?, notification_time = ?,
                google_calendar_enabled = ?, google_refresh_token = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.target_sleep_hours)
        .bind(&profile.timezone)
        .bind(profile.notification_enabled)
        .bind(profile.notification_time_str())
        .bind(profile.google_calendar_enabled)
        .bind(&profile.google_refresh_token)
        .bind(profile.updated_at.timestamp())
        .bind(&profile.id)
        .execute(&self.pool)
        .instrument(db_span!("UPDATE", "user_profiles"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update profile: {}", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Users with notifications enabled, paired with their profile
    pub async fn users_with_notifications(&self) -> Result<Vec<(User, UserProfile)>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE notification_enabled = TRUE ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let profile = UserProfile::try_from(row)?;
            if let Some(user) = self.get_user(&profile.user_id).await? {
                pairs.push((user, profile));
            }
        }
        Ok(pairs)
    }
}
