//! Sleep reminder persistence

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::query;
use tracing::Instrument;

use super::DatabaseManager;
use crate::db_span;
use crate::models::sleep_reminder::SleepReminderRow;
use crate::models::{ReminderType, SleepReminder};

pub(crate) const REMINDER_COLUMNS: &str = "id, user_id, reminder_type, reminder_time, is_active, message, \
     last_sent, created_at, updated_at";

fn into_reminders(rows: Vec<SleepReminderRow>) -> Result<Vec<SleepReminder>> {
    rows.into_iter().map(SleepReminder::try_from).collect()
}

impl DatabaseManager {
    pub async fn insert_reminder(&self, reminder: &SleepReminder) -> Result<()> {
        query(
            r#"
            INSERT INTO sleep_reminders (id, user_id, reminder_type, reminder_time, is_active,
                message, last_sent, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reminder.id)
        .bind(&reminder.user_id)
        .bind(reminder.reminder_type.to_string())
        .bind(reminder.time_str())
        .bind(reminder.is_active)
        .bind(&reminder.message)
        .bind(reminder.last_sent.map(|t| t.timestamp()))
        .bind(reminder.created_at.timestamp())
        .bind(reminder.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("INSERT", "sleep_reminders"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create reminder: {}", e))?;

        Ok(())
    }

    pub async fn get_reminder(&self, user_id: &str, id: &str) -> Result<Option<SleepReminder>> {
        let row = sqlx::query_as::<_, SleepReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM sleep_reminders WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SleepReminder::try_from).transpose()
    }

    pub async fn list_reminders(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SleepReminder>, i64)> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sleep_reminders WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, SleepReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM sleep_reminders WHERE user_id = ? \
             ORDER BY reminder_time, id LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .instrument(db_span!("SELECT", "sleep_reminders"))
        .await?;

        Ok((into_reminders(rows)?, count))
    }

    pub async fn active_reminders(&self, user_id: &str) -> Result<Vec<SleepReminder>> {
        let rows = sqlx::query_as::<_, SleepReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM sleep_reminders WHERE user_id = ? AND is_active = TRUE \
             ORDER BY reminder_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_reminders(rows)
    }

    /// Active reminders of one type across all users
    pub async fn active_reminders_of_type(
        &self,
        reminder_type: ReminderType,
    ) -> Result<Vec<SleepReminder>> {
        let rows = sqlx::query_as::<_, SleepReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM sleep_reminders \
             WHERE reminder_type = ? AND is_active = TRUE ORDER BY user_id, reminder_time"
        ))
        .bind(reminder_type.to_string())
        .fetch_all(&self.pool)
        .await?;

        into_reminders(rows)
    }

    pub async fn update_reminder(&self, reminder: &SleepReminder) -> Result<bool> {
        let result = query(
            r#"
            UPDATE sleep_reminders
            SET reminder_type = ?, reminder_time = ?, is_active = ?, message = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(reminder.reminder_type.to_string())
        .bind(reminder.time_str())
        .bind(reminder.is_active)
        .bind(&reminder.message)
        .bind(reminder.updated_at.timestamp())
        .bind(&reminder.id)
        .bind(&reminder.user_id)
        .execute(&self.pool)
        .instrument(db_span!("UPDATE", "sleep_reminders"))
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_reminder_sent(&self, id: &str, sent_at: DateTime<Utc>) -> Result<()> {
        query("UPDATE sleep_reminders SET last_sent = ? WHERE id = ?")
            .bind(sent_at.timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_reminder(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = query("DELETE FROM sleep_reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
