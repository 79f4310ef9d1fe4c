//! Sleep session persistence

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{query, QueryBuilder, Sqlite};
use tracing::Instrument;

use super::DatabaseManager;
use crate::db_span;
use crate::models::sleep_session::SleepSessionRow;
use crate::models::SleepSession;

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, sleep_time, wake_time, quality_rating, \
     notes, duration_hours, synced_to_calendar, calendar_event_id, created_at, updated_at";

/// Half-open `[from, to)` range on `sleep_time`; either end may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepTimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SleepTimeRange {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(from) = self.from {
            builder.push(" AND sleep_time >= ").push_bind(from.timestamp());
        }
        if let Some(to) = self.to {
            builder.push(" AND sleep_time < ").push_bind(to.timestamp());
        }
    }
}

impl DatabaseManager {
    pub async fn insert_session(&self, session: &SleepSession) -> Result<()> {
        query(
            r#"
            INSERT INTO sleep_sessions (id, user_id, sleep_time, wake_time, quality_rating, notes,
                duration_hours, synced_to_calendar, calendar_event_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.sleep_time.timestamp())
        .bind(session.wake_time.timestamp())
        .bind(session.quality_rating.map(i64::from))
        .bind(&session.notes)
        .bind(session.duration_hours)
        .bind(session.synced_to_calendar)
        .bind(&session.calendar_event_id)
        .bind(session.created_at.timestamp())
        .bind(session.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("INSERT", "sleep_sessions"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create sleep session: {}", e))?;

        Ok(())
    }

    /// Fetch a session owned by `user_id`
    pub async fn get_session(&self, user_id: &str, id: &str) -> Result<Option<SleepSession>> {
        let row = sqlx::query_as::<_, SleepSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sleep_sessions WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SleepSession::from))
    }

    /// Fetch a session regardless of owner; background jobs only
    pub async fn get_session_by_id(&self, id: &str) -> Result<Option<SleepSession>> {
        let row = sqlx::query_as::<_, SleepSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sleep_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SleepSession::from))
    }

    /// One page of a user's sessions, newest first, with the total match count
    pub async fn list_sessions(
        &self,
        user_id: &str,
        range: SleepTimeRange,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SleepSession>, i64)> {
        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sleep_sessions WHERE user_id = ");
        count_query.push_bind(user_id);
        range.push_conditions(&mut count_query);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SESSION_COLUMNS} FROM sleep_sessions WHERE user_id = "
        ));
        select.push_bind(user_id);
        range.push_conditions(&mut select);
        select
            .push(" ORDER BY sleep_time DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<SleepSessionRow>()
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", "sleep_sessions"))
            .await?;

        Ok((rows.into_iter().map(SleepSession::from).collect(), count))
    }

    /// Every session of `user_id` within `range`, newest first
    pub async fn sessions_in_range(
        &self,
        user_id: &str,
        range: SleepTimeRange,
    ) -> Result<Vec<SleepSession>> {
        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SESSION_COLUMNS} FROM sleep_sessions WHERE user_id = "
        ));
        select.push_bind(user_id);
        range.push_conditions(&mut select);
        select.push(" ORDER BY sleep_time DESC");

        let rows = select
            .build_query_as::<SleepSessionRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SleepSession::from).collect())
    }

    /// Distinct owners of sessions within `range`
    pub async fn users_with_sessions(&self, range: SleepTimeRange) -> Result<Vec<String>> {
        let mut select =
            QueryBuilder::<Sqlite>::new("SELECT DISTINCT user_id FROM sleep_sessions WHERE 1 = 1");
        range.push_conditions(&mut select);
        select.push(" ORDER BY user_id");

        let users = select
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn has_session_in_range(&self, user_id: &str, range: SleepTimeRange) -> Result<bool> {
        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT EXISTS(SELECT 1 FROM sleep_sessions WHERE user_id = ",
        );
        select.push_bind(user_id);
        range.push_conditions(&mut select);
        select.push(")");

        let exists: bool = select.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(exists)
    }

    /// Persist the editable and derived fields of `session`
    ///
    /// Calendar state is left alone; only `mark_session_synced` writes it.
    pub async fn update_session(&self, session: &SleepSession) -> Result<bool> {
        let result = query(
            r#"
            UPDATE sleep_sessions
            SET sleep_time = ?, wake_time = ?, quality_rating = ?, notes = ?, duration_hours = ?,
                updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(session.sleep_time.timestamp())
        .bind(session.wake_time.timestamp())
        .bind(session.quality_rating.map(i64::from))
        .bind(&session.notes)
        .bind(session.duration_hours)
        .bind(session.updated_at.timestamp())
        .bind(&session.id)
        .bind(&session.user_id)
        .execute(&self.pool)
        .instrument(db_span!("UPDATE", "sleep_sessions"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update sleep session: {}", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the calendar event backing a session
    pub async fn mark_session_synced(&self, id: &str, event_id: &str) -> Result<bool> {
        let result = query(
            "UPDATE sleep_sessions SET synced_to_calendar = TRUE, calendar_event_id = ? WHERE id = ?",
        )
        .bind(event_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_session(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = query("DELETE FROM sleep_sessions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", "sleep_sessions"))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
