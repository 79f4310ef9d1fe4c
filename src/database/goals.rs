//! Sleep goal persistence

use anyhow::Result;
use sqlx::query;
use tracing::Instrument;

use super::DatabaseManager;
use crate::db_span;
use crate::models::sleep_goal::SleepGoalRow;
use crate::models::SleepGoal;

pub(crate) const GOAL_COLUMNS: &str = "id, user_id, target_bedtime, target_wake_time, target_duration_hours, \
     days_of_week, is_active, created_at, updated_at";

fn into_goals(rows: Vec<SleepGoalRow>) -> Result<Vec<SleepGoal>> {
    rows.into_iter().map(SleepGoal::try_from).collect()
}

impl DatabaseManager {
    pub async fn insert_goal(&self, goal: &SleepGoal) -> Result<()> {
        query(
            r#"
            INSERT INTO sleep_goals (id, user_id, target_bedtime, target_wake_time,
                target_duration_hours, days_of_week, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&goal.id)
        .bind(&goal.user_id)
        .bind(goal.bedtime_str())
        .bind(goal.wake_time_str())
        .bind(goal.target_duration_hours)
        .bind(goal.days_json())
        .bind(goal.is_active)
        .bind(goal.created_at.timestamp())
        .bind(goal.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("INSERT", "sleep_goals"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create sleep goal: {}", e))?;

        Ok(())
    }

    pub async fn get_goal(&self, user_id: &str, id: &str) -> Result<Option<SleepGoal>> {
        let row = sqlx::query_as::<_, SleepGoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM sleep_goals WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SleepGoal::try_from).transpose()
    }

    /// One page of a user's goals, newest first, with the total count
    pub async fn list_goals(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SleepGoal>, i64)> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sleep_goals WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, SleepGoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM sleep_goals WHERE user_id = ? \
             ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .instrument(db_span!("SELECT", "sleep_goals"))
        .await?;

        Ok((into_goals(rows)?, count))
    }

    /// Active goals in creation order
    pub async fn active_goals(&self, user_id: &str) -> Result<Vec<SleepGoal>> {
        let rows = sqlx::query_as::<_, SleepGoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM sleep_goals WHERE user_id = ? AND is_active = TRUE \
             ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_goals(rows)
    }

    pub async fn update_goal(&self, goal: &SleepGoal) -> Result<bool> {
        let result = query(
            r#"
            UPDATE sleep_goals
            SET target_bedtime = ?, target_wake_time = ?, target_duration_hours = ?,
                days_of_week = ?, is_active = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(goal.bedtime_str())
        .bind(goal.wake_time_str())
        .bind(goal.target_duration_hours)
        .bind(goal.days_json())
        .bind(goal.is_active)
        .bind(goal.updated_at.timestamp())
        .bind(&goal.id)
        .bind(&goal.user_id)
        .execute(&self.pool)
        .instrument(db_span!("UPDATE", "sleep_goals"))
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_goal(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = query("DELETE FROM sleep_goals WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
