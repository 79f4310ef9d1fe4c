//! Sleep statistics persistence

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{query, QueryBuilder, Sqlite};
use tracing::Instrument;

use super::DatabaseManager;
use crate::db_span;
use crate::models::sleep_statistics::SleepStatisticsRow;
use crate::models::{PeriodType, SleepStatistics};

pub(crate) const STATISTICS_COLUMNS: &str = "id, user_id, date, period_type, total_sleep_hours, \
     average_sleep_hours, average_quality, sessions_count, goal_achievement_rate, created_at, updated_at";

impl DatabaseManager {
    /// Insert or replace the row keyed on (user, date, period_type)
    ///
    /// An existing row keeps its id and creation time.
    pub async fn upsert_statistics(&self, stats: &SleepStatistics) -> Result<()> {
        query(
            r#"
            INSERT INTO sleep_statistics (id, user_id, date, period_type, total_sleep_hours,
                average_sleep_hours, average_quality, sessions_count, goal_achievement_rate,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, date, period_type) DO UPDATE SET
                total_sleep_hours = excluded.total_sleep_hours,
                average_sleep_hours = excluded.average_sleep_hours,
                average_quality = excluded.average_quality,
                sessions_count = excluded.sessions_count,
                goal_achievement_rate = excluded.goal_achievement_rate,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&stats.id)
        .bind(&stats.user_id)
        .bind(stats.date.to_string())
        .bind(stats.period_type.to_string())
        .bind(stats.total_sleep_hours)
        .bind(stats.average_sleep_hours)
        .bind(stats.average_quality)
        .bind(stats.sessions_count)
        .bind(stats.goal_achievement_rate)
        .bind(stats.created_at.timestamp())
        .bind(stats.updated_at.timestamp())
        .execute(&self.pool)
        .instrument(db_span!("UPSERT", "sleep_statistics"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to store statistics: {}", e))?;

        Ok(())
    }

    pub async fn get_statistics(&self, user_id: &str, id: &str) -> Result<Option<SleepStatistics>> {
        let row = sqlx::query_as::<_, SleepStatisticsRow>(&format!(
            "SELECT {STATISTICS_COLUMNS} FROM sleep_statistics WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SleepStatistics::try_from).transpose()
    }

    pub async fn find_statistics(
        &self,
        user_id: &str,
        date: NaiveDate,
        period_type: PeriodType,
    ) -> Result<Option<SleepStatistics>> {
        let row = sqlx::query_as::<_, SleepStatisticsRow>(&format!(
            "SELECT {STATISTICS_COLUMNS} FROM sleep_statistics \
             WHERE user_id = ? AND date = ? AND period_type = ?"
        ))
        .bind(user_id)
        .bind(date.to_string())
        .bind(period_type.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SleepStatistics::try_from).transpose()
    }

    /// One page of a user's statistics, newest period first
    pub async fn list_statistics(
        &self,
        user_id: &str,
        period_type: Option<PeriodType>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SleepStatistics>, i64)> {
        let period = period_type.map(|p| p.to_string());

        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sleep_statistics WHERE user_id = ");
        count_query.push_bind(user_id);
        if let Some(period) = &period {
            count_query.push(" AND period_type = ").push_bind(period.as_str());
        }
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {STATISTICS_COLUMNS} FROM sleep_statistics WHERE user_id = "
        ));
        select.push_bind(user_id);
        if let Some(period) = &period {
            select.push(" AND period_type = ").push_bind(period.as_str());
        }
        select
            .push(" ORDER BY date DESC, period_type LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<SleepStatisticsRow>()
            .fetch_all(&self.pool)
            .await?;
        let stats = rows
            .into_iter()
            .map(SleepStatistics::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((stats, count))
    }
}
