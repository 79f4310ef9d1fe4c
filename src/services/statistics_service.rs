//! Statistics calculation
//!
//! Aggregates sleep sessions into daily, weekly and monthly rows and builds
//! the rolling 30 day summary. Periods are bucketed on UTC dates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;

use crate::database::{DatabaseManager, SleepTimeRange};
use crate::error::AppResult;
use crate::models::user::DEFAULT_TARGET_SLEEP_HOURS;
use crate::models::{PeriodType, SleepAggregate, SleepGoal, SleepStatistics, SleepSummary};
use crate::services::time_provider::TimeProvider;

const SUMMARY_DAYS: i64 = 30;

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Session range covering the UTC dates `[start, end)`
pub fn date_range(start: NaiveDate, end: NaiveDate) -> SleepTimeRange {
    SleepTimeRange::between(start_of_day(start), start_of_day(end))
}

/// Nightly sleep target for one user
///
/// The first active goal covering the weekday wins; otherwise the profile's
/// target applies.
#[derive(Debug, Clone)]
pub struct SleepTargets {
    goals: Vec<SleepGoal>,
    fallback_hours: f64,
}

impl SleepTargets {
    pub fn new(goals: Vec<SleepGoal>, fallback_hours: Option<f64>) -> Self {
        Self {
            goals,
            fallback_hours: fallback_hours.unwrap_or(DEFAULT_TARGET_SLEEP_HOURS),
        }
    }

    pub fn for_date(&self, date: NaiveDate) -> f64 {
        use chrono::Datelike;

        self.goals
            .iter()
            .find(|goal| goal.is_active && goal.applies_to(date.weekday()))
            .map(|goal| goal.target_duration_hours)
            .unwrap_or(self.fallback_hours)
    }
}

#[derive(Clone)]
pub struct StatisticsService {
    db: Arc<DatabaseManager>,
    time_provider: Arc<dyn TimeProvider>,
}

impl StatisticsService {
    pub fn new(db: Arc<DatabaseManager>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { db, time_provider }
    }

    pub async fn targets_for(&self, user_id: &str) -> AppResult<SleepTargets> {
        let goals = self.db.active_goals(user_id).await?;
        let profile = self.db.get_profile_by_user(user_id).await?;
        Ok(SleepTargets::new(
            goals,
            profile.map(|p| p.target_sleep_hours),
        ))
    }

    /// Aggregate one user's sessions within the UTC dates `[start, end)`
    pub async fn aggregate(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<SleepAggregate> {
        let sessions = self
            .db
            .sessions_in_range(user_id, date_range(start, end))
            .await?;
        let targets = self.targets_for(user_id).await?;
        Ok(SleepAggregate::from_sessions(&sessions, |night| {
            targets.for_date(night)
        }))
    }

    /// Recompute and store `period_type` rows for every user with sessions
    /// in the period containing `date`
    ///
    /// # Returns
    /// The number of rows written
    pub async fn calculate_period(&self, period_type: PeriodType, date: NaiveDate) -> AppResult<usize> {
        let (start, end) = period_type.period_bounds(date);
        let users = self.db.users_with_sessions(date_range(start, end)).await?;

        let mut written = 0;
        for user_id in &users {
            let aggregate = self.aggregate(user_id, start, end).await?;
            let stats = SleepStatistics::new(user_id, start, period_type, aggregate);
            self.db.upsert_statistics(&stats).await?;
            written += 1;
        }

        tracing::debug!(
            period = %period_type,
            start = %start,
            users = written,
            "Statistics calculated"
        );
        Ok(written)
    }

    pub async fn calculate_daily(&self, date: NaiveDate) -> AppResult<usize> {
        self.calculate_period(PeriodType::Daily, date).await
    }

    /// `week_start` may be any day; the containing Monday..Sunday week is used
    pub async fn calculate_weekly(&self, week_start: NaiveDate) -> AppResult<usize> {
        self.calculate_period(PeriodType::Weekly, week_start).await
    }

    pub async fn calculate_monthly(&self, month_start: NaiveDate) -> AppResult<usize> {
        self.calculate_period(PeriodType::Monthly, month_start).await
    }

    /// Recompute one user's daily, weekly and monthly rows for the periods
    /// containing `date` (yesterday when absent)
    pub async fn recalculate(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<SleepStatistics>> {
        let date = date.unwrap_or_else(|| self.time_provider.yesterday());

        let mut stored = Vec::new();
        for period_type in [PeriodType::Daily, PeriodType::Weekly, PeriodType::Monthly] {
            let (start, end) = period_type.period_bounds(date);
            let aggregate = self.aggregate(user_id, start, end).await?;
            if aggregate.sessions_count == 0 {
                continue;
            }

            self.db
                .upsert_statistics(&SleepStatistics::new(user_id, start, period_type, aggregate))
                .await?;
            if let Some(stats) = self.db.find_statistics(user_id, start, period_type).await? {
                stored.push(stats);
            }
        }

        tracing::info!(user_id = %user_id, date = %date, rows = stored.len(), "Statistics recalculated");
        Ok(stored)
    }

    /// Overview of the last 30 days, `None` without sessions
    pub async fn summary(&self, user_id: &str) -> AppResult<Option<SleepSummary>> {
        let now = self.time_provider.now_utc();
        let since = now - Duration::days(SUMMARY_DAYS);
        let sessions = self
            .db
            .sessions_in_range(user_id, SleepTimeRange::since(since))
            .await?;

        if sessions.is_empty() {
            return Ok(None);
        }

        let aggregate = SleepAggregate::from_sessions(&sessions, |_| DEFAULT_TARGET_SLEEP_HOURS);
        Ok(Some(SleepSummary {
            period: "30_days",
            total_sessions: aggregate.sessions_count,
            total_sleep_hours: aggregate.total_sleep_hours,
            average_sleep_hours: aggregate.average_sleep_hours,
            average_quality: aggregate.average_quality,
            start_date: since.date_naive(),
            end_date: now.date_naive(),
        }))
    }
}
