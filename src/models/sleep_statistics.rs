//! Sleep Statistics Model
//!
//! Aggregated sleep metrics for a user over a day, week or month, plus the
//! rolling 30 day summary served by the statistics API.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use super::{from_timestamp, now, round2, SleepSession};

/// Aggregation period
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodType {
    /// Start of the period containing `date`
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => date,
            PeriodType::Weekly => {
                date - Days::new(u64::from(date.weekday().num_days_from_monday()))
            }
            PeriodType::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Half-open `[start, end)` date range of the period containing `date`
    pub fn period_bounds(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.period_start(date);
        let end = match self {
            PeriodType::Daily => start + Days::new(1),
            PeriodType::Weekly => start + Days::new(7),
            PeriodType::Monthly => start + Months::new(1),
        };
        (start, end)
    }
}

/// Totals computed over a set of sessions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SleepAggregate {
    pub total_sleep_hours: f64,
    pub average_sleep_hours: f64,
    pub average_quality: Option<f64>,
    pub sessions_count: i64,
    pub goal_achievement_rate: Option<f64>,
}

impl SleepAggregate {
    /// Aggregate `sessions`, resolving the nightly target through `target_for`
    ///
    /// Nights are keyed by the UTC date of `sleep_time`; several sessions on
    /// one date are summed before comparing against the target. The quality
    /// average only counts rated sessions.
    pub fn from_sessions<F>(sessions: &[SleepSession], target_for: F) -> Self
    where
        F: Fn(NaiveDate) -> f64,
    {
        if sessions.is_empty() {
            return Self::default();
        }

        let total: f64 = sessions.iter().map(|s| s.duration_hours).sum();
        let count = sessions.len();

        let ratings: Vec<f64> = sessions
            .iter()
            .filter_map(|s| s.quality_rating)
            .map(f64::from)
            .collect();
        let average_quality =
            (!ratings.is_empty()).then(|| round2(ratings.iter().sum::<f64>() / ratings.len() as f64));

        let mut nights: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for session in sessions {
            *nights.entry(session.sleep_date()).or_default() += session.duration_hours;
        }
        let met = nights
            .iter()
            .filter(|(date, hours)| **hours >= target_for(**date))
            .count();
        let rate = round2(met as f64 / nights.len() as f64 * 100.0);

        Self {
            total_sleep_hours: round2(total),
            average_sleep_hours: round2(total / count as f64),
            average_quality,
            sessions_count: count as i64,
            goal_achievement_rate: Some(rate),
        }
    }
}

/// Persisted aggregate for one user and period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepStatistics {
    pub id: String,
    pub user_id: String,
    /// First day of the period
    pub date: NaiveDate,
    pub period_type: PeriodType,
    pub total_sleep_hours: f64,
    pub average_sleep_hours: f64,
    pub average_quality: Option<f64>,
    pub sessions_count: i64,
    pub goal_achievement_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SleepStatistics {
    pub fn new(
        user_id: &str,
        date: NaiveDate,
        period_type: PeriodType,
        aggregate: SleepAggregate,
    ) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date,
            period_type,
            total_sleep_hours: aggregate.total_sleep_hours,
            average_sleep_hours: aggregate.average_sleep_hours,
            average_quality: aggregate.average_quality,
            sessions_count: aggregate.sessions_count,
            goal_achievement_rate: aggregate.goal_achievement_rate,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `sleep_statistics` table row
#[derive(Debug, Clone, FromRow)]
pub struct SleepStatisticsRow {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub period_type: String,
    pub total_sleep_hours: f64,
    pub average_sleep_hours: f64,
    pub average_quality: Option<f64>,
    pub sessions_count: i64,
    pub goal_achievement_rate: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SleepStatisticsRow> for SleepStatistics {
    type Error = anyhow::Error;

    fn try_from(row: SleepStatisticsRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")?,
            period_type: row.period_type.parse()?,
            total_sleep_hours: row.total_sleep_hours,
            average_sleep_hours: row.average_sleep_hours,
            average_quality: row.average_quality,
            sessions_count: row.sessions_count,
            goal_achievement_rate: row.goal_achievement_rate,
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsFilter {
    pub period_type: Option<PeriodType>,
    pub page: Option<u32>,
}

/// Rolling 30 day overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepSummary {
    pub period: &'static str,
    pub total_sessions: i64,
    pub total_sleep_hours: f64,
    pub average_sleep_hours: f64,
    pub average_quality: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
