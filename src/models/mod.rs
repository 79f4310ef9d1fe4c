//! Models module for AmbiDream
//!
//! Contains all data models, request payloads and their validation logic.

pub mod pagination;
pub mod scheduled_task;
pub mod sleep_goal;
pub mod sleep_reminder;
pub mod sleep_session;
pub mod sleep_statistics;
pub mod user;

pub use pagination::{Page, PageParams};
pub use scheduled_task::{ScheduledTask, ScheduledTaskType};
pub use sleep_goal::{NewSleepGoal, SleepGoal, SleepGoalPatch};
pub use sleep_reminder::{NewSleepReminder, ReminderType, SleepReminder, SleepReminderPatch};
pub use sleep_session::{
    NewSleepSession, QualityRating, SessionFilter, SleepSession, SleepSessionPatch, SleepSessionView,
};
pub use sleep_statistics::{PeriodType, SleepAggregate, SleepStatistics, SleepSummary, StatisticsFilter};
pub use user::{NewUser, ProfileUpdate, User, UserProfile};

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};

/// Convert a stored Unix timestamp into a UTC instant
pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Current instant at the one-second precision the database stores
pub(crate) fn now() -> DateTime<Utc> {
    from_timestamp(Utc::now().timestamp())
}

/// Parse a stored `HH:MM:SS` time of day
pub(crate) fn parse_time(value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| anyhow::anyhow!("invalid stored time '{}': {}", value, e))
}

/// Format a time of day for storage
pub(crate) fn format_time(value: NaiveTime) -> String {
    value.format("%H:%M:%S").to_string()
}

/// Round to two decimal places, the precision every stored hour value uses
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH payloads
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
