//! Sleep goals: a target bedtime, wake time and duration for chosen weekdays

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

use super::{format_time, from_timestamp, now, parse_time};
use crate::error::{AppResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepGoal {
    pub id: String,
    pub user_id: String,
    pub target_bedtime: NaiveTime,
    pub target_wake_time: NaiveTime,
    pub target_duration_hours: f64,
    /// 0 = Monday .. 6 = Sunday; empty applies to every day
    pub days_of_week: Vec<u8>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SleepGoal {
    pub fn new(user_id: &str, input: NewSleepGoal) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            target_bedtime: input.target_bedtime,
            target_wake_time: input.target_wake_time,
            target_duration_hours: input.target_duration_hours.unwrap_or(8.0),
            days_of_week: input.days_of_week.unwrap_or_default(),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this goal covers the given weekday
    pub fn applies_to(&self, weekday: Weekday) -> bool {
        let day = weekday.num_days_from_monday() as u8;
        self.days_of_week.is_empty() || self.days_of_week.contains(&day)
    }

    pub fn replace(&mut self, input: NewSleepGoal) {
        let replacement = Self::new(&self.user_id, input);
        self.target_bedtime = replacement.target_bedtime;
        self.target_wake_time = replacement.target_wake_time;
        self.target_duration_hours = replacement.target_duration_hours;
        self.days_of_week = replacement.days_of_week;
        self.is_active = replacement.is_active;
        self.updated_at = now();
    }

    pub fn apply(&mut self, patch: SleepGoalPatch) {
        if let Some(bedtime) = patch.target_bedtime {
            self.target_bedtime = bedtime;
        }
        if let Some(wake) = patch.target_wake_time {
            self.target_wake_time = wake;
        }
        if let Some(hours) = patch.target_duration_hours {
            self.target_duration_hours = hours;
        }
        if let Some(days) = patch.days_of_week {
            self.days_of_week = days;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now();
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_fields(Some(self.target_duration_hours), Some(&self.days_of_week))
    }

    pub(crate) fn days_json(&self) -> String {
        serde_json::to_string(&self.days_of_week).unwrap_or_else(|_| "[]".to_string())
    }

    pub(crate) fn bedtime_str(&self) -> String {
        format_time(self.target_bedtime)
    }

    pub(crate) fn wake_time_str(&self) -> String {
        format_time(self.target_wake_time)
    }
}

/// `sleep_goals` table row
#[derive(Debug, Clone, FromRow)]
pub struct SleepGoalRow {
    pub id: String,
    pub user_id: String,
    pub target_bedtime: String,
    pub target_wake_time: String,
    pub target_duration_hours: f64,
    pub days_of_week: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SleepGoalRow> for SleepGoal {
    type Error = anyhow::Error;

    fn try_from(row: SleepGoalRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            target_bedtime: parse_time(&row.target_bedtime)?,
            target_wake_time: parse_time(&row.target_wake_time)?,
            target_duration_hours: row.target_duration_hours,
            days_of_week: serde_json::from_str(&row.days_of_week)?,
            is_active: row.is_active,
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSleepGoal {
    pub target_bedtime: NaiveTime,
    pub target_wake_time: NaiveTime,
    #[serde(default)]
    pub target_duration_hours: Option<f64>,
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewSleepGoal {
    pub fn validate(&self) -> AppResult<()> {
        validate_fields(self.target_duration_hours, self.days_of_week.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepGoalPatch {
    pub target_bedtime: Option<NaiveTime>,
    pub target_wake_time: Option<NaiveTime>,
    pub target_duration_hours: Option<f64>,
    pub days_of_week: Option<Vec<u8>>,
    pub is_active: Option<bool>,
}

fn validate_fields(duration: Option<f64>, days: Option<&[u8]>) -> AppResult<()> {
    let mut validator = Validator::new();
    if let Some(hours) = duration {
        validator.check(
            (1.0..=24.0).contains(&hours),
            "target_duration_hours",
            "Ensure this value is between 1.0 and 24.0",
        );
    }
    if let Some(days) = days {
        let unique: HashSet<_> = days.iter().collect();
        validator
            .check(
                days.iter().all(|day| *day <= 6),
                "days_of_week",
                "Days must be between 0 (Monday) and 6 (Sunday)",
            )
            .check(
                unique.len() == days.len(),
                "days_of_week",
                "Days must not contain duplicates",
            );
    }
    validator.finish()
}
