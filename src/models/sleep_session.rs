//! Sleep Session Model
//!
//! A single recorded sleep interval with optional quality rating and notes.
//! Duration is always derived from the two instants and never accepted from
//! clients.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumIter, IntoEnumIterator};
use uuid::Uuid;

use super::{double_option, from_timestamp, now, round2};
use crate::error::{AppResult, Validator};

/// Longest session accepted, in seconds
pub const MAX_SESSION_SECONDS: i64 = 24 * 60 * 60;

/// Subjective sleep quality on a 1..=5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum QualityRating {
    #[strum(serialize = "Very Poor")]
    VeryPoor = 1,
    Poor = 2,
    Fair = 3,
    Good = 4,
    Excellent = 5,
}

impl QualityRating {
    pub fn from_value(value: u8) -> Option<Self> {
        Self::iter().find(|rating| rating.value() == value)
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Human readable label, e.g. "Very Poor"
    pub fn label(self) -> String {
        self.to_string()
    }
}

/// Compute the session length in hours, rounded to two decimals
pub fn compute_duration_hours(sleep_time: DateTime<Utc>, wake_time: DateTime<Utc>) -> f64 {
    round2((wake_time - sleep_time).num_seconds() as f64 / 3600.0)
}

/// Recorded sleep session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepSession {
    pub id: String,
    pub user_id: String,
    pub sleep_time: DateTime<Utc>,
    pub wake_time: DateTime<Utc>,
    pub quality_rating: Option<u8>,
    pub notes: String,
    pub duration_hours: f64,
    pub synced_to_calendar: bool,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SleepSession {
    /// Build a new session for `user_id`; duration is derived
    pub fn new(user_id: &str, input: NewSleepSession) -> Self {
        let now = now();
        let mut session = Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            sleep_time: input.sleep_time,
            wake_time: input.wake_time,
            quality_rating: input.quality_rating,
            notes: input.notes.unwrap_or_default(),
            duration_hours: 0.0,
            synced_to_calendar: false,
            calendar_event_id: None,
            created_at: now,
            updated_at: now,
        };
        session.recompute_duration();
        session
    }

    pub fn recompute_duration(&mut self) {
        self.duration_hours = compute_duration_hours(self.sleep_time, self.wake_time);
    }

    pub fn quality(&self) -> Option<QualityRating> {
        self.quality_rating.and_then(QualityRating::from_value)
    }

    /// Label of the quality rating, if rated
    pub fn quality_label(&self) -> Option<String> {
        self.quality().map(QualityRating::label)
    }

    /// The UTC calendar date this session is bucketed under
    pub fn sleep_date(&self) -> NaiveDate {
        self.sleep_time.date_naive()
    }

    /// Replace every client-editable field
    pub fn replace(&mut self, input: NewSleepSession) {
        self.sleep_time = input.sleep_time;
        self.wake_time = input.wake_time;
        self.quality_rating = input.quality_rating;
        self.notes = input.notes.unwrap_or_default();
        self.touch();
    }

    /// Apply a partial update
    pub fn apply(&mut self, patch: SleepSessionPatch) {
        if let Some(sleep_time) = patch.sleep_time {
            self.sleep_time = sleep_time;
        }
        if let Some(wake_time) = patch.wake_time {
            self.wake_time = wake_time;
        }
        if let Some(quality) = patch.quality_rating {
            self.quality_rating = quality;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.touch();
    }

    /// Check the session invariants after an update has been applied
    pub fn validate(&self) -> AppResult<()> {
        validate_fields(self.sleep_time, self.wake_time, self.quality_rating)
    }

    fn touch(&mut self) {
        self.recompute_duration();
        self.updated_at = now();
    }
}

/// Session as returned by the API, with the derived quality label
#[derive(Debug, Clone, Serialize)]
pub struct SleepSessionView {
    #[serde(flatten)]
    pub session: SleepSession,
    pub quality_label: Option<String>,
}

impl From<SleepSession> for SleepSessionView {
    fn from(session: SleepSession) -> Self {
        let quality_label = session.quality_label();
        Self {
            session,
            quality_label,
        }
    }
}

/// `sleep_sessions` table row
#[derive(Debug, Clone, FromRow)]
pub struct SleepSessionRow {
    pub id: String,
    pub user_id: String,
    pub sleep_time: i64,
    pub wake_time: i64,
    pub quality_rating: Option<i64>,
    pub notes: String,
    pub duration_hours: f64,
    pub synced_to_calendar: bool,
    pub calendar_event_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<SleepSessionRow> for SleepSession {
    fn from(row: SleepSessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            sleep_time: from_timestamp(row.sleep_time),
            wake_time: from_timestamp(row.wake_time),
            quality_rating: row.quality_rating.and_then(|q| u8::try_from(q).ok()),
            notes: row.notes,
            duration_hours: row.duration_hours,
            synced_to_calendar: row.synced_to_calendar,
            calendar_event_id: row.calendar_event_id,
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        }
    }
}

/// Create or full-update payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewSleepSession {
    pub sleep_time: DateTime<Utc>,
    pub wake_time: DateTime<Utc>,
    #[serde(default)]
    pub quality_rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSleepSession {
    pub fn validate(&self) -> AppResult<()> {
        validate_fields(self.sleep_time, self.wake_time, self.quality_rating)
    }
}

/// Partial update payload; `quality_rating: null` clears the rating
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepSessionPatch {
    pub sleep_time: Option<DateTime<Utc>>,
    pub wake_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub quality_rating: Option<Option<u8>>,
    pub notes: Option<String>,
}

fn validate_fields(
    sleep_time: DateTime<Utc>,
    wake_time: DateTime<Utc>,
    quality_rating: Option<u8>,
) -> AppResult<()> {
    let mut validator = Validator::new();
    let seconds = (wake_time - sleep_time).num_seconds();
    validator
        .check(
            wake_time > sleep_time,
            "wake_time",
            "Wake time must be after sleep time",
        )
        .check(
            seconds <= MAX_SESSION_SECONDS,
            "wake_time",
            "Sleep session cannot be longer than 24 hours",
        );
    if let Some(rating) = quality_rating {
        validator.check(
            QualityRating::from_value(rating).is_some(),
            "quality_rating",
            "Quality rating must be between 1 and 5",
        );
    }
    validator.finish()
}

/// List filters on the UTC date of `sleep_time`, both bounds inclusive
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
}
