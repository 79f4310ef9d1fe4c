//! Sleep reminders: a daily e-mail nudge at a local time of day

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use super::{format_time, from_timestamp, now, parse_time};
use crate::error::{AppResult, Validator};

/// Longest custom message accepted
pub const MAX_MESSAGE_CHARS: usize = 1000;

fn validate_message(message: Option<&str>) -> AppResult<()> {
    let mut validator = Validator::new();
    if let Some(message) = message {
        validator.check(
            message.chars().count() <= MAX_MESSAGE_CHARS,
            "message",
            "Ensure this field has no more than 1000 characters",
        );
    }
    validator.finish()
}

/// What a reminder is about
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
pub enum ReminderType {
    Bedtime,
    Wake,
    Log,
}

impl ReminderType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReminderType::Bedtime => "Bedtime Reminder",
            ReminderType::Wake => "Wake Up Reminder",
            ReminderType::Log => "Log Sleep Reminder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepReminder {
    pub id: String,
    pub user_id: String,
    pub reminder_type: ReminderType,
    /// Wall-clock time in the owner's profile timezone
    pub reminder_time: NaiveTime,
    pub is_active: bool,
    pub message: String,
    pub last_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SleepReminder {
    pub fn new(user_id: &str, input: NewSleepReminder) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            reminder_type: input.reminder_type,
            reminder_time: input.reminder_time,
            is_active: input.is_active.unwrap_or(true),
            message: input.message.unwrap_or_default(),
            last_sent: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the reminder matches `local_time` to the minute
    pub fn is_due(&self, local_time: NaiveTime) -> bool {
        self.is_active
            && self.reminder_time.hour() == local_time.hour()
            && self.reminder_time.minute() == local_time.minute()
    }

    /// Whether the reminder already went out during the minute containing `now`
    pub fn sent_this_minute(&self, now: DateTime<Utc>) -> bool {
        self.last_sent
            .is_some_and(|sent| sent.timestamp() / 60 == now.timestamp() / 60)
    }

    pub fn replace(&mut self, input: NewSleepReminder) {
        self.reminder_type = input.reminder_type;
        self.reminder_time = input.reminder_time;
        self.is_active = input.is_active.unwrap_or(true);
        self.message = input.message.unwrap_or_default();
        self.updated_at = now();
    }

    pub fn apply(&mut self, patch: SleepReminderPatch) {
        if let Some(reminder_type) = patch.reminder_type {
            self.reminder_type = reminder_type;
        }
        if let Some(time) = patch.reminder_time {
            self.reminder_time = time;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        self.updated_at = now();
    }

    pub(crate) fn time_str(&self) -> String {
        format_time(self.reminder_time)
    }
}

/// `sleep_reminders` table row
#[derive(Debug, Clone, FromRow)]
pub struct SleepReminderRow {
    pub id: String,
    pub user_id: String,
    pub reminder_type: String,
    pub reminder_time: String,
    pub is_active: bool,
    pub message: String,
    pub last_sent: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<SleepReminderRow> for SleepReminder {
    type Error = anyhow::Error;

    fn try_from(row: SleepReminderRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            reminder_type: row.reminder_type.parse()?,
            reminder_time: parse_time(&row.reminder_time)?,
            is_active: row.is_active,
            message: row.message,
            last_sent: row.last_sent.map(from_timestamp),
            created_at: from_timestamp(row.created_at),
            updated_at: from_timestamp(row.updated_at),
        })
    }
}

/// Create or full-update payload; `last_sent` is never accepted
#[derive(Debug, Clone, Deserialize)]
pub struct NewSleepReminder {
    pub reminder_type: ReminderType,
    pub reminder_time: NaiveTime,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewSleepReminder {
    pub fn validate(&self) -> AppResult<()> {
        validate_message(self.message.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepReminderPatch {
    pub reminder_type: Option<ReminderType>,
    pub reminder_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
    pub message: Option<String>,
}

impl SleepReminderPatch {
    pub fn validate(&self) -> AppResult<()> {
        validate_message(self.message.as_deref())
    }
}
