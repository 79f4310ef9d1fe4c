//! Scheduled Task Model
//!
//! Background jobs executed on a cron schedule by the scheduling service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};
use uuid::Uuid;

use super::ReminderType;

/// Task types for scheduled operations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduledTaskType {
    BedtimeReminders,
    WakeReminders,
    LogReminders,
    DailyStatistics,
    WeeklyStatistics,
    MonthlyStatistics,
    WeeklyReports,
}

impl ScheduledTaskType {
    /// Get display name for the task type
    pub fn display_name(&self) -> &'static str {
        match self {
            ScheduledTaskType::BedtimeReminders => "Bedtime Reminders",
            ScheduledTaskType::WakeReminders => "Wake Reminders",
            ScheduledTaskType::LogReminders => "Log Reminders",
            ScheduledTaskType::DailyStatistics => "Daily Statistics",
            ScheduledTaskType::WeeklyStatistics => "Weekly Statistics",
            ScheduledTaskType::MonthlyStatistics => "Monthly Statistics",
            ScheduledTaskType::WeeklyReports => "Weekly Reports",
        }
    }

    /// Default six-field (seconds first) cron expression, evaluated in UTC
    pub fn default_cron_expression(&self) -> &'static str {
        match self {
            ScheduledTaskType::BedtimeReminders
            | ScheduledTaskType::WakeReminders
            | ScheduledTaskType::LogReminders => "0 * * * * *",
            ScheduledTaskType::DailyStatistics => "0 5 0 * * *",
            ScheduledTaskType::WeeklyStatistics => "0 10 0 * * *",
            ScheduledTaskType::MonthlyStatistics => "0 15 0 * * *",
            ScheduledTaskType::WeeklyReports => "0 0 9 * * Mon",
        }
    }

    /// Reminder kind handled by this task, if it is a reminder task
    pub fn reminder_type(&self) -> Option<ReminderType> {
        match self {
            ScheduledTaskType::BedtimeReminders => Some(ReminderType::Bedtime),
            ScheduledTaskType::WakeReminders => Some(ReminderType::Wake),
            ScheduledTaskType::LogReminders => Some(ReminderType::Log),
            _ => None,
        }
    }
}

/// A job registered with the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledTask {
    pub id: String,
    pub task_type: ScheduledTaskType,
    pub cron_expression: String,
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(task_type: ScheduledTaskType, cron_expression: String) -> Self {
        Self {
            id: format!("task_{}_{}", task_type, Uuid::new_v4()),
            task_type,
            cron_expression,
            created_at: Utc::now(),
        }
    }

    /// Create a system task on its default schedule
    pub fn system_task(task_type: ScheduledTaskType) -> Self {
        Self::new(task_type, task_type.default_cron_expression().to_string())
    }
}
