//! Task handlers for the periodic jobs
//!
//! Each handler wraps a service call and converts its error into a
//! [`SchedulingError`]. [`register_default_handlers`] wires all of them into
//! a [`SchedulingService`].

use async_trait::async_trait;
use chrono::Days;
use std::sync::Arc;
use tracing::info;

use crate::models::scheduled_task::{ScheduledTask, ScheduledTaskType};
use crate::models::{PeriodType, ReminderType};
use crate::services::reminder_service::ReminderService;
use crate::services::scheduling_service::{
    SchedulingError, SchedulingResult, SchedulingService, TaskContext, TaskHandler,
};
use crate::services::statistics_service::StatisticsService;

fn failed(task: &ScheduledTask, error: impl std::fmt::Display) -> SchedulingError {
    SchedulingError::TaskExecutionFailed {
        message: format!("{} failed: {}", task.task_type.display_name(), error),
    }
}

/// Sends the reminders of one type that are due this minute
pub struct ReminderTaskHandler {
    reminder_type: ReminderType,
    reminders: ReminderService,
}

impl ReminderTaskHandler {
    pub fn new(reminder_type: ReminderType, reminders: ReminderService) -> Self {
        Self {
            reminder_type,
            reminders,
        }
    }
}

#[async_trait]
impl TaskHandler for ReminderTaskHandler {
    async fn execute(&self, task: &ScheduledTask, _context: &TaskContext) -> SchedulingResult<usize> {
        self.reminders
            .send_due_reminders(self.reminder_type)
            .await
            .map_err(|e| failed(task, e))
    }
}

/// Recomputes statistics rows for one period type
///
/// Every period type covers the period containing yesterday, so a week or
/// month is recomputed once more on the day after it closes.
pub struct StatisticsTaskHandler {
    period_type: PeriodType,
    statistics: StatisticsService,
}

impl StatisticsTaskHandler {
    pub fn new(period_type: PeriodType, statistics: StatisticsService) -> Self {
        Self {
            period_type,
            statistics,
        }
    }
}

#[async_trait]
impl TaskHandler for StatisticsTaskHandler {
    async fn execute(&self, task: &ScheduledTask, context: &TaskContext) -> SchedulingResult<usize> {
        let yesterday = context.started_at.date_naive() - Days::new(1);
        let result = match self.period_type {
            PeriodType::Daily => self.statistics.calculate_daily(yesterday).await,
            PeriodType::Weekly => {
                self.statistics
                    .calculate_weekly(PeriodType::Weekly.period_start(yesterday))
                    .await
            }
            PeriodType::Monthly => {
                self.statistics
                    .calculate_monthly(PeriodType::Monthly.period_start(yesterday))
                    .await
            }
        };
        result.map_err(|e| failed(task, e))
    }
}

pub struct WeeklyReportTaskHandler {
    reminders: ReminderService,
}

impl WeeklyReportTaskHandler {
    pub fn new(reminders: ReminderService) -> Self {
        Self { reminders }
    }
}

#[async_trait]
impl TaskHandler for WeeklyReportTaskHandler {
    async fn execute(&self, task: &ScheduledTask, _context: &TaskContext) -> SchedulingResult<usize> {
        self.reminders
            .send_weekly_reports()
            .await
            .map_err(|e| failed(task, e))
    }
}

/// Register a handler for every scheduled task type
pub async fn register_default_handlers(
    scheduler: &SchedulingService,
    reminders: &ReminderService,
    statistics: &StatisticsService,
) {
    for task_type in [
        ScheduledTaskType::BedtimeReminders,
        ScheduledTaskType::WakeReminders,
        ScheduledTaskType::LogReminders,
    ] {
        if let Some(reminder_type) = task_type.reminder_type() {
            let handler = ReminderTaskHandler::new(reminder_type, reminders.clone());
            scheduler.register_handler(task_type, Arc::new(handler)).await;
        }
    }

    for (task_type, period_type) in [
        (ScheduledTaskType::DailyStatistics, PeriodType::Daily),
        (ScheduledTaskType::WeeklyStatistics, PeriodType::Weekly),
        (ScheduledTaskType::MonthlyStatistics, PeriodType::Monthly),
    ] {
        let handler = StatisticsTaskHandler::new(period_type, statistics.clone());
        scheduler.register_handler(task_type, Arc::new(handler)).await;
    }

    scheduler
        .register_handler(
            ScheduledTaskType::WeeklyReports,
            Arc::new(WeeklyReportTaskHandler::new(reminders.clone())),
        )
        .await;

    info!("Registered default task handlers");
}
