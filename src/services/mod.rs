//! Services module for AmbiDream
//!
//! Business logic shared by the HTTP handlers and the scheduled jobs.

pub mod auth_service;
pub mod calendar_sync_service;
pub mod notification_service;
pub mod reminder_service;
pub mod scheduling_service;
pub mod statistics_service;
pub mod task_handlers;
pub mod time_provider;
pub mod timezone;

pub use auth_service::{AuthService, LoginResponse};
pub use calendar_sync_service::{CalendarSyncService, ConnectCalendarRequest, SyncOutcome};
pub use notification_service::NotificationService;
pub use reminder_service::ReminderService;
pub use scheduling_service::{SchedulingError, SchedulingService, TaskHandler};
pub use statistics_service::StatisticsService;
pub use time_provider::{MockTimeProvider, SystemTimeProvider, TimeProvider};
