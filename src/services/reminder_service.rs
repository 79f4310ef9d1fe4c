//! Reminder dispatch
//!
//! Runs every minute per reminder type. A reminder is due when its
//! `reminder_time` matches the current hour and minute in the owner's
//! profile timezone.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{DatabaseManager, SleepTimeRange};
use crate::error::AppResult;
use crate::models::{PeriodType, ReminderType, User, UserProfile};
use crate::services::notification_service::NotificationService;
use crate::services::statistics_service::StatisticsService;
use crate::services::time_provider::TimeProvider;
use crate::services::timezone::{local_date, local_time, resolve_timezone};

/// UTC instant of local midnight starting `date`
fn local_midnight(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    timezone
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc())
}

#[derive(Clone)]
pub struct ReminderService {
    db: Arc<DatabaseManager>,
    notifications: NotificationService,
    statistics: StatisticsService,
    time_provider: Arc<dyn TimeProvider>,
}

impl ReminderService {
    pub fn new(
        db: Arc<DatabaseManager>,
        notifications: NotificationService,
        statistics: StatisticsService,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            db,
            notifications,
            statistics,
            time_provider,
        }
    }

    /// Send every reminder of `reminder_type` due this minute
    ///
    /// # Returns
    /// The number of e-mails delivered
    pub async fn send_due_reminders(&self, reminder_type: ReminderType) -> AppResult<usize> {
        let now = self.time_provider.now_utc();
        let reminders = self.db.active_reminders_of_type(reminder_type).await?;
        let mut owners: HashMap<String, Option<(User, UserProfile)>> = HashMap::new();
        let mut sent = 0;

        for reminder in reminders {
            if reminder.sent_this_minute(now) {
                continue;
            }

            if !owners.contains_key(&reminder.user_id) {
                let owner = self.load_owner(&reminder.user_id).await?;
                owners.insert(reminder.user_id.clone(), owner);
            }
            let Some(Some((user, profile))) = owners.get(&reminder.user_id) else {
                continue;
            };
            if !profile.notification_enabled {
                continue;
            }

            let timezone = resolve_timezone(&profile.timezone);
            if !reminder.is_due(local_time(now, timezone)) {
                continue;
            }

            if reminder_type == ReminderType::Log && self.logged_last_night(user, timezone, now).await? {
                tracing::debug!(user_id = %user.id, "Sleep already logged, skipping log reminder");
                continue;
            }

            if self.notifications.send_reminder(user, &reminder).await {
                self.db.mark_reminder_sent(&reminder.id, now).await?;
                sent += 1;
            }
        }

        Ok(sent)
    }

    /// Recompute last week's statistics and e-mail them to every user with
    /// notifications enabled
    pub async fn send_weekly_reports(&self) -> AppResult<usize> {
        let today = self.time_provider.today();
        let last_week = PeriodType::Weekly.period_start(today) - Days::new(7);
        self.statistics.calculate_weekly(last_week).await?;

        let mut sent = 0;
        for (user, _profile) in self.db.users_with_notifications().await? {
            let Some(stats) = self
                .db
                .find_statistics(&user.id, last_week, PeriodType::Weekly)
                .await?
            else {
                continue;
            };

            if self.notifications.send_weekly_report(&user, &stats, today).await {
                sent += 1;
            }
        }

        Ok(sent)
    }

    async fn load_owner(&self, user_id: &str) -> AppResult<Option<(User, UserProfile)>> {
        let Some(user) = self.db.get_user(user_id).await? else {
            return Ok(None);
        };
        let profile = self.db.get_or_create_profile(user_id).await?;
        Ok(Some((user, profile)))
    }

    /// Whether a session starts on yesterday's local date
    async fn logged_last_night(&self, user: &User, timezone: Tz, now: DateTime<Utc>) -> AppResult<bool> {
        let today = local_date(now, timezone);
        let yesterday = today - Days::new(1);
        let range = SleepTimeRange::between(
            local_midnight(yesterday, timezone),
            local_midnight(today, timezone),
        );
        Ok(self.db.has_session_in_range(&user.id, range).await?)
    }
}
