//! Cross-user read-only listings for staff

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::Instrument;

use super::goals::GOAL_COLUMNS;
use super::reminders::REMINDER_COLUMNS;
use super::sleep_sessions::SESSION_COLUMNS;
use super::statistics::STATISTICS_COLUMNS;
use super::users::PROFILE_COLUMNS;
use super::DatabaseManager;
use crate::db_span;
use crate::models::sleep_goal::SleepGoalRow;
use crate::models::sleep_reminder::SleepReminderRow;
use crate::models::sleep_session::SleepSessionRow;
use crate::models::sleep_statistics::SleepStatisticsRow;
use crate::models::user::ProfileRow;
use crate::models::{
    PeriodType, ReminderType, SleepGoal, SleepReminder, SleepSession, SleepSessionView,
    SleepStatistics, UserProfile,
};

/// Query parameters shared by the admin listings; each listing reads the
/// filters that apply to its entity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminFilter {
    /// Substring match on username (and notes for sessions)
    pub search: Option<String>,
    pub notification_enabled: Option<bool>,
    pub google_calendar_enabled: Option<bool>,
    pub quality_rating: Option<u8>,
    pub synced_to_calendar: Option<bool>,
    pub is_active: Option<bool>,
    pub reminder_type: Option<ReminderType>,
    pub period_type: Option<PeriodType>,
    pub page: Option<u32>,
}

impl AdminFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", term))
    }
}

/// A record annotated with its owner's username
#[derive(Debug, Clone, Serialize)]
pub struct AdminRecord<T> {
    pub username: String,
    #[serde(flatten)]
    pub record: T,
}

/// Prefix every column of a comma separated list with a table alias
fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{}.{}", alias, column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Describes one admin listing: table, columns, ordering and filters
struct Listing<'f> {
    table: &'static str,
    columns: &'static str,
    order_by: &'static str,
    filter: &'f AdminFilter,
    conditions: fn(&mut QueryBuilder<'f, Sqlite>, &'f AdminFilter),
    search_notes: bool,
}

impl<'f> Listing<'f> {
    fn push_where(&self, builder: &mut QueryBuilder<'f, Sqlite>) {
        builder.push(" WHERE 1 = 1");
        if let Some(pattern) = self.filter.search_pattern() {
            builder.push(" AND (u.username LIKE ").push_bind(pattern.clone());
            if self.search_notes {
                builder.push(" OR t.notes LIKE ").push_bind(pattern);
            }
            builder.push(")");
        }
        (self.conditions)(builder, self.filter);
    }

    fn from_clause(&self) -> String {
        format!(" FROM {} t JOIN users u ON u.id = t.user_id", self.table)
    }
}

impl DatabaseManager {
    async fn admin_page<'f, R>(
        &self,
        listing: Listing<'f>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(R, String)>, i64)>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut count_query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*){}",
            listing.from_clause()
        ));
        listing.push_where(&mut count_query);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, u.username{}",
            prefixed(listing.columns, "t"),
            listing.from_clause()
        ));
        listing.push_where(&mut select);
        select
            .push(format!(" ORDER BY {} LIMIT ", listing.order_by))
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", listing.table))
            .await?;

        let records = rows
            .iter()
            .map(|row| Ok((R::from_row(row)?, row.try_get::<String, _>("username")?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok((records, count))
    }

    pub async fn admin_profiles(
        &self,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminRecord<UserProfile>>, i64)> {
        let listing = Listing {
            table: "user_profiles",
            columns: PROFILE_COLUMNS,
            order_by: "u.username",
            filter,
            conditions: |builder, filter| {
                if let Some(enabled) = filter.notification_enabled {
                    builder.push(" AND t.notification_enabled = ").push_bind(enabled);
                }
                if let Some(enabled) = filter.google_calendar_enabled {
                    builder.push(" AND t.google_calendar_enabled = ").push_bind(enabled);
                }
            },
            search_notes: false,
        };
        let (rows, count) = self.admin_page::<ProfileRow>(listing, limit, offset).await?;
        let records = rows
            .into_iter()
            .map(|(row, username)| {
                Ok(AdminRecord {
                    username,
                    record: UserProfile::try_from(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((records, count))
    }

    pub async fn admin_sessions(
        &self,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminRecord<SleepSessionView>>, i64)> {
        let listing = Listing {
            table: "sleep_sessions",
            columns: SESSION_COLUMNS,
            order_by: "t.sleep_time DESC",
            filter,
            conditions: |builder, filter| {
                if let Some(rating) = filter.quality_rating {
                    builder.push(" AND t.quality_rating = ").push_bind(i64::from(rating));
                }
                if let Some(synced) = filter.synced_to_calendar {
                    builder.push(" AND t.synced_to_calendar = ").push_bind(synced);
                }
            },
            search_notes: true,
        };
        let (rows, count) = self.admin_page::<SleepSessionRow>(listing, limit, offset).await?;
        let records = rows
            .into_iter()
            .map(|(row, username)| AdminRecord {
                username,
                record: SleepSessionView::from(SleepSession::from(row)),
            })
            .collect();
        Ok((records, count))
    }

    pub async fn admin_goals(
        &self,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminRecord<SleepGoal>>, i64)> {
        let listing = Listing {
            table: "sleep_goals",
            columns: GOAL_COLUMNS,
            order_by: "t.created_at DESC, t.id",
            filter,
            conditions: |builder, filter| {
                if let Some(active) = filter.is_active {
                    builder.push(" AND t.is_active = ").push_bind(active);
                }
            },
            search_notes: false,
        };
        let (rows, count) = self.admin_page::<SleepGoalRow>(listing, limit, offset).await?;
        let records = rows
            .into_iter()
            .map(|(row, username)| {
                Ok(AdminRecord {
                    username,
                    record: SleepGoal::try_from(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((records, count))
    }

    pub async fn admin_reminders(
        &self,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminRecord<SleepReminder>>, i64)> {
        let listing = Listing {
            table: "sleep_reminders",
            columns: REMINDER_COLUMNS,
            order_by: "t.reminder_time, t.id",
            filter,
            conditions: |builder, filter| {
                if let Some(reminder_type) = filter.reminder_type {
                    builder
                        .push(" AND t.reminder_type = ")
                        .push_bind(reminder_type.to_string());
                }
                if let Some(active) = filter.is_active {
                    builder.push(" AND t.is_active = ").push_bind(active);
                }
            },
            search_notes: false,
        };
        let (rows, count) = self.admin_page::<SleepReminderRow>(listing, limit, offset).await?;
        let records = rows
            .into_iter()
            .map(|(row, username)| {
                Ok(AdminRecord {
                    username,
                    record: SleepReminder::try_from(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((records, count))
    }

    pub async fn admin_statistics(
        &self,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminRecord<SleepStatistics>>, i64)> {
        let listing = Listing {
            table: "sleep_statistics",
            columns: STATISTICS_COLUMNS,
            order_by: "t.date DESC, t.period_type",
            filter,
            conditions: |builder, filter| {
                if let Some(period) = filter.period_type {
                    builder
                        .push(" AND t.period_type = ")
                        .push_bind(period.to_string());
                }
            },
            search_notes: false,
        };
        let (rows, count) = self
            .admin_page::<SleepStatisticsRow>(listing, limit, offset)
            .await?;
        let records = rows
            .into_iter()
            .map(|(row, username)| {
                Ok(AdminRecord {
                    username,
                    record: SleepStatistics::try_from(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((records, count))
    }
}
