//! Google Calendar synchronisation
//!
//! Sessions are mirrored as events on the owner's primary calendar. API
//! calls made on behalf of request handlers run in background tasks and are
//! retried with exponential backoff when the failure is transient.

use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::database::DatabaseManager;
use crate::error::{AppError, AppResult};
use crate::integrations::google_calendar::{CalendarError, CalendarEvent, CalendarProvider, SleepEvent};
use crate::logging::log_calendar_sync;
use crate::models::UserProfile;

/// Payload accepted when connecting a calendar
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectCalendarRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<String>,
}

/// Result of syncing one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(String),
    Updated(String),
    /// Calendar sync is not enabled for the owner
    Skipped,
}

#[derive(Clone)]
pub struct CalendarSyncService {
    db: Arc<DatabaseManager>,
    provider: Arc<dyn CalendarProvider>,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl CalendarSyncService {
    pub fn new(
        db: Arc<DatabaseManager>,
        provider: Arc<dyn CalendarProvider>,
        retry_attempts: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            db,
            provider,
            retry_attempts: retry_attempts.max(1),
            retry_backoff,
        }
    }

    async fn access_token(&self, profile: &UserProfile) -> AppResult<String> {
        let refresh_token = profile
            .google_refresh_token
            .as_deref()
            .filter(|_| profile.calendar_connected())
            .ok_or(CalendarError::NotConnected)?;
        Ok(self.provider.refresh_access_token(refresh_token).await?.access_token)
    }

    /// Create or update the calendar event for a session
    pub async fn sync_session(&self, session_id: &str) -> AppResult<SyncOutcome> {
        let session = self
            .db
            .get_session_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Sleep session"))?;
        let profile = self.db.get_or_create_profile(&session.user_id).await?;

        if !profile.calendar_connected() {
            tracing::debug!(session_id = %session_id, "Calendar sync disabled for owner");
            return Ok(SyncOutcome::Skipped);
        }

        let access_token = self.access_token(&profile).await?;
        let event = SleepEvent::from_session(&session, &profile.timezone);

        match session.calendar_event_id.as_deref() {
            Some(event_id) if session.synced_to_calendar => {
                self.provider
                    .update_event(&access_token, event_id, &event)
                    .await?;
                Ok(SyncOutcome::Updated(event_id.to_string()))
            }
            _ => {
                let created = self.provider.insert_event(&access_token, &event).await?;
                self.db.mark_session_synced(&session.id, &created.id).await?;
                Ok(SyncOutcome::Created(created.id))
            }
        }
    }

    /// Remove an event from the owner's calendar
    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let profile = self.db.get_or_create_profile(user_id).await?;
        let access_token = self.access_token(&profile).await?;
        self.provider.delete_event(&access_token, event_id).await?;
        Ok(())
    }

    /// Run `operation`, retrying retryable calendar failures
    ///
    /// The delay doubles after every failed attempt.
    pub async fn with_retry<T, F, Fut>(&self, action: &str, target: &str, operation: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    log_calendar_sync(target, action, attempt, true);
                    return Ok(value);
                }
                Err(AppError::Calendar(e)) if e.is_retryable() && attempt < self.retry_attempts => {
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        target_id = %target,
                        action = %action,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Calendar call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log_calendar_sync(target, action, attempt, false);
                    return Err(e);
                }
            }
        }
    }

    /// Sync a session in the background
    pub fn enqueue_sync(&self, session_id: String) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service
                .with_retry("sync", &session_id, || service.sync_session(&session_id))
                .await;
            if let Err(e) = result {
                tracing::error!(session_id = %session_id, error = %e, "Calendar sync failed");
            }
        })
    }

    /// Delete an event in the background
    pub fn enqueue_delete(&self, user_id: String, event_id: String) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service
                .with_retry("delete", &event_id, || service.delete_event(&user_id, &event_id))
                .await;
            if let Err(e) = result {
                tracing::error!(event_id = %event_id, error = %e, "Calendar event deletion failed");
            }
        })
    }

    /// Store a refresh token for `profile` after proving it works
    pub async fn connect(
        &self,
        profile: &mut UserProfile,
        request: ConnectCalendarRequest,
    ) -> AppResult<()> {
        let refresh_token = match (request.code, request.refresh_token) {
            (Some(code), _) => {
                let redirect_uri = request.redirect_uri.unwrap_or_default();
                self.provider
                    .exchange_code(&code, &redirect_uri)
                    .await?
                    .refresh_token
                    .ok_or_else(|| {
                        CalendarError::Auth("No refresh token returned by Google".to_string())
                    })?
            }
            (None, Some(token)) if !token.trim().is_empty() => token,
            _ => {
                return Err(AppError::bad_request(
                    "An authorization code or refresh token is required",
                ))
            }
        };

        self.provider.refresh_access_token(&refresh_token).await?;

        profile.google_refresh_token = Some(refresh_token);
        profile.google_calendar_enabled = true;
        profile.updated_at = crate::models::now();
        self.db.update_profile(profile).await?;

        tracing::info!(user_id = %profile.user_id, "Google Calendar connected");
        Ok(())
    }

    pub async fn disconnect(&self, profile: &mut UserProfile) -> AppResult<()> {
        profile.google_refresh_token = None;
        profile.google_calendar_enabled = false;
        profile.updated_at = crate::models::now();
        self.db.update_profile(profile).await?;

        tracing::info!(user_id = %profile.user_id, "Google Calendar disconnected");
        Ok(())
    }

    /// Upcoming events on the connected calendar
    pub async fn upcoming_events(
        &self,
        profile: &UserProfile,
        max_results: u32,
    ) -> AppResult<Vec<CalendarEvent>> {
        let access_token = self.access_token(profile).await?;
        Ok(self
            .provider
            .list_upcoming_events(&access_token, max_results)
            .await?)
    }
}
