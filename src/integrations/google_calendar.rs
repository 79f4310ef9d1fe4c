//! Google Calendar client
//!
//! Talks to the Calendar v3 REST API and the OAuth token endpoint with a
//! refresh token stored on the user profile. Sleep sessions become events on
//! the user's `primary` calendar.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::GoogleCalendarConfig;
use crate::models::SleepSession;

const PRIMARY_CALENDAR: &str = "primary";
const SLEEP_EVENT_COLOR: &str = "9";

/// Errors returned by the calendar integration
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Google Calendar is not configured")]
    NotConfigured,

    #[error("Google Calendar not connected")]
    NotConnected,

    #[error("Google API request failed: {0}")]
    Network(String),

    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Google authorization failed: {0}")]
    Auth(String),

    #[error("Failed to parse Google response: {0}")]
    InvalidResponse(String),
}

impl CalendarError {
    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CalendarError::Network(_) => true,
            CalendarError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CalendarError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            CalendarError::InvalidResponse(error.to_string())
        } else {
            CalendarError::Network(error.to_string())
        }
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;

/// Start or end of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Request body for inserting or updating a sleep event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(rename = "colorId")]
    pub color_id: String,
    pub transparency: String,
}

impl SleepEvent {
    /// Build the event body for `session`, rendered in `timezone`
    pub fn from_session(session: &SleepSession, timezone: &str) -> Self {
        let tz: Tz = timezone.parse().unwrap_or(Tz::UTC);
        let quality = session
            .quality_label()
            .unwrap_or_else(|| "Not rated".to_string());

        Self {
            summary: format!("Sleep ({}h)", format_hours(session.duration_hours)),
            description: format!("Sleep Quality: {}\nNotes: {}", quality, session.notes),
            start: event_time(session.sleep_time, tz),
            end: event_time(session.wake_time, tz),
            color_id: SLEEP_EVENT_COLOR.to_string(),
            // Sleep should not block the user's free/busy time
            transparency: "transparent".to_string(),
        }
    }
}

fn event_time(instant: DateTime<Utc>, tz: Tz) -> EventDateTime {
    EventDateTime {
        date_time: Some(instant.with_timezone(&tz).to_rfc3339()),
        time_zone: Some(tz.name().to_string()),
    }
}

/// Hours with at least one decimal place, e.g. `8.0`, `7.25`
fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.1}", hours)
    } else {
        format!("{}", hours)
    }
}

/// An event as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// OAuth token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Only present when exchanging an authorization code
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<serde_json::Value>,
    error_description: Option<String>,
}

/// Calendar operations used by the sync service
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Exchange an OAuth authorization code for tokens
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> CalendarResult<TokenResponse>;

    /// Obtain a short-lived access token from a refresh token
    async fn refresh_access_token(&self, refresh_token: &str) -> CalendarResult<TokenResponse>;

    async fn insert_event(&self, access_token: &str, event: &SleepEvent)
        -> CalendarResult<CalendarEvent>;

    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &SleepEvent,
    ) -> CalendarResult<CalendarEvent>;

    /// Delete an event; an event that no longer exists counts as deleted
    async fn delete_event(&self, access_token: &str, event_id: &str) -> CalendarResult<()>;

    /// Upcoming events on the primary calendar, soonest first
    async fn list_upcoming_events(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> CalendarResult<Vec<CalendarEvent>>;
}

/// reqwest-backed Google Calendar client
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    config: GoogleCalendarConfig,
}

impl GoogleCalendarClient {
    pub fn new(config: GoogleCalendarConfig) -> CalendarResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CalendarError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn ensure_configured(&self) -> CalendarResult<()> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(CalendarError::NotConfigured);
        }
        Ok(())
    }

    /// `{api_base}/calendars/primary/events[/{event_id}]`
    fn events_url(&self, event_id: Option<&str>) -> CalendarResult<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| CalendarError::Network(format!("invalid API base URL: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalendarError::Network("API base URL cannot be a base".to_string()))?;
            segments.pop_if_empty().extend(["calendars", PRIMARY_CALENDAR, "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> CalendarResult<TokenResponse> {
        self.ensure_configured()?;

        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorBody>(&body)
                .ok()
                .and_then(|e| {
                    e.error_description
                        .or_else(|| e.error.map(|v| v.to_string()))
                })
                .unwrap_or(body);
            return if status.is_server_error() {
                Err(CalendarError::Api {
                    status: status.as_u16(),
                    message,
                })
            } else {
                Err(CalendarError::Auth(format!("token request failed ({}): {}", status, message)))
            };
        }

        Ok(response.json().await?)
    }

    async fn check(response: reqwest::Response) -> CalendarResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(CalendarError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> CalendarResult<TokenResponse> {
        debug!("Exchanging Google authorization code");
        self.request_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> CalendarResult<TokenResponse> {
        self.request_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn insert_event(
        &self,
        access_token: &str,
        event: &SleepEvent,
    ) -> CalendarResult<CalendarEvent> {
        let url = self.events_url(None)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &SleepEvent,
    ) -> CalendarResult<CalendarEvent> {
        let url = self.events_url(Some(event_id))?;
        let response = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> CalendarResult<()> {
        let url = self.events_url(Some(event_id))?;
        let response = self.http.delete(url).bearer_auth(access_token).send().await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!(event_id = %event_id, "Calendar event already removed");
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn list_upcoming_events(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> CalendarResult<Vec<CalendarEvent>> {
        let url = self.events_url(None)?;
        let time_min = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;

        let events: EventsResponse = Self::check(response).await?.json().await?;
        Ok(events.items)
    }
}
