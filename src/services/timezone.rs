//! Timezone helpers
//!
//! Profiles store IANA timezone names. Reminders fire on local wall-clock
//! time, so every lookup goes through [`resolve_timezone`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// Errors that can occur during timezone operations
#[derive(Debug, thiserror::Error)]
pub enum TimezoneError {
    #[error("Timezone cannot be empty")]
    Empty,

    #[error("Invalid timezone identifier: {timezone}")]
    InvalidTimezone { timezone: String },
}

/// Parse an IANA timezone identifier
///
/// # Arguments
/// * `timezone` - The timezone string to parse, e.g. `Europe/Paris`
///
/// # Returns
/// `Ok(Tz)` if the identifier is known, `Err(TimezoneError)` otherwise
pub fn parse_timezone(timezone: &str) -> Result<Tz, TimezoneError> {
    let timezone = timezone.trim();
    if timezone.is_empty() {
        return Err(TimezoneError::Empty);
    }

    timezone
        .parse::<Tz>()
        .map_err(|_| TimezoneError::InvalidTimezone {
            timezone: timezone.to_string(),
        })
}

/// Validate a timezone for user input, returning a displayable message
pub fn validate_timezone(timezone: &str) -> Result<(), String> {
    parse_timezone(timezone).map(|_| ()).map_err(|e| e.to_string())
}

/// Parse a stored timezone, falling back to UTC for unknown values
pub fn resolve_timezone(timezone: &str) -> Tz {
    parse_timezone(timezone).unwrap_or_else(|e| {
        tracing::warn!(timezone = %timezone, error = %e, "Falling back to UTC");
        Tz::UTC
    })
}

/// Wall-clock time in the given timezone
pub fn local_time(now: DateTime<Utc>, timezone: Tz) -> NaiveTime {
    now.with_timezone(&timezone).time()
}

/// Calendar date in the given timezone
pub fn local_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}
