//! Third-party integrations: Google Calendar and SMTP e-mail

pub mod google_calendar;
pub mod mailer;

pub use google_calendar::{CalendarError, CalendarProvider, GoogleCalendarClient, SleepEvent};
pub use mailer::{build_mailer, EmailMessage, LogMailer, Mailer, MemoryMailer, SmtpMailer};
