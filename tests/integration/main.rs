//! HTTP-level integration tests for the AmbiDream API

mod common;

mod admin_api;
mod auth_api;
mod calendar_sync;
mod profiles_api;
mod reminders_api;
mod sleep_sessions_api;
mod statistics_api;
