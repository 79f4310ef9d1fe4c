//! Database layer
//!
//! SQLite persistence through SQLx. Each table gets its own module that adds
//! repository methods to [`DatabaseManager`].

pub mod admin;
pub mod connection;
pub mod goals;
pub mod reminders;
pub mod sleep_sessions;
pub mod statistics;
pub mod users;

pub use admin::{AdminFilter, AdminRecord};
pub use connection::DatabaseManager;
pub use sleep_sessions::SleepTimeRange;
