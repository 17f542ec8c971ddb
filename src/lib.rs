pub mod api;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod services;
pub mod store;

/// Embedded migrations, applied at startup and by the test harness.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
