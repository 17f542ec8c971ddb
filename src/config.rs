use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[serde(default = "Config::default_bind_addr")]
    pub bind_addr: String,
    /// SQLite connection string.
    #[serde(default = "Config::default_database_url")]
    pub database_url: String,
    /// Timetable document imported once at startup. Missing file is
    /// logged and skipped, not fatal.
    #[serde(default = "Config::default_schedule_file")]
    pub schedule_file: String,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn default_bind_addr() -> String {
        "0.0.0.0:3000".to_string()
    }

    fn default_database_url() -> String {
        "sqlite:database/data.db?mode=rwc".to_string()
    }

    fn default_schedule_file() -> String {
        "schedules.json".to_string()
    }
}
