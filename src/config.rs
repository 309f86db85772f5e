// ⚙️ Runtime configuration for the tutor-schedule binary
//
// Read from an optional TOML file, then overridden by environment variables.
// The scheduling core never reads this; it only gets explicit handles.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "TUTOR_DB_PATH";
pub const ENV_DEMO_MODE: &str = "TUTOR_DEMO_MODE";
pub const ENV_LOG: &str = "TUTOR_LOG";
pub const ENV_WEEK_START: &str = "TUTOR_WEEK_START";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,

    /// Use the built-in event source and log-only notifier
    pub demo_mode: bool,

    /// tracing-subscriber filter directive, e.g. "info" or "tutor_schedule=debug"
    pub log_filter: String,

    /// Monday anchoring the week to schedule; None = current week
    pub week_start: Option<NaiveDate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("tutor_schedule.db"),
            demo_mode: true,
            log_filter: "info".to_string(),
            week_start: None,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then `path` if it exists, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }

        if let Some(demo) = lookup(ENV_DEMO_MODE) {
            self.demo_mode = demo.trim().eq_ignore_ascii_case("true");
        }

        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }

        if let Some(week) = lookup(ENV_WEEK_START) {
            let date = NaiveDate::parse_from_str(week.trim(), "%Y-%m-%d")
                .with_context(|| format!("{} must be YYYY-MM-DD, got '{}'", ENV_WEEK_START, week))?;
            self.week_start = Some(date);
        }

        Ok(())
    }
}
