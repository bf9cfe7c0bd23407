//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/habitrack/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/habitrack/` (~/.config/habitrack/)
//! - Data: `$XDG_DATA_HOME/habitrack/` (~/.local/share/habitrack/)
//! - State/Logs: `$XDG_STATE_HOME/habitrack/` (~/.local/state/habitrack/)

use crate::error::{Error, Result};
use chrono::{FixedOffset, Local, Offset};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the database location.
pub const DB_PATH_ENV: &str = "HABITRACK_DB";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the stats derivation engine
#[derive(Debug, Deserialize)]
pub struct AnalyticsConfig {
    /// Rolling window (days) for the completion rate
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Number of days shown by the daily trend
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,

    /// Fixed UTC offset used to decide calendar days. Local offset when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            trend_days: default_trend_days(),
            utc_offset_minutes: None,
        }
    }
}

impl AnalyticsConfig {
    /// Resolve the timezone offset used for day bucketing.
    pub fn offset(&self) -> Result<FixedOffset> {
        match self.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                Error::Config(format!(
                    "analytics.utc_offset_minutes out of range: {}",
                    minutes
                ))
            }),
            None => Ok(Local::now().offset().fix()),
        }
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RANGE_DAYS).contains(&self.window_days) {
            return Err(Error::Config(format!(
                "analytics.window_days must be between 1 and {}",
                MAX_RANGE_DAYS
            )));
        }
        if !(1..=MAX_RANGE_DAYS).contains(&self.trend_days) {
            return Err(Error::Config(format!(
                "analytics.trend_days must be between 1 and {}",
                MAX_RANGE_DAYS
            )));
        }
        self.offset().map(|_| ())
    }
}

fn default_window_days() -> u32 {
    30
}

fn default_trend_days() -> u32 {
    7
}

/// Longest day range accepted for rate windows, trends and category reports.
pub const MAX_RANGE_DAYS: u32 = 366;

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analytics.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/habitrack/config.toml` (~/.config/habitrack/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("habitrack").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/habitrack/` (~/.local/share/habitrack/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("habitrack")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/habitrack/` (~/.local/state/habitrack/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("habitrack")
    }

    /// Returns the database file path
    ///
    /// `$HABITRACK_DB` when set, otherwise
    /// `$XDG_DATA_HOME/habitrack/habitrack.db` (~/.local/share/habitrack/habitrack.db)
    pub fn database_path() -> PathBuf {
        std::env::var_os(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::data_dir().join("habitrack.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.window_days, 30);
        assert_eq!(config.analytics.trend_days, 7);
        assert!(config.analytics.utc_offset_minutes.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.analytics.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analytics]
window_days = 14
trend_days = 30
utc_offset_minutes = -300

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analytics.window_days, 14);
        assert_eq!(config.analytics.trend_days, 30);
        assert_eq!(
            config.analytics.offset().unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_analytics_validation() {
        let config = AnalyticsConfig {
            window_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyticsConfig {
            window_days: 200_000_000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = AnalyticsConfig {
            window_days: MAX_RANGE_DAYS,
            trend_days: MAX_RANGE_DAYS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = AnalyticsConfig {
            utc_offset_minutes: Some(24 * 60),
            ..Default::default()
        };
        assert!(matches!(config.offset(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_rejects_invalid_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analytics]\nwindow_days = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
