//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::quote::ArchivePolicy;

/// Default refresh cadence: one minute
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Quote backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_rate_path")]
    pub rate_path: String,

    #[serde(default = "default_archive_path")]
    pub archive_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:4943".to_string()
}

fn default_rate_path() -> String {
    "/trigger-manual-fetch".to_string()
}

fn default_archive_path() -> String {
    "/quote-archive".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            rate_path: default_rate_path(),
            archive_path: default_archive_path(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Refresh scheduling settings
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,

    #[serde(default)]
    pub archive_policy: ArchivePolicy,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
            archive_policy: ArchivePolicy::default(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

/// Chart and table presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_series_label")]
    pub series_label: String,

    /// strftime format for timestamp labels, rendered in local time
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_title() -> String {
    "ICP Price History".to_string()
}

fn default_series_label() -> String {
    "ICP Price (USD)".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            series_label: default_series_label(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("quoteboard").join("config.toml")),
            Some(PathBuf::from("./quoteboard.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("QUOTEBOARD_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(interval) = std::env::var("QUOTEBOARD_REFRESH_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => self.refresh.interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid QUOTEBOARD_REFRESH_INTERVAL_MS: {}", interval),
            }
        }
        if let Ok(policy) = std::env::var("QUOTEBOARD_ARCHIVE_POLICY") {
            match policy.parse() {
                Ok(p) => self.refresh.archive_policy = p,
                Err(e) => tracing::warn!("Ignoring QUOTEBOARD_ARCHIVE_POLICY: {}", e),
            }
        }

        if let Ok(level) = std::env::var("QUOTEBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("QUOTEBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Quoteboard Configuration
#
# Environment variables override these settings:
# - QUOTEBOARD_BACKEND_URL
# - QUOTEBOARD_REFRESH_INTERVAL_MS
# - QUOTEBOARD_ARCHIVE_POLICY
# - QUOTEBOARD_LOG_LEVEL
# - QUOTEBOARD_LOG_FORMAT

[backend]
# Base URL of the quote backend's HTTP gateway
url = "http://127.0.0.1:4943"

# Returns the freshest quote payload (POST)
rate_path = "/trigger-manual-fetch"

# Returns the archived quotes (GET)
archive_path = "/quote-archive"

# Request timeout in milliseconds
request_timeout_ms = 30000

[refresh]
# How often to refresh the rate and the history (ms)
interval_ms = 60000

# What to do with unparseable archive entries:
# all_or_nothing (keep the previous history) or skip_invalid
archive_policy = "all_or_nothing"

[display]
title = "ICP Price History"
series_label = "ICP Price (USD)"

# strftime format for timestamps, shown in local time
timestamp_format = "%Y-%m-%d %H:%M:%S"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/quoteboard/quoteboard.log"
"#
    .to_string()
}
