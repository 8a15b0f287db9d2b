//! Configuration module for Outpost.

use serde::Deserialize;
use std::path::Path;

use crate::{OutpostError, Result};

/// SMTP relay configuration.
///
/// When `username`/`password` are absent the dispatcher runs in simulated
/// mode and never contacts a relay.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname.
    #[serde(default = "default_smtp_host")]
    pub host: String,
    /// Relay port. 465 selects implicit TLS, anything else STARTTLS.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Username for relay authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for relay authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Default From / Reply-To address. Falls back to `username`.
    #[serde(default)]
    pub from_address: Option<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u64 {
    10
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from_address: None,
            timeout_secs: default_smtp_timeout(),
        }
    }
}

impl SmtpConfig {
    /// Whether full relay credentials are present.
    pub fn has_credentials(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }

    /// The sender address to stamp on outbound mail.
    pub fn effective_from(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/outpost.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/outpost.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Rate limit configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// Maximum sends per user per window.
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_per_window() -> u32 {
    50
}

fn default_window_secs() -> u64 {
    3600
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// SMTP relay settings.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Send rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(OutpostError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| OutpostError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported variables: `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`,
    /// `SMTP_PASS`, `EMAIL_FROM`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = non_empty_env("SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = non_empty_env("SMTP_PORT") {
            if let Ok(port) = port.parse() {
                self.smtp.port = port;
            }
        }
        if let Some(user) = non_empty_env("SMTP_USER") {
            self.smtp.username = Some(user);
        }
        if let Some(pass) = non_empty_env("SMTP_PASS") {
            self.smtp.password = Some(pass);
        }
        if let Some(from) = non_empty_env("EMAIL_FROM") {
            self.smtp.from_address = Some(from);
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if credentials are half-configured (only one of
    /// username/password set) or if the rate limit window is zero.
    pub fn validate(&self) -> Result<()> {
        let user_set = self.smtp.username.as_deref().is_some_and(|s| !s.is_empty());
        let pass_set = self.smtp.password.as_deref().is_some_and(|s| !s.is_empty());
        if user_set != pass_set {
            return Err(OutpostError::Config(
                "smtp username and password must both be set or both be absent".to_string(),
            ));
        }

        if self.rate_limit.window_secs == 0 {
            return Err(OutpostError::Config(
                "rate_limit window_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
