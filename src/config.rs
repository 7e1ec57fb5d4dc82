//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the Telegram API retry constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Comma-separated list of allowed user IDs. Empty admits everyone.
    #[serde(rename = "allowed_users")]
    pub allowed_users_str: Option<String>,

    /// Chat that receives forwarded audit copies
    pub log_channel_id: Option<i64>,

    /// Directory for downloads and temporary uploads
    #[serde(default = "default_download_path")]
    pub download_path: String,

    /// Default auto-delete delay in seconds (0 disables)
    #[serde(default = "default_msg_delete_timeout")]
    pub msg_delete_timeout: u64,

    /// How long an unconsumed cancellation request is remembered
    #[serde(default = "default_cancel_ttl_secs")]
    pub cancel_ttl_secs: u64,
}

fn default_download_path() -> String {
    "downloads/".to_string()
}

const fn default_msg_delete_timeout() -> u64 {
    120
}

const fn default_cancel_ttl_secs() -> u64 {
    3600
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use userbot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP__MSG_DELETE_TIMEOUT=30 ./target/userbot`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain UPPER_SNAKE_CASE variables, empty ones treated as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns a set of Telegram IDs that are allowed to use the bot
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        self.allowed_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Download directory as a path
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.download_path)
    }

    /// Default auto-delete delay
    #[must_use]
    pub const fn msg_delete_timeout(&self) -> Duration {
        Duration::from_secs(self.msg_delete_timeout)
    }
}

/// Telegram API retry: initial backoff in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Telegram API retry: maximum backoff in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Telegram API retry: maximum number of attempts
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Telegram API flood control: how many server-requested waits to honour
pub const TELEGRAM_API_MAX_FLOOD_WAITS: usize = 2;
/// Telegram API flood control: longest server-requested wait, in seconds
pub const TELEGRAM_API_MAX_FLOOD_WAIT_SECS: u64 = 60;

/// Delay applied to error messages when the caller gives none
pub const ERROR_MSG_DELETE_TIMEOUT_SECS: u64 = 5;
