use super::super::{CompactConfig, OAuthConfig, TasksConfig, WebhookConfig};
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

/// Directory under `$HOME` holding config and the stored token.
pub(super) const APP_DIR_NAME: &str = ".taskpush";
pub(super) const CONFIG_FILE_NAME: &str = "config.toml";
const TOKEN_FILE_NAME: &str = "access_token.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where the token record is persisted; `~` is expanded.
    #[serde(default = "default_token_path")]
    pub token_path: String,

    #[serde(default)]
    pub oauth: OAuthConfig,

    #[serde(default)]
    pub tasks: TasksConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub compact: CompactConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_token_path() -> String {
    format!("~/{APP_DIR_NAME}/{TOKEN_FILE_NAME}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Extra attempts for transient task-API failures (5xx, 408, 429, transport).
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default = "default_fetch_backoff_ms")]
    pub fetch_backoff_ms: u64,
}

fn default_fetch_retries() -> u32 {
    2
}

fn default_fetch_backoff_ms() -> u64 {
    500
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            fetch_retries: default_fetch_retries(),
            fetch_backoff_ms: default_fetch_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Seal stored tokens with a local key (`ENC:` values in the token file)
    #[serde(default = "default_true")]
    pub encrypt: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self { encrypt: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(APP_DIR_NAME).join(CONFIG_FILE_NAME),
            log_level: default_log_level(),
            token_path: default_token_path(),
            oauth: OAuthConfig::default(),
            tasks: TasksConfig::default(),
            webhook: WebhookConfig::default(),
            compact: CompactConfig::default(),
            reliability: ReliabilityConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Config {
    /// Token file location with `~` expanded.
    pub fn resolved_token_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.token_path).into_owned())
    }

    /// Parsed `log_level`, falling back to INFO for unknown values.
    pub fn tracing_level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Structural validation that does not depend on which stage runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_path.trim().is_empty() {
            return Err(ConfigError::Validation("token_path cannot be empty".into()));
        }
        self.oauth.validate()?;
        self.tasks.validate()?;
        self.webhook.validate()?;
        self.compact.validate()?;
        Ok(())
    }
}
