use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Plugin webhook root; the plugin id is appended as the last segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Private plugin id (usually supplied via `TRMNL_PLUGIN_ID`)
    #[serde(default)]
    pub plugin_id: Option<String>,
    /// Account API key (usually supplied via `TRMNL_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://usetrmnl.com/api/custom_plugins".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            plugin_id: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!(
                "webhook.base_url '{}' is invalid: {e}",
                self.base_url
            ))
        })?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "webhook.request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Full webhook URL for the configured plugin.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let plugin_id = self
            .plugin_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation("webhook plugin id missing (set TRMNL_PLUGIN_ID)".into())
            })?;
        Ok(format!("{}/{plugin_id}", self.base_url.trim_end_matches('/')))
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation("webhook api key missing (set TRMNL_API_KEY)".into())
            })
    }
}
