use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Task API root (default: https://api.todoist.com)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Server-side filter expression, passed through verbatim
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on cursor pages followed per listing
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_api_base_url() -> String {
    "https://api.todoist.com".into()
}

fn default_filter() -> String {
    "today | overdue".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    50
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            filter: default_filter(),
            request_timeout_secs: default_request_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

impl TasksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base_url).map_err(|e| {
            ConfigError::Validation(format!(
                "tasks.api_base_url '{}' is invalid: {e}",
                self.api_base_url
            ))
        })?;
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Validation("tasks.filter cannot be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tasks.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Validation(
                "tasks.max_pages must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
