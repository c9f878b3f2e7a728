use super::Config;

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Secrets and deployment identifiers normally come from the environment
    /// (cron jobs, systemd units); they take precedence over config.toml.
    pub fn apply_env_overrides(&mut self) {
        if let Some(client_id) = non_empty_env("TODOIST_CLIENT_ID") {
            self.oauth.client_id = Some(client_id);
        }

        if let Some(client_secret) = non_empty_env("TODOIST_CLIENT_SECRET") {
            self.oauth.client_secret = Some(client_secret);
        }

        if let Some(redirect_uri) = non_empty_env("TASKPUSH_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }

        if let Some(api_key) = non_empty_env("TRMNL_API_KEY") {
            self.webhook.api_key = Some(api_key);
        }

        if let Some(plugin_id) = non_empty_env("TRMNL_PLUGIN_ID") {
            self.webhook.plugin_id = Some(plugin_id);
        }

        if let Some(filter) = non_empty_env("TASKPUSH_FILTER") {
            self.tasks.filter = filter;
        }

        if let Some(token_path) = non_empty_env("TASKPUSH_TOKEN_PATH") {
            self.token_path = token_path;
        }

        if let Some(ceiling) = non_empty_env("TASKPUSH_SIZE_CEILING") {
            match ceiling.parse::<usize>() {
                Ok(bytes) => self.compact.size_ceiling_bytes = bytes,
                Err(_) => tracing::warn!(
                    value = ceiling.as_str(),
                    "Ignoring TASKPUSH_SIZE_CEILING: not a byte count"
                ),
            }
        }

        if let Some(level) = non_empty_env("TASKPUSH_LOG_LEVEL") {
            self.log_level = level;
        }
    }
}
