use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// App client id (usually supplied via `TODOIST_CLIENT_ID`)
    #[serde(default)]
    pub client_id: Option<String>,
    /// App client secret (usually supplied via `TODOIST_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Must match the redirect registered with the app; the callback
    /// listener binds this host and port.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// How long to wait for the browser redirect before giving up.
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
    /// Timeout for token exchange / refresh calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Try to launch the system browser with the authorize URL.
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

fn default_authorize_url() -> String {
    "https://todoist.com/oauth/authorize".into()
}

fn default_token_url() -> String {
    "https://todoist.com/oauth/access_token".into()
}

fn default_redirect_uri() -> String {
    "http://localhost:8080/callback".into()
}

fn default_scopes() -> Vec<String> {
    vec!["data:read".into()]
}

fn default_callback_timeout_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            callback_timeout_secs: default_callback_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            open_browser: true,
        }
    }
}

impl OAuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("oauth.authorize_url", &self.authorize_url),
            ("oauth.token_url", &self.token_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Validation(format!("{name} '{value}' is invalid: {e}")))?;
        }

        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            ConfigError::Validation(format!(
                "oauth.redirect_uri '{}' is invalid: {e}",
                self.redirect_uri
            ))
        })?;
        if redirect.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "oauth.redirect_uri must use http:// for the local listener, got '{}'",
                redirect.scheme()
            )));
        }
        if redirect.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Validation(
                "oauth.redirect_uri must name a host".into(),
            ));
        }
        if redirect.port().is_none() {
            return Err(ConfigError::Validation(format!(
                "oauth.redirect_uri '{}' must include an explicit port",
                self.redirect_uri
            )));
        }

        if self.callback_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "oauth.callback_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "oauth.request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Client credentials, required only when talking to the token endpoint.
    pub fn client_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation("oauth client id missing (set TODOIST_CLIENT_ID)".into())
            })?;
        let secret = self
            .client_secret
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "oauth client secret missing (set TODOIST_CLIENT_SECRET)".into(),
                )
            })?;
        Ok((id, secret))
    }
}
