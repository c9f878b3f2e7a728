use crate::auth::CredentialStore;
use crate::config::Config;
use chrono::{DateTime, Utc};

fn configured(value: Option<&str>) -> &'static str {
    if value.is_some_and(|v| !v.trim().is_empty()) {
        "set"
    } else {
        "missing"
    }
}

fn token_state(store: &CredentialStore, now: DateTime<Utc>) -> String {
    match store.load() {
        Ok(None) => "absent (run `taskpush login`)".into(),
        Ok(Some(record)) => {
            let refresh = if record.has_refresh_token() {
                ", refreshable"
            } else {
                ""
            };
            match record.expires_at {
                None => format!("present, no expiry{refresh}"),
                Some(at) if at <= now => format!("expired at {}{refresh}", at.to_rfc3339()),
                Some(at) => format!("valid until {}{refresh}", at.to_rfc3339()),
            }
        }
        Err(e) => format!("unreadable: {e}"),
    }
}

/// Human-readable overview for `taskpush status`. Never includes secrets.
pub fn render_status(config: &Config) -> String {
    render_status_at(config, Utc::now())
}

pub fn render_status_at(config: &Config, now: DateTime<Utc>) -> String {
    let token_path = config.resolved_token_path();
    let store = CredentialStore::from_config(config);

    let lines = [
        format!("◆ taskpush {}", env!("CARGO_PKG_VERSION")),
        String::new(),
        format!("  Config:        {}", config.config_path.display()),
        format!("  Token file:    {}", token_path.display()),
        format!("  Token:         {}", token_state(&store, now)),
        format!(
            "  Token storage: {}",
            if store.is_encrypted() { "encrypted" } else { "plaintext" }
        ),
        String::new(),
        format!("  Client id:     {}", configured(config.oauth.client_id.as_deref())),
        format!(
            "  Client secret: {}",
            configured(config.oauth.client_secret.as_deref())
        ),
        format!("  Redirect URI:  {}", config.oauth.redirect_uri),
        String::new(),
        format!("  Task API:      {}", config.tasks.api_base_url),
        format!("  Filter:        {}", config.tasks.filter),
        format!(
            "  Webhook:       {}",
            config
                .webhook
                .endpoint()
                .unwrap_or_else(|_| "plugin id missing".into())
        ),
        format!("  API key:       {}", configured(config.webhook.api_key.as_deref())),
        format!(
            "  Size ceiling:  {} bytes (undated tasks {:?})",
            config.compact.size_ceiling_bytes, config.compact.undated
        ),
    ];
    lines.join("\n")
}
