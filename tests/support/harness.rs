#![allow(dead_code)]

use std::net::TcpListener;

use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

use taskpush::auth::UrlPresenter;
use taskpush::config::{
    CompactConfig, Config, OAuthConfig, ReliabilityConfig, TasksConfig, WebhookConfig,
};
use taskpush::tasks::{Due, TaskRecord};

pub const CLIENT_ID: &str = "client-123";
pub const CLIENT_SECRET: &str = "secret-456";
pub const PLUGIN_ID: &str = "plugin-789";
pub const API_KEY: &str = "trmnl-key";

/// A loopback port that was free a moment ago.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|addr| addr.port())
        .expect("allocate loopback port")
}

pub fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

pub fn oauth_config(token_server: &str, port: u16) -> OAuthConfig {
    OAuthConfig {
        client_id: Some(CLIENT_ID.into()),
        client_secret: Some(CLIENT_SECRET.into()),
        token_url: format!("{token_server}/oauth/access_token"),
        redirect_uri: format!("http://127.0.0.1:{port}/callback"),
        callback_timeout_secs: 5,
        request_timeout_secs: 5,
        open_browser: false,
        ..OAuthConfig::default()
    }
}

/// Full config pointing every remote at `server`, with the token file in `dir`.
pub fn config_for(server: &str, dir: &TempDir) -> Config {
    Config {
        config_path: dir.path().join("config.toml"),
        token_path: dir.path().join("access_token.json").display().to_string(),
        oauth: oauth_config(server, free_port()),
        tasks: TasksConfig {
            api_base_url: server.to_string(),
            request_timeout_secs: 5,
            ..TasksConfig::default()
        },
        webhook: WebhookConfig {
            base_url: format!("{server}/api/custom_plugins"),
            plugin_id: Some(PLUGIN_ID.into()),
            api_key: Some(API_KEY.into()),
            request_timeout_secs: 5,
        },
        compact: CompactConfig::default(),
        reliability: ReliabilityConfig {
            fetch_retries: 2,
            fetch_backoff_ms: 10,
        },
        ..Config::default()
    }
}

pub fn task_json(id: &str, content: &str, due: Option<&str>, priority: u8, project: &str) -> Value {
    let due = due.map(|date| json!({"date": date, "string": date, "is_recurring": false}));
    json!({
        "id": id,
        "content": content,
        "priority": priority,
        "project_id": project,
        "labels": [],
        "due": due,
    })
}

pub fn task(id: &str, content: &str, due: Option<&str>, priority: u8) -> TaskRecord {
    TaskRecord {
        id: id.into(),
        content: content.into(),
        due: due.map(|date| Due {
            date: date.into(),
            string: None,
            is_recurring: false,
            timezone: None,
        }),
        priority,
        project_id: Some("p1".into()),
        labels: Vec::new(),
        project_name: Some("Home".into()),
    }
}

/// Stands in for the user's browser: as soon as the authorize URL is shown,
/// it follows the redirect with the given code and either the real or a
/// forged state.
pub struct SimulatedBrowser {
    code: String,
    forged_state: Option<String>,
}

impl SimulatedBrowser {
    pub fn approving(code: &str) -> Self {
        Self {
            code: code.into(),
            forged_state: None,
        }
    }

    pub fn forging_state(code: &str, state: &str) -> Self {
        Self {
            forged_state: Some(state.into()),
            ..Self::approving(code)
        }
    }
}

impl UrlPresenter for SimulatedBrowser {
    fn present(&self, authorize_url: &Url) {
        let params: std::collections::HashMap<String, String> =
            authorize_url.query_pairs().into_owned().collect();
        let state = self
            .forged_state
            .clone()
            .unwrap_or_else(|| params["state"].clone());
        let mut callback = Url::parse(&params["redirect_uri"]).expect("redirect uri");
        callback
            .query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &state);

        tokio::spawn(async move {
            if let Err(e) = reqwest::get(callback).await {
                eprintln!("simulated browser request failed: {e}");
            }
        });
    }
}

/// Shows nothing and never completes the redirect.
pub struct AbsentUser;

impl UrlPresenter for AbsentUser {
    fn present(&self, _authorize_url: &Url) {}
}
