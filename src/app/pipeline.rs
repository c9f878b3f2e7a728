//! One scheduled run: token, fetch, compact, publish.

use crate::auth::{
    AuthorizationFlow, BrowserPresenter, CredentialStore, TokenEndpoint, TokenManager,
    UrlPresenter,
};
use crate::compact::{self, CompactOptions, CompactedPayload, SizeCeiling};
use crate::config::Config;
use crate::error::{Result, TaskpushError};
use crate::publish::{DeliveryResult, Publisher};
use crate::tasks::TaskFetcher;
use chrono::{DateTime, Local};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute the payload but do not post it.
    pub dry_run: bool,
    /// Allow the browser flow when no usable token is stored.
    pub interactive: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub payload: CompactedPayload,
    /// `None` for dry runs.
    pub delivery: Option<DeliveryResult>,
}

struct WebhookTarget {
    endpoint: String,
    api_key: String,
}

/// Token manager backed by the configured store and browser flow.
pub fn build_token_manager(
    config: &Config,
    interactive: bool,
    presenter: Arc<dyn UrlPresenter>,
) -> TokenManager {
    let store = CredentialStore::from_config(config);
    let flow = AuthorizationFlow::new(config.oauth.clone(), presenter);
    let refresher = match TokenEndpoint::from_config(&config.oauth) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            tracing::debug!(error = %e, "Token refresh unavailable");
            None
        }
    };

    TokenManager::new(store, Box::new(flow))
        .with_refresher(refresher)
        .interactive(interactive)
}

pub struct Pipeline {
    tokens: TokenManager,
    fetcher: TaskFetcher,
    publisher: Publisher,
    webhook: Option<WebhookTarget>,
    ceiling: SizeCeiling,
    compact_options: CompactOptions,
}

impl Pipeline {
    pub fn from_config(config: &Config, options: RunOptions) -> Result<Self> {
        Self::with_presenter(
            config,
            options,
            Arc::new(BrowserPresenter::new(config.oauth.open_browser)),
        )
    }

    /// Webhook settings are checked up front so a misconfigured run fails
    /// before it touches the network.
    pub fn with_presenter(
        config: &Config,
        options: RunOptions,
        presenter: Arc<dyn UrlPresenter>,
    ) -> Result<Self> {
        let webhook = if options.dry_run {
            None
        } else {
            Some(WebhookTarget {
                endpoint: config.webhook.endpoint()?,
                api_key: config.webhook.api_key()?.to_string(),
            })
        };

        Ok(Self {
            tokens: build_token_manager(config, options.interactive, presenter),
            fetcher: TaskFetcher::new(&config.tasks, &config.reliability)?,
            publisher: Publisher::new(&config.webhook)?,
            webhook,
            ceiling: config.compact.ceiling()?,
            compact_options: CompactOptions {
                undated: config.compact.undated,
                filter: config.tasks.filter.clone(),
            },
        })
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Local::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Local>) -> Result<RunReport> {
        let token = self.tokens.obtain_valid_token().await?;

        let tasks = match self.fetcher.fetch_tasks(&token).await {
            Ok(tasks) => tasks,
            Err(e) if e.is_unauthorized() => {
                tracing::error!(
                    error = %e,
                    "Task API rejected the stored token; run `taskpush login` to re-authorize"
                );
                return Err(TaskpushError::RemoteApi(e));
            }
            Err(e) => return Err(TaskpushError::RemoteApi(e)),
        };

        let payload = compact::compact(&tasks, self.ceiling, &self.compact_options, now);

        let Some(webhook) = &self.webhook else {
            tracing::info!("Dry run, payload not posted");
            return Ok(RunReport {
                payload,
                delivery: None,
            });
        };

        let delivery = self
            .publisher
            .publish(&payload, &webhook.endpoint, &webhook.api_key)
            .await;
        if delivery.is_success() {
            tracing::info!(status = ?delivery.status_code, message = delivery.message.as_str(), "Tasks sent to display");
        } else {
            tracing::warn!(status = ?delivery.status_code, message = delivery.message.as_str(), "Display webhook delivery failed");
        }

        Ok(RunReport {
            payload,
            delivery: Some(delivery),
        })
    }
}
