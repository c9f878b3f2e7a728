//! Delivery of the compacted payload to the display webhook.

use crate::compact::CompactedPayload;
use crate::config::WebhookConfig;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Outcome of one delivery attempt. `status_code` is `None` when no HTTP
/// response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub status_code: Option<u16>,
    pub message: String,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        self.status_code.is_some_and(|code| (200..300).contains(&code))
    }
}

impl fmt::Display for DeliveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "HTTP {code}: {}", self.message),
            None => write!(f, "not delivered: {}", self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

pub struct Publisher {
    client: Client,
}

impl Publisher {
    pub fn new(config: &WebhookConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build webhook http client")?;
        Ok(Self { client })
    }

    /// POST the payload once. Never retries and never returns an error;
    /// every failure is described by the returned result.
    pub async fn publish(
        &self,
        payload: &CompactedPayload,
        endpoint: &str,
        api_key: &str,
    ) -> DeliveryResult {
        let body = match payload.body_bytes() {
            Ok(body) => body,
            Err(e) => {
                return DeliveryResult {
                    status_code: None,
                    message: format!("failed to serialize payload: {e}"),
                };
            }
        };
        tracing::debug!(bytes = body.len(), tasks = payload.tasks().len(), "Posting payload to webhook");

        let response = match self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(api_key)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return DeliveryResult {
                    status_code: None,
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("");
        DeliveryResult {
            status_code: Some(status.as_u16()),
            message: describe_reply(response.text().await, reason),
        }
    }
}

/// Message for a reply whose body may not have been readable. A read failure
/// keeps the error text rather than reporting an empty reply.
fn describe_reply(body: Result<String, impl fmt::Display>, reason: &str) -> String {
    match body {
        Ok(text) => reply_message(&text, reason),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read webhook reply body");
            if reason.is_empty() {
                format!("failed to read reply body: {e}")
            } else {
                format!("{reason} (failed to read reply body: {e})")
            }
        }
    }
}

/// The JSON `message` field when the reply has one, else the raw body.
fn reply_message(body: &str, fallback: &str) -> String {
    if let Ok(reply) = serde_json::from_str::<WebhookReply>(body) {
        if let Some(message) = reply.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
        if let Some(status) = reply.status {
            return status.as_str().map_or_else(|| status.to_string(), str::to_string);
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
