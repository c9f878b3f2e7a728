//! Token endpoint client: authorization-code exchange and refresh grant.

use super::store::TokenRecord;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration as StdDuration;
use url::Url;

/// Upper bound on how much of an error body is carried into `AuthError`.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_record(self, now: DateTime<Utc>) -> Result<TokenRecord, AuthError> {
        let access_token = self.access_token.trim().to_string();
        if access_token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "access_token is empty".into(),
            ));
        }

        Ok(TokenRecord {
            access_token,
            refresh_token: self
                .refresh_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            token_type: self.token_type,
            expires_at: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
            scope: self.scope,
        })
    }
}

#[derive(Clone)]
pub struct TokenEndpoint {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEndpoint")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl TokenEndpoint {
    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        let (client_id, client_secret) = config
            .client_credentials()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuthError::Network(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Trade an authorization code for a token record.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &Url,
    ) -> Result<TokenRecord, AuthError> {
        tracing::debug!(url = self.token_url.as_str(), "Exchanging authorization code");
        self.post_grant(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Run the refresh grant. The returned record keeps the old refresh
    /// token when the server does not rotate it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, AuthError> {
        tracing::debug!(url = self.token_url.as_str(), "Refreshing access token");
        let mut record = self
            .post_grant(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        if record.refresh_token.is_none() {
            record.refresh_token = Some(refresh_token.to_string());
        }
        Ok(record)
    }

    async fn post_grant(&self, form: &[(&str, &str)]) -> Result<TokenRecord, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            tracing::warn!(status = status.as_u16(), "Token endpoint rejected the grant");
            return Err(AuthError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        let record = parsed.into_record(Utc::now())?;
        tracing::info!(token = %record.redacted(), "Token endpoint issued an access token");
        Ok(record)
    }
}
