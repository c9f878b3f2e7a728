use super::endpoint::TokenEndpoint;
use super::store::{CredentialStore, TokenRecord};
use crate::error::AuthError;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use std::future::Future;
use std::pin::Pin;

/// Safety margin applied when deciding whether a stored token has expired.
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 60;

/// Something that can produce a brand-new token record, usually by putting a
/// human through the browser flow.
pub trait Authorizer: Send + Sync {
    fn authorize(&self) -> Pin<Box<dyn Future<Output = Result<TokenRecord, AuthError>> + Send + '_>>;
}

/// Hands out a usable access token for the current run.
///
/// Order of preference: stored and unexpired, refreshed, then a fresh
/// interactive authorization (unless interaction is disabled).
pub struct TokenManager {
    store: CredentialStore,
    authorizer: Box<dyn Authorizer>,
    refresher: Option<TokenEndpoint>,
    interactive: bool,
    skew: Duration,
}

impl TokenManager {
    pub fn new(store: CredentialStore, authorizer: Box<dyn Authorizer>) -> Self {
        Self {
            store,
            authorizer,
            refresher: None,
            interactive: true,
            skew: Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS),
        }
    }

    #[must_use]
    pub fn with_refresher(mut self, refresher: Option<TokenEndpoint>) -> Self {
        self.refresher = refresher;
        self
    }

    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub async fn obtain_valid_token(&self) -> Result<SecretString, AuthError> {
        let stored = self
            .store
            .load()
            .map_err(|e| AuthError::Store(format!("{e:#}")))?;

        if let Some(record) = stored {
            if !record.is_expired_at(Utc::now(), self.skew) {
                tracing::info!(token = %record.redacted(), "Using stored access token");
                return Ok(SecretString::from(record.access_token));
            }

            tracing::info!("Stored access token has expired");
            if let Some(refreshed) = self.try_refresh(&record).await {
                return Ok(refreshed);
            }
        } else {
            tracing::info!(path = %self.store.path().display(), "No stored access token");
        }

        if !self.interactive {
            return Err(AuthError::InteractionRequired);
        }
        self.reauthorize().await
    }

    /// Run the authorization flow unconditionally and replace the stored
    /// record with the result.
    pub async fn reauthorize(&self) -> Result<SecretString, AuthError> {
        let record = self.authorizer.authorize().await?;
        self.persist(&record)?;
        Ok(SecretString::from(record.access_token))
    }

    async fn try_refresh(&self, record: &TokenRecord) -> Option<SecretString> {
        if !record.has_refresh_token() {
            return None;
        }
        let refresh_token = record.refresh_token.as_deref()?;
        let Some(refresher) = self.refresher.as_ref() else {
            tracing::debug!("No token endpoint configured for refresh");
            return None;
        };

        match refresher.refresh(refresh_token).await {
            Ok(new_record) => {
                // Used for this run even when it cannot be stored.
                if let Err(e) = self.persist(&new_record) {
                    tracing::warn!(
                        error = %e,
                        "Refreshed token could not be stored; using it for this run only"
                    );
                } else {
                    tracing::info!(token = %new_record.redacted(), "Access token refreshed");
                }
                Some(SecretString::from(new_record.access_token))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    fn persist(&self, record: &TokenRecord) -> Result<(), AuthError> {
        self.store
            .save(record)
            .map_err(|e| AuthError::Store(format!("{e:#}")))
    }
}
