use crate::config::Config;
use crate::security::SecretStore;
use crate::security::secrets::{self, KEY_FILE_NAME};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persisted OAuth token.
///
/// Replaced wholesale on every new authorization or refresh; fields are never
/// patched in place on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &self.redacted())
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenRecord {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: None,
            expires_at: None,
            scope: None,
        }
    }

    /// Known to be expired at `now`, allowing `skew` of safety margin.
    /// A record without an expiry is never known-expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= now + skew)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// First few characters of the access token, for log lines.
    pub fn redacted(&self) -> String {
        redact(&self.access_token)
    }
}

pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    format!("{prefix}...")
}

/// File-backed credential store holding a single [`TokenRecord`].
///
/// Access and refresh tokens are sealed with a [`SecretStore`] whose key
/// lives next to the token file. Plain (legacy or unencrypted) files still
/// load, and are resealed on load when encryption is on.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    secrets: SecretStore,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(KEY_FILE_NAME);
        Self {
            path,
            secrets: SecretStore::new(key_path, true),
        }
    }

    /// Store at the configured token path, honouring `[secrets] encrypt`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolved_token_path()).encrypted(config.secrets.encrypt)
    }

    #[must_use]
    pub fn encrypted(mut self, enabled: bool) -> Self {
        self.secrets = SecretStore::new(self.secrets.key_path(), enabled);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_encrypted(&self) -> bool {
        self.secrets.is_enabled()
    }

    /// Load the stored record. A missing file, or one whose access token is
    /// blank, yields `None`; an unreadable or corrupt file is an error.
    pub fn load(&self) -> Result<Option<TokenRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        let mut record: TokenRecord = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse token file: {}", self.path.display()))?;

        if record.access_token.trim().is_empty() {
            tracing::warn!(path = %self.path.display(), "Stored token is blank, ignoring");
            return Ok(None);
        }

        let mut access = Some(record.access_token);
        let mut needs_reseal = self.secrets.open_option(&mut access)?;
        record.access_token = access.unwrap_or_default();
        needs_reseal |= self.secrets.open_option(&mut record.refresh_token)?;

        if needs_reseal {
            if let Err(e) = self.save(&record) {
                let error = format!("{e:#}");
                tracing::warn!(error = error.as_str(), "Could not seal plaintext token file");
            } else {
                tracing::info!(path = %self.path.display(), "Sealed plaintext token file");
            }
        }

        Ok(Some(record))
    }

    /// Replace the stored record. Written to a sibling temp file and renamed
    /// over the old one so a crash never leaves a half-written token.
    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create token store parent directory: {}",
                parent.display()
            )
        })?;

        let mut sealed = record.clone();
        let mut access = Some(sealed.access_token);
        self.secrets.seal_option(&mut access)?;
        sealed.access_token = access.unwrap_or_default();
        self.secrets.seal_option(&mut sealed.refresh_token)?;

        let json = serde_json::to_string_pretty(&sealed)?;
        let tmp_path = self.path.with_extension("json.tmp");
        if tmp_path.exists() {
            fs::remove_file(&tmp_path).with_context(|| {
                format!("Failed to remove stale token file: {}", tmp_path.display())
            })?;
        }

        let mut file = secrets::create_owner_only(&tmp_path, true)
            .with_context(|| format!("Failed to create token file: {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write token file: {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace token file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), token = %record.redacted(), "Token saved");
        Ok(())
    }

    /// Remove the stored record. Returns whether a file existed. The key file
    /// is kept so other sealed copies stay readable.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove token file: {}", self.path.display()))?;
        Ok(true)
    }
}
