//! One authorization attempt's in-memory state.
//!
//! A session is created with a fresh random `state` nonce, handed to the
//! authorization flow by value and dropped when the flow finishes. It is
//! intentionally not `Serialize`: nothing about an in-flight attempt is ever
//! written to disk.

use crate::error::AuthError;
use std::fmt;
use url::Url;

/// Bytes of randomness in the CSRF `state` nonce (hex encoded on the wire).
const STATE_NONCE_BYTES: usize = 32;

pub struct AuthorizationSession {
    state: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    code: Option<String>,
    returned_state: Option<String>,
}

impl AuthorizationSession {
    pub fn new(redirect_uri: Url, scopes: Vec<String>) -> Self {
        Self {
            state: generate_state_nonce(),
            redirect_uri,
            scopes,
            code: None,
            returned_state: None,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Authorization endpoint URL carrying client id, scope, state and redirect.
    pub fn authorize_url(&self, authorize_endpoint: &str, client_id: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(authorize_endpoint).map_err(|e| {
            AuthError::Config(format!("authorize url '{authorize_endpoint}' is invalid: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("scope", &self.scopes.join(","))
            .append_pair("state", &self.state)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("response_type", "code");
        Ok(url)
    }

    /// Record what the callback delivered.
    pub fn record_callback(&mut self, code: Option<String>, returned_state: Option<String>) {
        self.code = code;
        self.returned_state = returned_state;
    }

    /// Constant-time comparison of the echoed state with our nonce.
    /// A missing echo never matches.
    pub fn state_matches(&self) -> bool {
        self.returned_state
            .as_deref()
            .is_some_and(|returned| constant_time_eq(returned, &self.state))
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }
}

impl fmt::Debug for AuthorizationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationSession")
            .field("state", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .field("code_received", &self.code.is_some())
            .finish()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn generate_state_nonce() -> String {
    use rand::RngCore;
    let mut buf = [0u8; STATE_NONCE_BYTES];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
