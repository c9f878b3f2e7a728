//! Interactive authorization-code flow.
//!
//! One call to [`AuthorizationFlow::run`] drives a single session through
//! `Idle -> AwaitingRedirect -> CodeReceived -> Exchanging -> Complete`.
//! Any failure lands in `Failed`; the flow never retries on its own and never
//! persists anything. Persisting the resulting record is the token manager's
//! job.

use super::callback::{CallbackListener, RedirectTarget};
use super::endpoint::TokenEndpoint;
use super::manager::Authorizer;
use super::session::AuthorizationSession;
use super::store::TokenRecord;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingRedirect,
    CodeReceived,
    Exchanging,
    Complete,
    Failed,
}

impl FlowState {
    /// Allowed edges of the flow. `Failed` is reachable from every
    /// non-terminal state.
    pub fn can_transition_to(self, next: Self) -> bool {
        use FlowState::{AwaitingRedirect, CodeReceived, Complete, Exchanging, Failed, Idle};
        matches!(
            (self, next),
            (Idle, AwaitingRedirect)
                | (AwaitingRedirect, CodeReceived)
                | (CodeReceived, Exchanging)
                | (Exchanging, Complete)
                | (Idle | AwaitingRedirect | CodeReceived | Exchanging, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingRedirect => "awaiting_redirect",
            Self::CodeReceived => "code_received",
            Self::Exchanging => "exchanging",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shows the authorize URL to whoever is at the keyboard.
///
/// Called only after the callback listener is bound, so an implementation may
/// immediately drive the redirect.
pub trait UrlPresenter: Send + Sync {
    fn present(&self, authorize_url: &Url);
}

/// Prints the URL and, when enabled, asks the OS to open it.
pub struct BrowserPresenter {
    open_browser: bool,
}

impl BrowserPresenter {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

impl UrlPresenter for BrowserPresenter {
    fn present(&self, authorize_url: &Url) {
        println!("Open this URL in your browser to authorize taskpush:");
        println!();
        println!("  {authorize_url}");
        println!();

        if self.open_browser {
            if let Err(e) = open::that(authorize_url.as_str()) {
                tracing::warn!(error = %e, "Could not launch a browser, open the URL manually");
            }
        }
    }
}

pub struct AuthorizationFlow {
    config: OAuthConfig,
    presenter: Arc<dyn UrlPresenter>,
    state: Mutex<FlowState>,
}

impl AuthorizationFlow {
    pub fn new(config: OAuthConfig, presenter: Arc<dyn UrlPresenter>) -> Self {
        Self {
            config,
            presenter,
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> FlowState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh session for the configured redirect URI and scopes.
    pub fn new_session(&self) -> Result<AuthorizationSession, AuthError> {
        let redirect = Url::parse(&self.config.redirect_uri).map_err(|e| {
            AuthError::Config(format!(
                "redirect uri '{}' is invalid: {e}",
                self.config.redirect_uri
            ))
        })?;
        Ok(AuthorizationSession::new(redirect, self.config.scopes.clone()))
    }

    /// Run one session to completion. The callback port is released before
    /// this returns, on success and on every failure.
    pub async fn run(&self, session: AuthorizationSession) -> Result<TokenRecord, AuthError> {
        self.set_state(FlowState::Idle);
        let result = self.drive(session).await;
        match &result {
            Ok(_) => tracing::info!("Authorization complete"),
            Err(e) => {
                self.advance(FlowState::Failed);
                tracing::warn!(error = %e, "Authorization failed");
            }
        }
        result
    }

    async fn drive(&self, mut session: AuthorizationSession) -> Result<TokenRecord, AuthError> {
        let endpoint = TokenEndpoint::from_config(&self.config)?;
        let (client_id, _) = self
            .config
            .client_credentials()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let authorize_url = session.authorize_url(&self.config.authorize_url, client_id)?;

        let target = RedirectTarget::from_uri(session.redirect_uri())?;
        let listener = CallbackListener::bind(&target).await?;
        self.advance(FlowState::AwaitingRedirect);
        self.presenter.present(&authorize_url);

        let timeout = Duration::from_secs(self.config.callback_timeout_secs);
        let params = listener.wait(timeout).await?;

        if let Some(error) = params.error {
            return Err(AuthError::Denied {
                error,
                description: params.error_description,
            });
        }

        session.record_callback(params.code, params.state);
        if !session.state_matches() {
            return Err(AuthError::StateMismatch);
        }
        let code = session
            .code()
            .ok_or_else(|| AuthError::Listener("callback carried an empty code".into()))?
            .to_string();
        self.advance(FlowState::CodeReceived);

        self.advance(FlowState::Exchanging);
        let record = endpoint.exchange_code(&code, session.redirect_uri()).await?;
        self.advance(FlowState::Complete);
        Ok(record)
    }

    fn set_state(&self, next: FlowState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn advance(&self, next: FlowState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *state;
        if current.can_transition_to(next) {
            tracing::debug!(from = %current, to = %next, "Authorization flow transition");
            *state = next;
        } else {
            tracing::error!(from = %current, to = %next, "Rejected illegal authorization flow transition");
        }
    }
}

impl Authorizer for AuthorizationFlow {
    fn authorize(&self) -> Pin<Box<dyn Future<Output = Result<TokenRecord, AuthError>> + Send + '_>> {
        Box::pin(async move {
            let session = self.new_session()?;
            self.run(session).await
        })
    }
}
