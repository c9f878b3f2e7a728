//! One-shot OAuth redirect receiver.
//!
//! Binds the redirect URI's host and port, serves exactly one accepted
//! callback, and shuts down. The caller blocks on [`CallbackListener::wait`],
//! which always tears the server down and releases the port before
//! returning, whether a callback arrived or the wait timed out.

use crate::error::AuthError;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

/// How long graceful shutdown may take before the server task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const RECEIVED_PAGE: &str = "<html><body><h1>Authorization received</h1>\
    <p>You can close this window and return to your terminal.</p></body></html>";
const DENIED_PAGE: &str = "<html><body><h1>Authorization denied</h1>\
    <p>No token was issued. You can close this window.</p></body></html>";
const MISSING_CODE_PAGE: &str = "<html><body><h1>Missing authorization code</h1></body></html>";
const ALREADY_HANDLED_PAGE: &str =
    "<html><body><h1>This authorization callback was already handled</h1></body></html>";

/// Query parameters of the redirect request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where to listen, derived from the configured redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl RedirectTarget {
    pub fn from_uri(uri: &Url) -> Result<Self, AuthError> {
        let host = uri
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AuthError::Config(format!("redirect uri '{uri}' has no host")))?;
        let port = uri
            .port_or_known_default()
            .ok_or_else(|| AuthError::Config(format!("redirect uri '{uri}' has no port")))?;
        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            path,
        })
    }

    /// Host to bind. `localhost` is pinned to IPv4 loopback so the listener
    /// never ends up on a public interface through name resolution.
    fn bind_host(&self) -> &str {
        if self.host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1"
        } else {
            &self.host
        }
    }
}

type ResultSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

#[derive(Clone)]
struct CallbackState {
    slot: ResultSlot,
}

pub struct CallbackListener {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<CallbackParams>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl CallbackListener {
    pub async fn bind(target: &RedirectTarget) -> Result<Self, AuthError> {
        let listener = tokio::net::TcpListener::bind((target.bind_host(), target.port))
            .await
            .map_err(|e| {
                AuthError::Listener(format!(
                    "failed to bind {}:{}: {e}",
                    target.bind_host(),
                    target.port
                ))
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthError::Listener(format!("failed to read local address: {e}")))?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = CallbackState {
            slot: Arc::new(Mutex::new(Some(result_tx))),
        };

        let app = Router::new()
            .route(&target.path, get(handle_callback))
            .with_state(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(addr = %local_addr, path = target.path.as_str(), "Callback listener started");

        Ok(Self {
            local_addr,
            result_rx,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until one callback is accepted or `timeout` elapses. The
    /// listener is shut down before this returns on every path.
    pub async fn wait(mut self, timeout: Duration) -> Result<CallbackParams, AuthError> {
        let received = tokio::time::timeout(timeout, &mut self.result_rx).await;
        self.shutdown().await;

        match received {
            Ok(Ok(params)) => Ok(params),
            Ok(Err(_)) => Err(AuthError::Listener(
                "callback server stopped before a request arrived".into(),
            )),
            Err(_) => Err(AuthError::CallbackTimeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    /// Stop serving and wait for the server task so the socket is closed.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut server) = self.server.take() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Callback server exited with error"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Callback server task failed"),
            Err(_) => {
                tracing::warn!("Callback server did not stop in time, aborting");
                server.abort();
                let _ = server.await;
            }
        }
        tracing::debug!(addr = %self.local_addr, "Callback listener stopped");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    if params.code.is_none() && params.error.is_none() {
        tracing::warn!("Callback request without code or error, still waiting");
        return (StatusCode::BAD_REQUEST, Html(MISSING_CODE_PAGE));
    }

    let sender = state
        .slot
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take();
    let Some(sender) = sender else {
        return (StatusCode::GONE, Html(ALREADY_HANDLED_PAGE));
    };

    let denied = params.error.is_some();
    tracing::info!(denied, "OAuth callback received");
    if sender.send(params).is_err() {
        tracing::warn!("Callback arrived after the flow stopped waiting");
    }

    if denied {
        (StatusCode::OK, Html(DENIED_PAGE))
    } else {
        (StatusCode::OK, Html(RECEIVED_PAGE))
    }
}
