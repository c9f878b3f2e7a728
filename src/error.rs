use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `taskpush`.
///
/// Each pipeline stage defines its own error variant. The binary matches on
/// these to decide the exit status; internal glue code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum TaskpushError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Authorization ───────────────────────────────────────────────────
    #[error("authentication: {0}")]
    Auth(#[from] AuthError),

    // ── Remote task API / webhook ───────────────────────────────────────
    #[error("remote api: {0}")]
    RemoteApi(#[from] RemoteApiError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Authorization errors ───────────────────────────────────────────────────

/// Reasons an access token could not be produced.
///
/// Every variant is terminal for the run: the authorization flow is never
/// retried automatically because it needs a human at a browser.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("callback state did not match the session nonce (possible CSRF or stale redirect)")]
    StateMismatch,

    #[error("no authorization callback received within {secs}s")]
    CallbackTimeout { secs: u64 },

    #[error("authorization denied by server: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("callback listener: {0}")]
    Listener(String),

    #[error("token endpoint returned {status}: {body}")]
    Exchange { status: u16, body: String },

    #[error("token endpoint unreachable: {0}")]
    Network(String),

    #[error("token endpoint response could not be parsed: {0}")]
    InvalidTokenResponse(String),

    #[error(
        "no usable stored token and interactive authorization is disabled; run `taskpush login` from a terminal"
    )]
    InteractionRequired,

    #[error("credential store: {0}")]
    Store(String),

    #[error("oauth config: {0}")]
    Config(String),
}

// ─── Remote API errors ──────────────────────────────────────────────────────

/// Failure talking to the task API.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} unreachable: {message}")]
    Network { endpoint: String, message: String },

    #[error("{endpoint} response could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
}

impl RemoteApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }

    /// True when the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// True for failures worth another attempt: transport errors, 5xx,
    /// request timeouts and rate limiting.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => *status >= 500 || matches!(*status, 408 | 429),
            Self::Decode { .. } => false,
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, TaskpushError>;
