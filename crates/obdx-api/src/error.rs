use thiserror::Error;

/// Top-level error type for the `obdx-api` crate.
///
/// Covers every failure mode of the hosted store's REST surface:
/// authentication, transport, PostgREST error bodies and payload decoding.
/// `obdx-core` maps these into store-level outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The store rejected the API key (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out. The write may or may not have been applied.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── PostgREST ───────────────────────────────────────────────────
    /// Structured error body (`{code, message, details, hint}`).
    #[error("Store error (HTTP {status}): {message}")]
    Rest {
        message: String,
        code: Option<String>,
        status: u16,
    },

    /// Unique or exclusion constraint violation (HTTP 409, SQLSTATE 23505).
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        code: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A representation was requested but the store returned no rows.
    #[error("Unexpected empty response from {table}")]
    EmptyRepresentation { table: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Rest { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the outcome of a write is unknown (the request may
    /// have reached the store before the connection failed).
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Extract the PostgREST / SQLSTATE error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Rest { code, .. } | Self::Conflict { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
