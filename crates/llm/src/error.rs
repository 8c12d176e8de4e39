use thiserror::Error;

/// Errors a [`crate::ModelBackend`](crate::ModelBackend) can raise.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("service unavailable")]
    ServiceUnavailable,

    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("generation cancelled")]
    Cancelled,

    #[error("backend misconfigured: {0}")]
    Config(String),

    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Network timeouts, connection resets, 429s, 5xx and "service
    /// unavailable" are worth retrying; everything else (bad request,
    /// misconfiguration, cancellation) is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::RateLimited | BackendError::ServiceUnavailable => true,
            BackendError::Http { status, .. } => *status == 429 || *status >= 500,
            BackendError::InvalidRequest(_)
            | BackendError::Cancelled
            | BackendError::Config(_)
            | BackendError::Other(_) => false,
        }
    }
}
