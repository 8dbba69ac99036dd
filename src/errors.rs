use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal auth failure: the retry ceiling was hit, or the refresh itself failed.
    #[error("authentication refresh failed: {reason}")]
    AuthRefreshFailed {
        reason: String,
        #[source]
        source: Option<Arc<Error>>,
    },
    #[error("HTTP {status}: {status_text}")]
    HttpStatus {
        status: StatusCode,
        status_text: String,
        body: Option<serde_json::Value>,
    },
    /// Carries the request's own budget when it had one.
    #[error("request timed out{}", budget_suffix(.0))]
    Timeout(Option<Duration>),
    #[error("network unavailable: {0}")]
    NetworkUnavailable(#[source] BoxError),
    #[error("unsupported response type '{0}'")]
    UnsupportedResponseType(String),
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("failed to decode {kind} response body: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn budget_suffix(budget: &Option<Duration>) -> String {
    budget
        .map(|limit| format!(" after {limit:?}"))
        .unwrap_or_default()
}

impl Error {
    pub(crate) fn auth(reason: impl Into<String>) -> Self {
        Error::AuthRefreshFailed {
            reason: reason.into(),
            source: None,
        }
    }

    /// Status code carried by an `HttpStatus` error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::AuthRefreshFailed { .. })
    }
}
