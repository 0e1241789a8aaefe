//! CMF client error types.

use thiserror::Error;

/// Errors that can occur while talking to a CMF server.
#[derive(Debug, Error)]
pub enum CmfError {
    /// The configured base URL cannot be used.
    #[error("invalid base url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("timeout")]
    Timeout,

    /// Transport-level failure (connection refused, TLS, body read).
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("CMF server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not what the endpoint promises.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The session was closed by `close_session`.
    #[error("session closed")]
    SessionClosed,
}

impl CmfError {
    /// Create an API error from status code and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Map a reqwest error, folding timeouts into [`CmfError::Timeout`].
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl From<CmfError> for cmf_core::Error {
    fn from(e: CmfError) -> Self {
        cmf_core::Error::Client(e.to_string())
    }
}
