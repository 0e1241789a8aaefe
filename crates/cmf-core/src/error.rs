//! Error types for the CMF MCP server.
//!
//! Errors carry enough context to tell an operator what to fix, and
//! [`Error::recovery_suggestion`] maps the common ones to a next step.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable holding the primary CMF server address.
pub const PRIMARY_URL_ENV: &str = "CMF_BASE_URL";

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The required primary CMF server address is not configured
    #[error("Primary CMF configuration ({env_var}) is required")]
    MissingPrimaryUrl { env_var: String },

    /// Backend client error
    #[error("CMF client error: {0}")]
    Client(String),

    /// MCP error
    #[error("MCP error: {0}")]
    Mcp(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check ~/.config/cmf-mcp/config.toml and the CMF_MCP_* environment variables"),
            Error::MissingPrimaryUrl { .. } => {
                Some("Set CMF_BASE_URL (in the environment or a .env file) to the address of a CMF server")
            }
            Error::Client(_) => Some("Check that the CMF server is running and reachable"),
            _ => None,
        }
    }

    /// Create a missing-primary-url error for the default variable.
    pub fn missing_primary_url() -> Self {
        Error::MissingPrimaryUrl {
            env_var: PRIMARY_URL_ENV.to_string(),
        }
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_primary_url() {
        let err = Error::missing_primary_url();
        assert_eq!(
            err.to_string(),
            "Primary CMF configuration (CMF_BASE_URL) is required"
        );
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_format_with_suggestion() {
        let err = Error::Client("connection refused".to_string());
        let formatted = format_error_with_suggestion(&err);
        assert!(formatted.starts_with("CMF client error: connection refused"));
        assert!(formatted.contains("Suggestion:"));
    }

    #[test]
    fn test_internal_has_no_suggestion() {
        let err = Error::Internal("boom".to_string());
        assert!(err.recovery_suggestion().is_none());
        assert_eq!(format_error_with_suggestion(&err), "Internal error: boom");
    }
}
