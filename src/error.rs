// src/error.rs
// Standardized error types for remctx

use thiserror::Error;

/// Main error type for the remctx library
#[derive(Error, Debug)]
pub enum RemctxError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    ConfigMalformed(String),

    #[error("credential required: {0}")]
    CredentialRequired(String),

    #[error("pattern expansion failed for {repo}: {reason}")]
    PatternExpansion { repo: String, reason: String },

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using RemctxError
pub type Result<T> = std::result::Result<T, RemctxError>;

impl RemctxError {
    /// Convert to user-facing string for MCP tool boundaries
    pub fn to_user_string(&self) -> String {
        self.to_string()
    }
}

impl From<String> for RemctxError {
    fn from(s: String) -> Self {
        RemctxError::Other(s)
    }
}

impl From<serde_yaml::Error> for RemctxError {
    fn from(err: serde_yaml::Error) -> Self {
        RemctxError::ConfigMalformed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RemctxError {
    fn from(err: tokio::task::JoinError) -> Self {
        RemctxError::Other(err.to_string())
    }
}

impl From<RemctxError> for String {
    fn from(err: RemctxError) -> Self {
        err.to_string()
    }
}
