//! Error types for the Graph client.

use azuread_sdk::RemoteFailure;
use thiserror::Error;

/// Result type alias using `GraphError`.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur when talking to Microsoft Graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Graph answered with a non-success status.
    #[error("Graph API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A response was well-formed JSON but lacked something we need.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Throttling or transient failures persisted past the retry budget.
    #[error("Maximum retries ({attempts}) exceeded, last status {status}")]
    MaxRetriesExceeded { attempts: u32, status: u16 },
}

impl GraphError {
    /// HTTP status of an API error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl RemoteFailure for GraphError {
    fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
