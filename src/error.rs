//! Typed errors for the collaborator boundaries.
//!
//! Business code works with `anyhow`; these enums exist where a caller
//! needs to branch on the kind of failure (the permissions apology for
//! the spreadsheet store, status codes for HTTP collaborators).

use thiserror::Error;

/// Errors surfaced by a spreadsheet store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The backing service rejected the call for lack of permissions
    #[error("permission denied: {0}")]
    Permission(String),

    /// The requested sheet does not exist
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Any other backend failure (network, quota, malformed response)
    #[error("spreadsheet backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Classify a backend failure by its status code and message body.
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 403 || body.to_lowercase().contains("permission") {
            StoreError::Permission(format!("{}: {}", status, body))
        } else {
            StoreError::Backend(format!("{}: {}", status, body))
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, StoreError::Permission(_))
    }
}

/// Errors from the HTTP collaborator clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection failed or timed out
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
