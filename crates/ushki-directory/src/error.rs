//! Error types for catalog lookups.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors from the station catalog.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport failure or undecodable response body.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog answered with a non-success status.
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),

    /// Base URL or query could not be assembled into a valid URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Catch-all for failures that have no dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl DirectoryError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
