//! Error types for the catalog client

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while fetching the version catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed before a response arrived
    #[error("catalog request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Registry answered with a non-success status
    #[error("catalog unavailable (status {status}): {body}")]
    Unavailable {
        /// HTTP status code
        status: u16,
        /// Response body, for the operator
        body: String,
    },

    /// Response body is not the expected JSON array of tag records
    #[error("malformed catalog response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl CatalogError {
    /// Create an unavailable error from status code and body
    pub fn unavailable(status: u16, body: impl Into<String>) -> Self {
        Self::Unavailable {
            status,
            body: body.into(),
        }
    }

    /// Check if the registry could not be reached or refused the request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::Unavailable { .. })
    }

    /// Check if the registry answered with something unparseable
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
