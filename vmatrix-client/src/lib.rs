//! vmatrix Catalog Client
//!
//! HTTP client for the registry that lists available runtime versions.
//!
//! The registry answers with a JSON array of tag records. Only release tags
//! (`MAJOR.MINOR.PATCH`, optionally prefixed with a flavor such as `iojs-`)
//! are turned into version identifiers; aliases like `latest` are dropped.
//!
//! # Example
//!
//! ```no_run
//! use vmatrix_client::CatalogClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CatalogClient::new(vmatrix_client::DEFAULT_REGISTRY_URL);
//!     for version in client.fetch_versions().await? {
//!         println!("{}", version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod tags;

pub use error::{CatalogError, Result};
pub use tags::{TagRecord, is_release_tag, parse_tags};

use reqwest::Client;
use tracing::debug;

/// Tag listing for the nodesource images
pub const DEFAULT_REGISTRY_URL: &str =
    "https://registry.hub.docker.com/v1/repositories/nodesource/node/tags";

/// HTTP client for the version catalog
#[derive(Debug, Clone)]
pub struct CatalogClient {
    /// Full URL of the tag listing endpoint
    url: String,
    /// HTTP client instance
    client: Client,
}

impl CatalogClient {
    /// Create a new catalog client
    ///
    /// # Arguments
    /// * `url` - The tag listing endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    /// Create a new catalog client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Get the endpoint this client queries
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check the status code and return the body text
    async fn handle_response(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        debug!("Catalog responded with status {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::unavailable(status.as_u16(), body));
        }

        Ok(response.text().await?)
    }
}
