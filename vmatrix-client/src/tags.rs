//! Tag listing endpoint and release-tag filter

use crate::CatalogClient;
use crate::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};
use vmatrix_core::domain::version::VersionId;

/// Optional alphabetic flavor, then exactly three numeric components
static RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+-)?[0-9]+\.[0-9]+\.[0-9]+$").expect("release tag pattern is valid")
});

/// One record of the registry's tag listing; other fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct TagRecord {
    pub name: String,
}

/// Whether a tag names a concrete release rather than an alias
pub fn is_release_tag(name: &str) -> bool {
    RELEASE_TAG.is_match(name)
}

/// Parses a tag listing and keeps release tags, in registry order
pub fn parse_tags(body: &str) -> Result<Vec<VersionId>> {
    let records: Vec<TagRecord> = serde_json::from_str(body)?;
    let total = records.len();

    let mut seen = HashSet::new();
    let versions: Vec<VersionId> = records
        .into_iter()
        .filter(|record| is_release_tag(&record.name))
        .filter_map(|record| VersionId::parse(record.name).ok())
        .filter(|version| seen.insert(version.clone()))
        .collect();

    debug!("Kept {} of {} tags", versions.len(), total);
    Ok(versions)
}

impl CatalogClient {
    /// Fetch the release versions available in the registry
    ///
    /// # Returns
    /// Versions in the order the registry lists them
    pub async fn fetch_versions(&self) -> Result<Vec<VersionId>> {
        info!("Fetching available versions from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let body = self.handle_response(response).await?;
        let versions = parse_tags(&body)?;

        info!("Catalog lists {} release version(s)", versions.len());
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn names(versions: &[VersionId]) -> Vec<&str> {
        versions.iter().map(VersionId::as_str).collect()
    }

    #[test]
    fn test_release_tag_filter() {
        assert!(is_release_tag("4.5.6"));
        assert!(is_release_tag("0.10.48"));
        assert!(is_release_tag("iojs-1.2.0"));

        assert!(!is_release_tag("latest"));
        assert!(!is_release_tag("1.2"));
        assert!(!is_release_tag("v1.2.3"));
        assert!(!is_release_tag("1.2.3-rc1"));
        assert!(!is_release_tag("iojs"));
        assert!(!is_release_tag(" 1.2.3"));
        assert!(!is_release_tag("1.2.3.4"));
    }

    #[test]
    fn test_parse_tags_keeps_order_and_ignores_extra_fields() {
        let body = r#"[
            {"layer": "", "name": "latest"},
            {"layer": "", "name": "4.5.6"},
            {"layer": "", "name": "0.10"},
            {"layer": "", "name": "iojs-1.2.0"},
            {"layer": "", "name": "0.12.7"},
            {"layer": "", "name": "4.5.6"}
        ]"#;

        let versions = parse_tags(body).unwrap();
        assert_eq!(names(&versions), vec!["4.5.6", "iojs-1.2.0", "0.12.7"]);
    }

    #[test]
    fn test_parse_tags_empty_listing() {
        assert!(parse_tags("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tags_malformed() {
        assert!(parse_tags("not json").unwrap_err().is_malformed());
        assert!(parse_tags(r#"{"name": "1.0.0"}"#).unwrap_err().is_malformed());
        assert!(parse_tags(r#"[{"tag": "1.0.0"}]"#).unwrap_err().is_malformed());
    }

    /// Serves a single canned HTTP response and returns the endpoint URL
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/v1/repositories/nodesource/node/tags", addr)
    }

    #[tokio::test]
    async fn test_fetch_versions_success() {
        let url = serve_once("200 OK", r#"[{"name":"latest"},{"name":"6.1.0"}]"#).await;
        let versions = CatalogClient::new(url).fetch_versions().await.unwrap();
        assert_eq!(names(&versions), vec!["6.1.0"]);
    }

    #[tokio::test]
    async fn test_fetch_versions_non_success_status() {
        let url = serve_once("503 Service Unavailable", "down").await;
        let err = CatalogClient::new(url).fetch_versions().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(matches!(err, CatalogError::Unavailable { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_versions_malformed_body() {
        let url = serve_once("200 OK", "<html>").await;
        let err = CatalogClient::new(url).fetch_versions().await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_fetch_versions_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = CatalogClient::new(format!("http://{}/tags", addr))
            .fetch_versions()
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::RequestFailed(_)));
        assert!(err.is_unavailable());
    }
}
