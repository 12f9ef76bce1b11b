//! HTTP snapshot source.
//!
//! Fetches the snapshot document with a single `GET` against the configured
//! policy endpoint. A `404` means no policy has been published yet and is
//! reported as [`RbacError::SnapshotNotFound`].
//!
//! # Example
//!
//! ```ignore
//! use rolegate::config::SourceConfig;
//! use rolegate::source::HttpSnapshotSource;
//! use std::sync::Arc;
//!
//! let config = SourceConfig::new().with_base_url("https://api.example.com");
//! let source = HttpSnapshotSource::new(&config)?
//!     .with_token_provider(Arc::new(|| session.access_token()));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::SnapshotSource;
use crate::config::SourceConfig;
use crate::snapshot::Snapshot;
use crate::{RbacError, RbacResult};

/// Supplies the bearer token for each request. Returning `None` sends no
/// `Authorization` header.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Fetches snapshots from a remote policy endpoint.
#[derive(Clone)]
pub struct HttpSnapshotSource {
    http_client: reqwest::Client,
    url: Url,
    max_response_size: usize,
    token_provider: Option<TokenProvider>,
}

impl HttpSnapshotSource {
    /// Creates a source from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &SourceConfig) -> RbacResult<Self> {
        config.validate()?;

        let url = config.snapshot_url()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RbacError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url,
            max_response_size: config.max_response_size,
            token_provider: None,
        })
    }

    /// Attaches a bearer token provider, consulted on every fetch.
    #[must_use]
    pub fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// The snapshot document URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Debug for HttpSnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSnapshotSource")
            .field("url", &self.url.as_str())
            .field("max_response_size", &self.max_response_size)
            .field("has_token_provider", &self.token_provider.is_some())
            .finish()
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> RbacResult<Snapshot> {
        tracing::debug!(url = %self.url, "Fetching policy snapshot");

        let mut request = self
            .http_client
            .get(self.url.as_str())
            .header("Accept", "application/json");

        if let Some(token) = self.token_provider.as_ref().and_then(|provider| provider()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "Failed to fetch policy snapshot");
            RbacError::fetch(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RbacError::SnapshotNotFound);
        }
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = status.as_u16(), "Policy endpoint returned an error");
            return Err(RbacError::HttpStatus {
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_response_size
        {
            return Err(RbacError::fetch(format!(
                "Response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        let body = response.bytes().await.map_err(|e| RbacError::fetch(e.to_string()))?;
        if body.len() > self.max_response_size {
            return Err(RbacError::fetch(format!(
                "Response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        Snapshot::from_slice(&body).inspect_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "Failed to decode policy snapshot");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_builds_url() {
        let config = SourceConfig::new().with_base_url("https://api.example.com/");
        let source = HttpSnapshotSource::new(&config).unwrap();
        assert_eq!(source.url().as_str(), "https://api.example.com/rbac");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SourceConfig::new()
            .with_base_url("http://api.example.com")
            .with_allow_http(false);
        let err = HttpSnapshotSource::new(&config).unwrap_err();
        assert!(matches!(err, RbacError::Configuration { .. }));

        let config = SourceConfig::new().with_request_timeout(Duration::ZERO);
        assert!(HttpSnapshotSource::new(&config).is_err());
    }

    #[test]
    fn test_debug_hides_token_provider() {
        let source = HttpSnapshotSource::new(&SourceConfig::new())
            .unwrap()
            .with_token_provider(Arc::new(|| Some("secret".to_string())));
        let debug = format!("{source:?}");
        assert!(debug.contains("has_token_provider: true"));
        assert!(!debug.contains("secret"));
    }
}
