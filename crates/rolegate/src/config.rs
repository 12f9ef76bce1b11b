//! Engine and snapshot source configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [source]
//! base_url = "https://api.example.com"
//! path = "/rbac"
//! request_timeout = "5s"
//!
//! [engine]
//! lazy_load = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Where the policy snapshot is fetched from.
    pub source: SourceConfig,

    /// Engine behavior.
    pub engine: EngineConfig,
}

/// Remote snapshot source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the policy service.
    pub base_url: String,

    /// Path of the snapshot document, relative to `base_url`.
    pub path: String,

    /// HTTP request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted response size in bytes.
    pub max_response_size: usize,

    /// Whether plain `http://` base URLs are accepted.
    pub allow_http: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/rbac".to_string(),
            request_timeout: Duration::from_secs(10),
            max_response_size: 4 * 1024 * 1024, // 4 MiB
            allow_http: true,
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Full URL of the snapshot document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the base URL cannot be parsed.
    pub fn snapshot_url(&self) -> Result<Url, ConfigError> {
        let base = self.base_url.trim_end_matches('/');
        Url::parse(&format!("{}{}", base, self.path))
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid base_url '{}': {}", self.base_url, e)))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the base URL is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The base URL does not parse or uses a scheme other than http(s)
    /// - The path does not start with `/`
    /// - The request timeout or maximum response size is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Missing("source.base_url".to_string()));
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "source.path must start with '/': '{}'",
                self.path
            )));
        }

        let url = self.snapshot_url()?;
        match url.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            "http" => {
                return Err(ConfigError::InvalidValue(
                    "source.base_url uses http but allow_http is disabled".to_string(),
                ));
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Unsupported URL scheme: '{}'. Must be http or https",
                    other
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "source.request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "source.max_response_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Engine behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Load the snapshot on the first check instead of requiring an
    /// explicit `load()`.
    pub lazy_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lazy_load: true }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<ConfigError> for crate::RbacError {
    fn from(err: ConfigError) -> Self {
        crate::RbacError::configuration(err.to_string())
    }
}

impl RbacConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML, otherwise any
    /// validation error.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error of any section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = RbacConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.engine.lazy_load);
        assert_eq!(config.source.path, "/rbac");
        assert_eq!(config.source.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_snapshot_url() {
        let source = SourceConfig::new().with_base_url("https://api.example.com/");
        assert_eq!(
            source.snapshot_url().unwrap().as_str(),
            "https://api.example.com/rbac"
        );

        let source = source.with_path("/v2/policy");
        assert_eq!(
            source.snapshot_url().unwrap().as_str(),
            "https://api.example.com/v2/policy"
        );
    }

    #[test]
    fn test_from_toml() {
        let config = RbacConfig::from_toml_str(
            r#"
            [source]
            base_url = "https://policy.example.com"
            request_timeout = "5s"

            [engine]
            lazy_load = false
            "#,
        )
        .unwrap();

        assert_eq!(config.source.base_url, "https://policy.example.com");
        assert_eq!(config.source.path, "/rbac");
        assert_eq!(config.source.request_timeout, Duration::from_secs(5));
        assert!(!config.engine.lazy_load);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolegate.toml");
        std::fs::write(&path, "[source]\nbase_url = \"https://policy.example.com\"\n").unwrap();

        let config = RbacConfig::from_file(&path).unwrap();
        assert_eq!(config.source.base_url, "https://policy.example.com");

        let err = RbacConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = RbacConfig::from_toml_str("[source\nbase_url = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_base_url_fails_validation() {
        let mut config = RbacConfig::default();
        config.source.base_url = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_relative_path_fails_validation() {
        let mut config = RbacConfig::default();
        config.source.path = "rbac".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("source.path"));
    }

    #[test]
    fn test_http_rejected_when_disallowed() {
        let mut config = RbacConfig::default();
        config.source.allow_http = false;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("allow_http"));

        config.source.base_url = "https://policy.example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_scheme_fails_validation() {
        let mut config = RbacConfig::default();
        config.source.base_url = "ftp://policy.example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_zero_limits_fail_validation() {
        let mut config = RbacConfig::default();
        config.source.request_timeout = Duration::ZERO;
        assert!(config.validate().unwrap_err().to_string().contains("request_timeout"));

        let mut config = RbacConfig::default();
        config.source.max_response_size = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_response_size"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("source.base_url".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: source.base_url"
        );
    }
}
