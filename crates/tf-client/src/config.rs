//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a config
    #[error("invalid client config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Base URL missing
    #[error("base_url must not be empty")]
    EmptyBaseUrl,

    /// Base URL is not an absolute http(s) URL
    #[error("invalid base_url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// HTTP client could not be built
    #[error("http client: {0}")]
    Client(String),
}

/// Default API root, matching `taskflow-mock serve` defaults
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4000/api";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root every request path is joined onto
    pub base_url: String,
    /// Per-request transport timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt for network failures and 5xx
    pub retries: u32,
    /// Linear backoff unit in milliseconds
    pub retry_delay_ms: u64,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML, filling missing keys with defaults
    ///
    /// # Errors
    /// [`ConfigError`] on malformed TOML or an unusable base URL.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants
    ///
    /// # Errors
    /// [`ConfigError::EmptyBaseUrl`] when no base URL is set,
    /// [`ConfigError::InvalidBaseUrl`] when it is relative or not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url().map(|_| ())
    }

    /// Base URL parsed as an absolute http(s) URL
    ///
    /// # Errors
    /// Same as [`validate`](Self::validate).
    pub fn parsed_base_url(&self) -> Result<reqwest::Url, ConfigError> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason,
        };
        let url = reqwest::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme {other:?}"))),
        }
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With retry count
    #[inline]
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// With retry delay
    #[inline]
    #[must_use]
    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// With transport timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Transport timeout as duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry delay as duration
    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 8000,
            retries: 2,
            retry_delay_ms: 350,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(8000));
        assert_eq!(config.retries, 2);
        assert_eq!(config.retry_delay(), Duration::from_millis(350));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "http://127.0.0.1:4000/api"
            retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:4000/api");
        assert_eq!(config.retries, 5);
        assert_eq!(config.retry_delay_ms, 350);
    }

    #[test]
    fn empty_base_url_rejected() {
        let err = ClientConfig::from_toml_str("base_url = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn relative_or_non_http_base_url_rejected() {
        for url in ["/api", "localhost:4000/api", "ftp://example.com/api"] {
            let err = ClientConfig::new().with_base_url(url).validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }), "{url}: {err}");
        }
        assert!(ClientConfig::new()
            .with_base_url("https://tasks.example.com/api")
            .validate()
            .is_ok());
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("retries = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
