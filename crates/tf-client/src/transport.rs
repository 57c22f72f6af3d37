//! Transport seam
//!
//! [`ApiClient`](crate::http::ApiClient) never talks to the network directly;
//! it hands an [`HttpRequest`] to a [`Transport`]. A transport either returns
//! the response it received (any status) or a [`TransportError`] meaning no
//! response arrived at all. The retry policy relies on that distinction.

use crate::config::{ClientConfig, ConfigError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Upper-case verb
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parse a verb, case-insensitively
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Outgoing request, path relative to the API root
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create request without headers or body
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// GET
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// PATCH
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// DELETE
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// With JSON body
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// With header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header value, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Token from an `Authorization: Bearer …` header
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.header("authorization")?.strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Response as received, any status
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` when empty
    pub body: Value,
}

impl HttpResponse {
    /// Create response
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 with body
    #[inline]
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// 2xx
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request exceeded the transport timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Could not reach the server
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other failure before a response arrived
    #[error("transport failure: {0}")]
    Other(String),
}

/// Sends requests somewhere: the network, an in-process backend, a test script
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    ///
    /// # Errors
    /// [`TransportError`] only when no response was received. Error statuses
    /// are returned as `Ok`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Network transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build from configuration
    ///
    /// # Errors
    /// [`ConfigError`] when the base URL is not an absolute http(s) URL or
    /// the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.parsed_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    /// Absolute URL for a request path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);
        let mut builder = self.client.request(request.method.into(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(&e))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| self.classify(&e))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::trace!(method = %request.method, %url, status, "response received");
        Ok(HttpResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_is_read_case_insensitively() {
        let req = HttpRequest::get("/auth/me").with_header("authorization", "Bearer abc ");
        assert_eq!(req.bearer_token(), Some("abc"));

        let req = HttpRequest::get("/auth/me").with_header("Authorization", "Basic abc");
        assert_eq!(req.bearer_token(), None);

        let req = HttpRequest::get("/auth/me").with_header("Authorization", "Bearer ");
        assert_eq!(req.bearer_token(), None);
    }

    #[test]
    fn method_parse_round_trips() {
        for m in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ] {
            assert_eq!(HttpMethod::parse(&m.as_str().to_lowercase()), Some(m));
        }
        assert_eq!(HttpMethod::parse("OPTIONS"), None);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = ClientConfig::default().with_base_url("http://localhost:4000/api/");
        let transport = ReqwestTransport::new(&config).unwrap();
        assert_eq!(transport.url("/projects"), "http://localhost:4000/api/projects");
        assert_eq!(transport.url("tasks/1"), "http://localhost:4000/api/tasks/1");
    }

    #[test]
    fn relative_base_url_is_a_config_error() {
        let config = ClientConfig::default().with_base_url("/api");
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::ok(Value::Null).is_success());
        assert!(!HttpResponse::new(401, Value::Null).is_success());
        assert!(!HttpResponse::new(503, Value::Null).is_success());
    }
}
