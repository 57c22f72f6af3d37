//! HTTP client wrapper
//!
//! Provides the single entry point every endpoint goes through:
//! - Bearer token injection from a pluggable provider
//! - Unauthorized callback on every 401 response
//! - Linear-backoff retries for network failures and 5xx
//! - Normalization of every failure into [`ApiError`]
//!
//! The provider and handler are plain function references registered at
//! startup, so the transport layer never depends on the session store.

use crate::config::{ClientConfig, ConfigError};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tf_core::ApiError;

/// Message recorded when a success body does not have the expected shape
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected server response.";

/// Yields the current bearer token, if any
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Invoked once for every 401 response
pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// Per-request retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff unit; attempt `n` waits `retry_delay × n`
    pub retry_delay: Duration,
}

impl RequestOptions {
    /// Options from client configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            retries: config.retries,
            retry_delay: config.retry_delay(),
        }
    }

    /// Single attempt, no retries
    #[inline]
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// With retry count
    #[inline]
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// With backoff unit
    #[inline]
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(350),
        }
    }
}

/// Whether a failed attempt may be retried
///
/// `status` is `None` when no response was received at all.
#[inline]
#[must_use]
pub fn should_retry(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(status) => (500..=599).contains(&status),
    }
}

/// Normalize a failed attempt into the error taxonomy
///
/// A server body carrying `code` and `message` wins; otherwise a bare 401
/// becomes UNAUTHORIZED and everything else INTERNAL_ERROR.
#[must_use]
pub fn normalize_error(status: Option<u16>, body: Option<&Value>) -> ApiError {
    if let Some(err) = body.and_then(ApiError::from_body) {
        return err;
    }
    if status == Some(401) {
        return ApiError::session_expired();
    }
    ApiError::generic()
}

enum Failure {
    NoResponse(TransportError),
    Status(HttpResponse),
}

impl Failure {
    fn status(&self) -> Option<u16> {
        match self {
            Self::NoResponse(_) => None,
            Self::Status(response) => Some(response.status),
        }
    }

    fn into_api_error(self) -> ApiError {
        match self {
            Self::NoResponse(_) => normalize_error(None, None),
            Self::Status(response) => normalize_error(Some(response.status), Some(&response.body)),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse(err) => write!(f, "{err}"),
            Self::Status(response) => write!(f, "status {}", response.status),
        }
    }
}

/// Shared API client
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    defaults: RequestOptions,
    token_provider: RwLock<Option<TokenProvider>>,
    unauthorized_handler: RwLock<Option<UnauthorizedHandler>>,
}

impl ApiClient {
    /// Create client over a transport with default retry policy
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_options(transport, RequestOptions::default())
    }

    /// Create client with explicit default retry policy
    #[must_use]
    pub fn with_options(transport: Arc<dyn Transport>, defaults: RequestOptions) -> Self {
        Self {
            transport,
            defaults,
            token_provider: RwLock::new(None),
            unauthorized_handler: RwLock::new(None),
        }
    }

    /// Create network client from configuration
    ///
    /// # Errors
    /// [`ConfigError`] when the base URL is unusable or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_options(
            Arc::new(transport),
            RequestOptions::from_config(config),
        ))
    }

    /// Register the token provider (replaces any previous one)
    pub fn set_token_provider(&self, provider: TokenProvider) {
        *self.token_provider.write() = Some(provider);
    }

    /// Register the unauthorized handler (replaces any previous one)
    pub fn set_unauthorized_handler(&self, handler: UnauthorizedHandler) {
        *self.unauthorized_handler.write() = Some(handler);
    }

    /// Default retry policy
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> RequestOptions {
        self.defaults
    }

    /// Send with default options and decode the body
    ///
    /// # Errors
    /// Normalized [`ApiError`]; an undecodable success body is INTERNAL_ERROR.
    pub async fn request<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        self.request_with(request, self.defaults).await
    }

    /// Send with explicit options and decode the body
    ///
    /// # Errors
    /// Normalized [`ApiError`]; an undecodable success body is INTERNAL_ERROR.
    pub async fn request_with<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let path = request.path.clone();
        let value = self.request_value(request, options).await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::warn!(%path, error = %e, "response body did not match expected shape");
            ApiError::internal(UNEXPECTED_RESPONSE_MESSAGE)
        })
    }

    /// Send and return the raw JSON body
    ///
    /// # Errors
    /// Normalized [`ApiError`] once retries are exhausted or the failure is
    /// not retryable.
    pub async fn request_value(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(&request).await {
                Ok(body) => return Ok(body),
                Err(failure) => {
                    attempt += 1;

                    if !should_retry(failure.status()) || attempt > options.retries {
                        tracing::debug!(
                            method = %request.method,
                            path = %request.path,
                            attempt,
                            %failure,
                            "request failed"
                        );
                        return Err(failure.into_api_error());
                    }

                    let delay = options.retry_delay * attempt;
                    tracing::debug!(
                        method = %request.method,
                        path = %request.path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %failure,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<Value, Failure> {
        let mut outgoing = request.clone();
        if let Some(token) = self.current_token() {
            outgoing
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }

        match self.transport.send(outgoing).await {
            Err(err) => Err(Failure::NoResponse(err)),
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => {
                if response.status == 401 {
                    tracing::warn!(path = %request.path, "unauthorized response");
                    self.notify_unauthorized();
                }
                Err(Failure::Status(response))
            }
        }
    }

    fn current_token(&self) -> Option<String> {
        let provider = self.token_provider.read().clone()?;
        provider().filter(|token| !token.is_empty())
    }

    fn notify_unauthorized(&self) {
        let handler = self.unauthorized_handler.read().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("defaults", &self.defaults)
            .field("has_token_provider", &self.token_provider.read().is_some())
            .field(
                "has_unauthorized_handler",
                &self.unauthorized_handler.read().is_some(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tf_core::{ApiErrorCode, GENERIC_FAILURE_MESSAGE, SESSION_EXPIRED_MESSAGE};

    #[test]
    fn retry_only_without_response_or_on_5xx() {
        assert!(should_retry(None));
        assert!(should_retry(Some(500)));
        assert!(should_retry(Some(503)));
        assert!(should_retry(Some(599)));
        assert!(!should_retry(Some(401)));
        assert!(!should_retry(Some(404)));
        assert!(!should_retry(Some(422)));
        assert!(!should_retry(Some(600)));
    }

    #[test]
    fn normalize_prefers_server_body() {
        let body = json!({ "code": "CONFLICT", "message": "This email is already registered." });
        let err = normalize_error(Some(409), Some(&body));
        assert_eq!(err.code, ApiErrorCode::Conflict);
        assert_eq!(err.message, "This email is already registered.");
    }

    #[test]
    fn normalize_bare_401() {
        let err = normalize_error(Some(401), Some(&Value::Null));
        assert_eq!(err.code, ApiErrorCode::Unauthorized);
        assert_eq!(err.message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn normalize_everything_else_is_internal() {
        for (status, body) in [
            (None, None),
            (Some(502), Some(json!("Bad Gateway"))),
            (Some(404), Some(json!({ "error": "missing" }))),
        ] {
            let err = normalize_error(status, body.as_ref());
            assert_eq!(err.code, ApiErrorCode::InternalError);
            assert_eq!(err.message, GENERIC_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn default_options() {
        let options = RequestOptions::default();
        assert_eq!(options.retries, 2);
        assert_eq!(options.retry_delay, Duration::from_millis(350));
        assert_eq!(RequestOptions::no_retry().retries, 0);
    }
}
