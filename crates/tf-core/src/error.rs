//! Error taxonomy for Taskflow
//!
//! Every failure that reaches a store, whether it came from the transport, the
//! server, a malformed payload or the permission gate, is expressed as an
//! [`ApiError`] carrying one of six [`ApiErrorCode`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Message used when nothing more specific is known about a failure
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Message used for a 401 that carried no usable body
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session is no longer valid. Please sign in again.";

/// Message used when the permission gate rejects an action
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to perform this action.";

/// Error classification shared by client and backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// Missing or invalid credentials
    Unauthorized,
    /// Authenticated but not allowed
    Forbidden,
    /// Resource or endpoint does not exist
    NotFound,
    /// Request payload rejected, see `details`
    ValidationError,
    /// Conflicting state (duplicate email)
    Conflict,
    /// Catch-all, including malformed responses and network failures
    InternalError,
}

impl ApiErrorCode {
    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status a backend answers with for this code
    #[inline]
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ValidationError => 422,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized API error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Classification
    pub code: ApiErrorCode,
    /// Human-readable message
    pub message: String,
    /// Field-level messages (validation failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl ApiError {
    /// Create error with code and message
    #[inline]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// UNAUTHORIZED
    #[inline]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    /// FORBIDDEN
    #[inline]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message)
    }

    /// NOT_FOUND
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    /// VALIDATION_ERROR
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationError, message)
    }

    /// CONFLICT
    #[inline]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    /// INTERNAL_ERROR
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    /// INTERNAL_ERROR with the generic message
    #[inline]
    #[must_use]
    pub fn generic() -> Self {
        Self::internal(GENERIC_FAILURE_MESSAGE)
    }

    /// UNAUTHORIZED with the session-expired message
    #[inline]
    #[must_use]
    pub fn session_expired() -> Self {
        Self::unauthorized(SESSION_EXPIRED_MESSAGE)
    }

    /// FORBIDDEN raised by the permission gate
    #[inline]
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::forbidden(PERMISSION_DENIED_MESSAGE)
    }

    /// Add a field-level detail
    #[must_use]
    pub fn with_detail(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), message.into());
        self
    }

    /// Detail message for a field, if any
    #[must_use]
    pub fn detail(&self, field: &str) -> Option<&str> {
        self.details.as_ref()?.get(field).map(String::as_str)
    }

    /// HTTP status matching this error's code
    #[inline]
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Parse a server error body
    ///
    /// Accepts only bodies that carry a known string `code` and a non-empty
    /// string `message`; anything else yields `None` so the caller can fall
    /// back to a status-derived error.
    #[must_use]
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        let code = body.get("code")?.as_str()?;
        let message = body.get("message")?.as_str()?;
        if code.is_empty() || message.is_empty() {
            return None;
        }
        serde_json::from_value(body.clone()).ok()
    }
}
