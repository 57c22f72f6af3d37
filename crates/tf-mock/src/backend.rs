//! In-process backend
//!
//! [`MockBackend`] is a [`Transport`], so the client can run against it with
//! no network at all. Each request sleeps for the configured latency, then
//! runs against the dataset under one lock, so requests are applied one at a
//! time.

use crate::db::Database;
use crate::routes;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tf_client::storage::KeyValueStorage;
use tf_client::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Default simulated round-trip latency
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(220);

/// Mock REST backend
#[derive(Debug)]
pub struct MockBackend {
    db: Mutex<Database>,
    latency: Duration,
}

impl MockBackend {
    /// Backend over persisted storage with the default latency
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            db: Mutex::new(Database::load(storage)),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Seeded, unpersisted backend with no latency
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            db: Mutex::new(Database::ephemeral()),
            latency: Duration::ZERO,
        }
    }

    /// Override simulated latency
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulated latency
    #[inline]
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Run a closure against the dataset (inspection and test setup)
    pub fn with_db<R>(&self, f: impl FnOnce(&mut Database) -> R) -> R {
        f(&mut *self.db.lock())
    }

    /// Answer one request
    #[must_use]
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let result = {
            let mut db = self.db.lock();
            routes::dispatch(&mut db, request)
        };

        match result {
            Ok(body) => {
                tracing::debug!(method = %request.method, path = %request.path, status = 200, "mock request");
                HttpResponse::ok(body)
            }
            Err(err) => {
                let status = err.http_status();
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status,
                    code = %err.code,
                    "mock request rejected"
                );
                let body = serde_json::to_value(&err).unwrap_or(Value::Null);
                HttpResponse::new(status, body)
            }
        }
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.handle(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let backend = MockBackend::ephemeral().with_latency(Duration::from_millis(220));
        let start = tokio::time::Instant::now();
        let response = backend
            .send(HttpRequest::post("/auth/login").with_json(json!({})))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(220));
        assert_eq!(response.status, 401);
    }

    #[test]
    fn error_body_carries_code_and_details() {
        let backend = MockBackend::ephemeral();
        let response = backend.handle(
            &HttpRequest::post("/auth/register").with_json(json!({ "email": "x@y.z", "name": "X", "password": "123" })),
        );
        assert_eq!(response.status, 422);
        assert_eq!(response.body["code"], "VALIDATION_ERROR");
        assert_eq!(response.body["message"], "Invalid registration data.");
    }
}
