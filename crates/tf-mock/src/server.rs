//! HTTP front for [`MockBackend`]
//!
//! Every request under `/api/...` is translated into an [`HttpRequest`] and
//! answered by the backend; the status and JSON body are passed through.

use crate::backend::MockBackend;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tf_client::transport::{HttpMethod, HttpRequest, Transport};
use tf_core::ApiError;
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::Tail;
use warp::{Filter, Rejection, Reply};

/// Path prefix the API is mounted under
pub const API_PREFIX: &str = "api";

/// Errors starting the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Address could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

/// Route filter answering `/api/**`
pub fn routes(backend: Arc<MockBackend>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path(API_PREFIX)
        .and(warp::path::tail())
        .and(warp::method())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::bytes())
        .and(warp::any().map(move || Arc::clone(&backend)))
        .and_then(handle)
}

async fn handle(
    tail: Tail,
    method: Method,
    authorization: Option<String>,
    body: Bytes,
    backend: Arc<MockBackend>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let Some(method) = HttpMethod::parse(method.as_str()) else {
        let err = ApiError::not_found("Endpoint not found.");
        return Ok(reply(404, &serde_json::to_value(&err).unwrap_or_default()));
    };

    let mut request = HttpRequest::new(method, format!("/{}", tail.as_str()));
    if let Some(value) = authorization {
        request = request.with_header("Authorization", value);
    }
    if !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(json) => request = request.with_json(json),
            Err(e) => tracing::debug!(error = %e, "ignoring non-JSON request body"),
        }
    }

    let response = match backend.send(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "mock backend failed");
            let err = ApiError::internal(crate::routes::SERVER_ERROR_MESSAGE);
            return Ok(reply(500, &serde_json::to_value(&err).unwrap_or_default()));
        }
    };
    Ok(reply(response.status, &response.body))
}

fn reply(status: u16, body: &serde_json::Value) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(body), status)
}

/// Bind and return the bound address plus the future that serves until
/// `shutdown` resolves
///
/// # Errors
/// [`ServerError::Bind`] when the address is unavailable.
pub fn bind(
    backend: Arc<MockBackend>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), ServerError> {
    let filter = routes(backend).with(warp::trace::request());
    warp::serve(filter)
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|source| ServerError::Bind { addr, source })
}
