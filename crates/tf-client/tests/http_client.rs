//! ApiClient behaviour: retries, backoff, auth header, 401 handling

use mockall::mock;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tf_client::prelude::*;
use tf_client::UNEXPECTED_RESPONSE_MESSAGE;
use tf_core::{UserRole, GENERIC_FAILURE_MESSAGE};
use tf_test_utils::{sample_session, storage_with_session, ScriptedTransport};

mock! {
    pub Net {}

    #[async_trait::async_trait]
    impl Transport for Net {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
    }
}

fn quick(retries: u32) -> RequestOptions {
    RequestOptions::default()
        .with_retries(retries)
        .with_retry_delay(Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried_with_linear_backoff() {
    let transport = ScriptedTransport::new();
    transport.respond_times(3, 503, json!({}));

    let options = RequestOptions::default()
        .with_retries(2)
        .with_retry_delay(Duration::from_millis(350));
    let client = ApiClient::with_options(transport.clone(), options);

    let err = client
        .request::<Value>(HttpRequest::get("/projects"))
        .await
        .unwrap_err();

    assert_eq!(err.code, ApiErrorCode::InternalError);
    assert_eq!(err.message, GENERIC_FAILURE_MESSAGE);
    assert_eq!(transport.call_count(), 3);

    let gaps = transport.gaps();
    assert_eq!(gaps.len(), 2);
    assert!(gaps[0] >= Duration::from_millis(350) && gaps[0] < Duration::from_millis(360));
    assert!(gaps[1] >= Duration::from_millis(700) && gaps[1] < Duration::from_millis(710));
}

#[tokio::test]
async fn test_retry_succeeds_once_server_recovers() {
    let transport = ScriptedTransport::new();
    transport
        .respond(500, Value::Null)
        .respond(200, json!({ "ok": true }));

    let client = ApiClient::with_options(transport.clone(), quick(2));
    let body: Value = client.request(HttpRequest::get("/projects")).await.unwrap();

    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_validation_errors_are_not_retried() {
    let transport = ScriptedTransport::new();
    transport.respond(
        422,
        json!({
            "code": "VALIDATION_ERROR",
            "message": "Invalid project data.",
            "details": { "name": "Project name is required." }
        }),
    );

    let client = ApiClient::with_options(transport.clone(), quick(5));
    let err = client
        .request::<Value>(HttpRequest::post("/projects").with_json(json!({})))
        .await
        .unwrap_err();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(err.code, ApiErrorCode::ValidationError);
    assert_eq!(err.detail("name"), Some("Project name is required."));
}

#[tokio::test]
async fn test_network_failures_are_retried_then_normalized() {
    let transport = ScriptedTransport::new();
    transport
        .fail(TransportError::Connect("refused".into()))
        .fail(TransportError::Timeout(Duration::from_secs(8)))
        .fail(TransportError::Connect("refused".into()));

    let client = ApiClient::with_options(transport.clone(), quick(2));
    let err = client
        .request::<Value>(HttpRequest::get("/users"))
        .await
        .unwrap_err();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(err, ApiError::generic());
}

#[tokio::test]
async fn test_unauthorized_response_notifies_handler_once() {
    let transport = ScriptedTransport::new();
    transport.respond(401, json!({ "code": "UNAUTHORIZED", "message": "Not signed in." }));

    let client = ApiClient::with_options(transport.clone(), quick(3));
    let hits = Arc::new(AtomicUsize::new(0));
    client.set_unauthorized_handler(Arc::new({
        let hits = Arc::clone(&hits);
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let err = client
        .request::<Value>(HttpRequest::get("/auth/me"))
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(err, ApiError::unauthorized("Not signed in."));
}

#[tokio::test]
async fn test_bare_unauthorized_becomes_session_expired() {
    let transport = ScriptedTransport::new();
    transport.respond(401, Value::String("nope".into()));

    let client = ApiClient::with_options(transport, quick(0));
    let err = client
        .request::<Value>(HttpRequest::get("/auth/me"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::session_expired());
}

#[tokio::test]
async fn test_bearer_token_is_attached_when_provided() {
    let transport = ScriptedTransport::new();
    transport.respond(200, json!([])).respond(200, json!([]));

    let client = ApiClient::with_options(transport.clone(), quick(0));
    let _: Value = client.request(HttpRequest::get("/users")).await.unwrap();

    client.set_token_provider(Arc::new(|| Some("tok-123".to_string())));
    let _: Value = client.request(HttpRequest::get("/users")).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].request.bearer_token(), None);
    assert_eq!(calls[1].request.bearer_token(), Some("tok-123"));
}

#[tokio::test]
async fn test_undecodable_success_body_is_internal_error() {
    let transport = ScriptedTransport::new();
    transport.respond(200, json!({ "unexpected": true }));

    let client = ApiClient::with_options(transport, quick(0));
    let err = client
        .request::<Vec<tf_core::User>>(HttpRequest::get("/users"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::internal(UNEXPECTED_RESPONSE_MESSAGE));
}

#[tokio::test]
async fn test_permission_gate_blocks_before_any_request() {
    let mut net = MockNet::new();
    net.expect_send().never();

    let storage = storage_with_session(&sample_session(UserRole::Member));
    let app = Taskflow::with_transport(Arc::new(net), RequestOptions::no_retry(), storage);

    assert!(app.projects.create("Roadmap", "").await.is_none());
    let err = app.projects.error().unwrap();
    assert_eq!(err.code, ApiErrorCode::Forbidden);
    assert!(!app.projects.loading());

    let project = ProjectId::from("prj_x");
    assert!(!app.projects.remove(&project).await);
    app.users.fetch_directory().await;
    assert_eq!(app.users.error().map(|e| e.code), Some(ApiErrorCode::Forbidden));
}
