//! Session lifecycle against the mock backend

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tf_client::prelude::*;
use tf_client::storage::read_json;
use tf_client::SESSION_STORAGE_KEY;
use tf_core::{Session, UserRole};
use tf_mock::{MockBackend, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD, SEED_MEMBER_EMAIL};
use tf_test_utils::{mock_app, sample_session, storage_with_session};

fn app_over(backend: &Arc<MockBackend>, storage: Arc<MemoryStorage>) -> Taskflow {
    Taskflow::with_transport(backend.clone(), RequestOptions::no_retry(), storage)
}

#[tokio::test]
async fn test_login_persists_and_rehydrates_identically() {
    let backend = Arc::new(MockBackend::ephemeral());
    let storage = Arc::new(MemoryStorage::new());

    let app = app_over(&backend, storage.clone());
    assert!(app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await);
    assert!(app.session.is_authenticated());
    assert_eq!(app.session.role(), Some(UserRole::Admin));
    assert!(!app.session.loading());

    let restarted = app_over(&backend, storage);
    assert!(restarted.session.is_authenticated());
    assert_eq!(restarted.session.session(), app.session.session());
}

#[tokio::test]
async fn test_wrong_password_leaves_store_anonymous() {
    let (app, _backend) = mock_app();

    assert!(!app.session.login(SEED_ADMIN_EMAIL, "wrong").await);
    assert!(!app.session.is_authenticated());
    assert!(!app.session.loading());

    let err = app.session.error().unwrap();
    assert_eq!(err.code, ApiErrorCode::Unauthorized);
    assert_eq!(err.message, "Invalid email or password.");
}

#[tokio::test]
async fn test_register_creates_member_and_rejects_duplicates() {
    let (app, _backend) = mock_app();

    assert!(app.session.register("Nadia", "Nadia@Example.com", "secret1").await);
    let user = app.session.user().unwrap();
    assert_eq!(user.role, UserRole::Member);
    assert_eq!(user.email, "nadia@example.com");

    app.session.logout();
    assert!(!app.session.register("Other", SEED_MEMBER_EMAIL, "secret1").await);
    assert_eq!(app.session.error().map(|e| e.code), Some(ApiErrorCode::Conflict));

    assert!(!app.session.register("Shorty", "short@example.com", "12345").await);
    assert_eq!(
        app.session.error().map(|e| e.code),
        Some(ApiErrorCode::ValidationError)
    );
}

#[tokio::test]
async fn test_corrupt_or_tokenless_storage_hydrates_anonymous() {
    let backend = Arc::new(MockBackend::ephemeral());

    let corrupt = Arc::new(MemoryStorage::new());
    corrupt.set(SESSION_STORAGE_KEY, "{oops").unwrap();
    assert!(!app_over(&backend, corrupt).session.is_authenticated());

    let tokenless = Session::new("", sample_session(UserRole::Admin).user);
    let storage = storage_with_session(&tokenless);
    let app = app_over(&backend, storage);
    assert!(!app.session.is_authenticated());
    assert_eq!(app.session.session(), None);
}

#[tokio::test]
async fn test_logout_is_idempotent_and_persists_null() {
    let backend = Arc::new(MockBackend::ephemeral());
    let storage = Arc::new(MemoryStorage::new());
    let app = app_over(&backend, storage.clone());
    assert!(app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await);

    app.session.logout();
    app.session.logout();

    assert!(!app.session.is_authenticated());
    assert_eq!(app.session.error(), None);
    let stored: Option<Session> = read_json(storage.as_ref(), SESSION_STORAGE_KEY, None);
    assert_eq!(stored, None);
}

#[tokio::test]
async fn test_refresh_me_updates_user() {
    let (app, backend) = mock_app();
    assert!(app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await);

    backend.with_db(|db| {
        if let Some(admin) = db.state.users.iter_mut().find(|u| u.user.email == SEED_ADMIN_EMAIL) {
            admin.user.name = "Amina H.".to_string();
        }
    });

    app.session.refresh_me().await;
    assert!(app.session.is_authenticated());
    assert_eq!(app.session.user().map(|u| u.name), Some("Amina H.".to_string()));
}

#[tokio::test]
async fn test_refresh_me_with_stale_token_signs_out() {
    let backend = Arc::new(MockBackend::ephemeral());
    let storage = storage_with_session(&sample_session(UserRole::Admin));
    let app = app_over(&backend, storage);
    assert!(app.session.is_authenticated());

    app.session.refresh_me().await;
    assert!(!app.session.is_authenticated());
}

#[tokio::test]
async fn test_any_unauthorized_response_forces_logout() {
    let (app, backend) = mock_app();
    assert!(app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await);

    backend.with_db(|db| db.state.users.retain(|u| u.user.email != SEED_ADMIN_EMAIL));

    app.projects.fetch_all().await;
    assert_eq!(app.projects.error().map(|e| e.code), Some(ApiErrorCode::Unauthorized));
    assert!(!app.session.is_authenticated());
}
