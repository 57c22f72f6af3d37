//! Session store
//!
//! Two states: anonymous (`session == None`) and authenticated. The session is
//! persisted under [`SESSION_STORAGE_KEY`] on every change so a restart can
//! [`hydrate`](SessionStore::hydrate) it.

use crate::endpoints;
use crate::http::ApiClient;
use crate::storage::{read_json, write_json, KeyValueStorage};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tf_core::{
    has_permission, ApiError, LoginPayload, Permission, RegisterPayload, Session, User, UserRole,
};

/// Storage key for the persisted session
pub const SESSION_STORAGE_KEY: &str = "taskflow_pro_session_v1";

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Session>,
    loading: bool,
    error: Option<ApiError>,
}

/// Current authenticated identity
#[derive(Debug)]
pub struct SessionStore {
    client: Arc<ApiClient>,
    storage: Arc<dyn KeyValueStorage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create an anonymous store
    #[must_use]
    pub fn new(client: Arc<ApiClient>, storage: Arc<dyn KeyValueStorage>) -> Arc<Self> {
        Arc::new(Self {
            client,
            storage,
            state: RwLock::new(SessionState::default()),
        })
    }

    /// Restore the persisted session and wire the client to this store
    ///
    /// Missing, corrupt or token-less data leaves the store anonymous. The
    /// client receives a token provider and an unauthorized handler that hold
    /// only a weak reference back to the store.
    pub fn hydrate(self: &Arc<Self>) {
        let stored: Option<Session> = read_json(self.storage.as_ref(), SESSION_STORAGE_KEY, None);
        let stored = stored.filter(Session::is_valid);

        match &stored {
            Some(session) => tracing::info!(user = %session.user.id, "restored persisted session"),
            None => tracing::debug!("no persisted session"),
        }
        self.state.write().session = stored;

        let weak: Weak<Self> = Arc::downgrade(self);
        self.client.set_token_provider(Arc::new({
            let weak = weak.clone();
            move || weak.upgrade().and_then(|store| store.token())
        }));
        self.client.set_unauthorized_handler(Arc::new(move || {
            if let Some(store) = weak.upgrade() {
                store.logout();
            }
        }));
    }

    /// Sign in; `true` on success
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let payload = LoginPayload {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.begin();
        let result = endpoints::login(&self.client, &payload).await;
        self.accept(result)
    }

    /// Create account and sign in; `true` on success
    pub async fn register(&self, name: &str, email: &str, password: &str) -> bool {
        let payload = RegisterPayload {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        };
        self.begin();
        let result = endpoints::register(&self.client, &payload).await;
        self.accept(result)
    }

    /// Reload the current user; any failure signs out
    pub async fn refresh_me(&self) {
        if self.token().is_none() {
            return;
        }

        match endpoints::me(&self.client).await {
            Ok(user) => {
                let mut state = self.state.write();
                if let Some(session) = state.session.as_mut() {
                    session.user = user;
                    write_json(self.storage.as_ref(), SESSION_STORAGE_KEY, &state.session);
                }
            }
            Err(e) => {
                tracing::info!(error = %e, "refreshing current user failed, signing out");
                self.logout();
            }
        }
    }

    /// Clear session and error; idempotent
    pub fn logout(&self) {
        {
            let mut state = self.state.write();
            if state.session.is_some() {
                tracing::info!("signing out");
            }
            state.session = None;
            state.error = None;
        }
        write_json(self.storage.as_ref(), SESSION_STORAGE_KEY, &None::<Session>);
    }

    /// Snapshot of the session
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    /// Whether a session with a token is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.as_ref().is_some_and(Session::is_valid)
    }

    /// Current user
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.read().session.as_ref().map(|s| s.user.clone())
    }

    /// Current role
    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        self.state.read().session.as_ref().map(|s| s.user.role)
    }

    /// Current access token
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .session
            .as_ref()
            .map(|s| s.token.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    /// Whether the current role holds a permission
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        has_permission(self.role(), permission)
    }

    /// Whether a login/register call is in flight
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    /// Last login/register failure
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.read().error.clone()
    }

    fn begin(&self) {
        let mut state = self.state.write();
        state.loading = true;
        state.error = None;
    }

    fn accept(&self, result: Result<Session, ApiError>) -> bool {
        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(session) => {
                tracing::info!(user = %session.user.id, role = session.user.role.as_str(), "signed in");
                write_json(self.storage.as_ref(), SESSION_STORAGE_KEY, &session);
                state.session = Some(session);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "sign-in failed");
                state.error = Some(e);
                false
            }
        }
    }
}
