//! Users store

use super::cache;
use super::StoreStatus;
use crate::endpoints;
use crate::http::ApiClient;
use crate::permissions::assert_permission;
use crate::session::SessionStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tf_core::{ApiError, Permission, User, UserId};

#[derive(Debug, Default)]
struct UsersState {
    items: Vec<User>,
    status: StoreStatus,
}

/// User directory cache
#[derive(Debug)]
pub struct UsersStore {
    client: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: RwLock<UsersState>,
}

impl UsersStore {
    /// Create empty store
    #[must_use]
    pub fn new(client: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            session,
            state: RwLock::new(UsersState::default()),
        }
    }

    /// Load every user (member pickers, name lookups)
    pub async fn fetch_all(&self) {
        self.state.write().status.begin();
        let result = endpoints::list_users(&self.client).await;
        self.apply(result);
    }

    /// Load the directory for user management; requires `users:manage`
    pub async fn fetch_directory(&self) {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::UsersManage)?;
            endpoints::list_users(&self.client).await
        }
        .await;
        self.apply(result);
    }

    /// [`fetch_all`](Self::fetch_all) unless users are already cached
    pub async fn fetch_members_if_needed(&self) {
        if !self.state.read().items.is_empty() {
            return;
        }
        self.fetch_all().await;
    }

    fn apply(&self, result: Result<Vec<User>, ApiError>) {
        let mut state = self.state.write();
        if let Some(items) = state.status.settle(result) {
            state.items = items;
        }
    }

    /// Cached users
    #[must_use]
    pub fn items(&self) -> Vec<User> {
        self.state.read().items.clone()
    }

    /// Cached user by id
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<User> {
        cache::find(&self.state.read().items, id.as_str()).cloned()
    }

    /// Cached users keyed by id
    #[must_use]
    pub fn by_id(&self) -> HashMap<UserId, User> {
        self.state
            .read()
            .items
            .iter()
            .map(|u| (u.id.clone(), u.clone()))
            .collect()
    }

    /// Whether an operation is in flight
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.read().status.loading
    }

    /// Failure of the most recent operation
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.read().status.error.clone()
    }
}
