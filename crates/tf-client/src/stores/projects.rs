//! Projects store

use super::cache;
use super::StoreStatus;
use crate::endpoints;
use crate::http::ApiClient;
use crate::permissions::assert_permission;
use crate::session::SessionStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tf_core::{
    ApiError, CreateProjectPayload, Permission, Project, ProjectId, UpdateProjectPayload,
};

#[derive(Debug, Default)]
struct ProjectsState {
    items: Vec<Project>,
    status: StoreStatus,
}

/// Cache of projects visible to the signed-in user
#[derive(Debug)]
pub struct ProjectsStore {
    client: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: RwLock<ProjectsState>,
}

impl ProjectsStore {
    /// Create empty store
    #[must_use]
    pub fn new(client: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            session,
            state: RwLock::new(ProjectsState::default()),
        }
    }

    /// Replace the cache with the server's list
    pub async fn fetch_all(&self) {
        self.state.write().status.begin();
        let result = endpoints::list_projects(&self.client).await;

        let mut state = self.state.write();
        if let Some(items) = state.status.settle(result) {
            state.items = items;
        }
    }

    /// Load one project and upsert it
    ///
    /// Does not touch the `loading` flag.
    pub async fn fetch_by_id(&self, id: &ProjectId) -> Option<Project> {
        self.state.write().status.error = None;
        let result = endpoints::get_project(&self.client, id).await;

        let mut state = self.state.write();
        match result {
            Ok(project) => {
                cache::replace_or_prepend(&mut state.items, project.clone());
                Some(project)
            }
            Err(e) => {
                state.status.error = Some(e);
                None
            }
        }
    }

    /// Create a project and prepend it
    pub async fn create(&self, name: &str, description: &str) -> Option<Project> {
        let payload = CreateProjectPayload {
            name: name.to_string(),
            description: description.to_string(),
        };

        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::ProjectsCreate)?;
            endpoints::create_project(&self.client, &payload).await
        }
        .await;

        let mut state = self.state.write();
        let project = state.status.settle(result)?;
        state.items.insert(0, project.clone());
        Some(project)
    }

    /// Replace name, description, status and members
    ///
    /// The server keeps the owner in the member list.
    pub async fn update(&self, id: &ProjectId, payload: UpdateProjectPayload) -> Option<Project> {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::ProjectsUpdate)?;
            endpoints::update_project(&self.client, id, &payload).await
        }
        .await;

        let mut state = self.state.write();
        let project = state.status.settle(result)?;
        cache::replace_or_prepend(&mut state.items, project.clone());
        Some(project)
    }

    /// Delete a project
    pub async fn remove(&self, id: &ProjectId) -> bool {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::ProjectsDelete)?;
            endpoints::delete_project(&self.client, id).await
        }
        .await;

        let mut state = self.state.write();
        if state.status.settle(result).is_none() {
            return false;
        }
        cache::remove(&mut state.items, id.as_str());
        true
    }

    /// Cached projects, most recent first
    #[must_use]
    pub fn items(&self) -> Vec<Project> {
        self.state.read().items.clone()
    }

    /// Cached project by id
    #[must_use]
    pub fn get(&self, id: &ProjectId) -> Option<Project> {
        cache::find(&self.state.read().items, id.as_str()).cloned()
    }

    /// Cached projects keyed by id
    #[must_use]
    pub fn by_id(&self) -> HashMap<ProjectId, Project> {
        self.state
            .read()
            .items
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
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
