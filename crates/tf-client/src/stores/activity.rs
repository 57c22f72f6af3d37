//! Project activity feed

use super::StoreStatus;
use crate::endpoints;
use crate::http::ApiClient;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tf_core::{ActivityEvent, ApiError, ProjectId};

#[derive(Debug, Default)]
struct ActivityState {
    by_project: IndexMap<ProjectId, Vec<ActivityEvent>>,
    status: StoreStatus,
}

/// Read-only cache of each project's audit log, newest first
#[derive(Debug)]
pub struct ActivityStore {
    client: Arc<ApiClient>,
    state: RwLock<ActivityState>,
}

impl ActivityStore {
    /// Create empty store
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(ActivityState::default()),
        }
    }

    /// Replace the project's feed with the server's
    pub async fn fetch_for_project(&self, project_id: &ProjectId) {
        self.state.write().status.begin();
        let result = endpoints::list_project_activity(&self.client, project_id).await;

        let mut state = self.state.write();
        if let Some(events) = state.status.settle(result) {
            state.by_project.insert(project_id.clone(), events);
        }
    }

    /// Cached feed of a project
    #[must_use]
    pub fn for_project(&self, project_id: &ProjectId) -> Vec<ActivityEvent> {
        self.state
            .read()
            .by_project
            .get(project_id)
            .cloned()
            .unwrap_or_default()
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
