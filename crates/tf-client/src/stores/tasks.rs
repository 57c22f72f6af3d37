//! Tasks store
//!
//! Tasks are cached per project, comments per task. Moving a task between
//! kanban columns is the one optimistic path: the cache changes before the
//! request is sent and is rolled back if it fails.

use super::cache;
use super::StoreStatus;
use crate::endpoints;
use crate::http::ApiClient;
use crate::permissions::assert_permission;
use crate::session::SessionStore;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tf_core::{
    ApiError, CreateTaskPayload, Permission, ProjectId, Task, TaskComment, TaskId, TaskPatch,
    TaskStatus,
};

#[derive(Debug, Default)]
struct TasksState {
    by_project: IndexMap<ProjectId, Vec<Task>>,
    comments_by_task: IndexMap<TaskId, Vec<TaskComment>>,
    status: StoreStatus,
}

impl TasksState {
    fn list_mut(&mut self, project_id: &ProjectId) -> &mut Vec<Task> {
        self.by_project.entry(project_id.clone()).or_default()
    }
}

/// Cache of tasks and their comments
#[derive(Debug)]
pub struct TasksStore {
    client: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: RwLock<TasksState>,
}

impl TasksStore {
    /// Create empty store
    #[must_use]
    pub fn new(client: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            session,
            state: RwLock::new(TasksState::default()),
        }
    }

    /// Replace the project's cached list with the server's
    ///
    /// A malformed response leaves the previous list untouched.
    pub async fn fetch_for_project(&self, project_id: &ProjectId) {
        self.state.write().status.begin();
        let result = endpoints::list_tasks(&self.client, project_id).await;

        let mut state = self.state.write();
        if let Some(list) = state.status.settle(result) {
            state.by_project.insert(project_id.clone(), list);
        }
    }

    /// Create a task and prepend it to the project's list
    pub async fn create(&self, project_id: &ProjectId, payload: CreateTaskPayload) -> Option<Task> {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::TasksCreate)?;
            endpoints::create_task(&self.client, project_id, &payload).await
        }
        .await;

        let mut state = self.state.write();
        let task = state.status.settle(result)?;
        state.list_mut(project_id).insert(0, task.clone());
        Some(task)
    }

    /// Move a task to another column, optimistically
    ///
    /// The cached entry shows `status` before the request is issued. On
    /// success it is replaced by the server's copy; on failure the exact
    /// pre-move snapshot is restored. Returns `false` when the permission is
    /// missing, the task is not cached (no request is sent), or the request
    /// failed.
    pub async fn move_task(&self, project_id: &ProjectId, task_id: &TaskId, status: TaskStatus) -> bool {
        if let Err(e) = assert_permission(&self.session, Permission::TasksUpdate) {
            self.state.write().status.error = Some(e);
            return false;
        }

        let snapshot = {
            let mut state = self.state.write();
            let Some(task) = state
                .by_project
                .get_mut(project_id)
                .and_then(|list| list.iter_mut().find(|t| t.id == *task_id))
            else {
                tracing::debug!(project = %project_id, task = %task_id, "task not cached, move skipped");
                return false;
            };
            let snapshot = task.clone();
            task.status = status;
            snapshot
        };

        let (entry, outcome) = match endpoints::move_task(&self.client, task_id, status).await {
            Ok(saved) => (saved, Ok(())),
            Err(e) => {
                tracing::warn!(task = %task_id, error = %e, "move failed, rolling back");
                (snapshot, Err(e))
            }
        };

        let mut state = self.state.write();
        if let Some(list) = state.by_project.get_mut(project_id) {
            cache::replace_in_place(list, entry);
        }
        match outcome {
            Ok(()) => true,
            Err(e) => {
                state.status.error = Some(e);
                false
            }
        }
    }

    /// Apply a partial update
    pub async fn update(&self, project_id: &ProjectId, task_id: &TaskId, patch: TaskPatch) -> Option<Task> {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::TasksUpdate)?;
            endpoints::update_task(&self.client, task_id, &patch).await
        }
        .await;

        let mut state = self.state.write();
        let task = state.status.settle(result)?;
        cache::replace_or_prepend(state.list_mut(project_id), task.clone());
        Some(task)
    }

    /// Delete a task and forget its comments
    pub async fn remove(&self, project_id: &ProjectId, task_id: &TaskId) -> bool {
        self.state.write().status.begin();
        let result = async {
            assert_permission(&self.session, Permission::TasksUpdate)?;
            endpoints::delete_task(&self.client, task_id).await
        }
        .await;

        let mut state = self.state.write();
        if state.status.settle(result).is_none() {
            return false;
        }
        if let Some(list) = state.by_project.get_mut(project_id) {
            cache::remove(list, task_id.as_str());
        }
        state.comments_by_task.shift_remove(task_id);
        true
    }

    /// Load a task's comments; failure caches an empty list
    pub async fn fetch_comments(&self, task_id: &TaskId) {
        let result = endpoints::list_comments(&self.client, task_id).await;

        let mut state = self.state.write();
        match result {
            Ok(list) => {
                state.comments_by_task.insert(task_id.clone(), list);
            }
            Err(e) => {
                state.comments_by_task.insert(task_id.clone(), Vec::new());
                state.status.error = Some(e);
            }
        }
    }

    /// Post a comment and append it (comments read oldest first)
    pub async fn add_comment(&self, task_id: &TaskId, message: &str) -> Option<TaskComment> {
        let result = async {
            assert_permission(&self.session, Permission::TasksUpdate)?;
            endpoints::add_comment(&self.client, task_id, message).await
        }
        .await;

        let mut state = self.state.write();
        match result {
            Ok(comment) => {
                state
                    .comments_by_task
                    .entry(task_id.clone())
                    .or_default()
                    .push(comment.clone());
                Some(comment)
            }
            Err(e) => {
                state.status.error = Some(e);
                None
            }
        }
    }

    /// Cached tasks of a project
    #[must_use]
    pub fn for_project(&self, project_id: &ProjectId) -> Vec<Task> {
        self.state
            .read()
            .by_project
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Cached task
    #[must_use]
    pub fn find(&self, project_id: &ProjectId, task_id: &TaskId) -> Option<Task> {
        let state = self.state.read();
        cache::find(state.by_project.get(project_id)?, task_id.as_str()).cloned()
    }

    /// Every cached task, grouped by project in load order
    #[must_use]
    pub fn all(&self) -> Vec<Task> {
        self.state
            .read()
            .by_project
            .values()
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// Cached comments of a task
    #[must_use]
    pub fn comments_for(&self, task_id: &TaskId) -> Vec<TaskComment> {
        self.state
            .read()
            .comments_by_task
            .get(task_id)
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
