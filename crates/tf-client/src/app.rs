//! Application wiring
//!
//! One client, one session and one store per resource, all sharing the same
//! transport. Construction hydrates the session so the token provider and
//! unauthorized handler are in place before the first request.

use crate::config::{ClientConfig, ConfigError};
use crate::http::{ApiClient, RequestOptions};
use crate::session::SessionStore;
use crate::storage::KeyValueStorage;
use crate::stores::{ActivityStore, ProjectsStore, TasksStore, UsersStore};
use crate::transport::Transport;
use std::sync::Arc;

/// Fully wired client state
#[derive(Debug, Clone)]
pub struct Taskflow {
    pub client: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub projects: Arc<ProjectsStore>,
    pub tasks: Arc<TasksStore>,
    pub users: Arc<UsersStore>,
    pub activity: Arc<ActivityStore>,
}

impl Taskflow {
    /// Wire stores around an existing client and restore the session
    #[must_use]
    pub fn bootstrap(client: ApiClient, storage: Arc<dyn KeyValueStorage>) -> Self {
        let client = Arc::new(client);
        let session = SessionStore::new(Arc::clone(&client), storage);
        session.hydrate();

        Self {
            projects: Arc::new(ProjectsStore::new(Arc::clone(&client), Arc::clone(&session))),
            tasks: Arc::new(TasksStore::new(Arc::clone(&client), Arc::clone(&session))),
            users: Arc::new(UsersStore::new(Arc::clone(&client), Arc::clone(&session))),
            activity: Arc::new(ActivityStore::new(Arc::clone(&client))),
            client,
            session,
        }
    }

    /// Wire over any transport
    #[must_use]
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        options: RequestOptions,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self::bootstrap(ApiClient::with_options(transport, options), storage)
    }

    /// Wire over the network
    ///
    /// # Errors
    /// [`ConfigError`] when the base URL is relative or malformed, or the
    /// HTTP client cannot be built.
    pub fn connect(config: &ClientConfig, storage: Arc<dyn KeyValueStorage>) -> Result<Self, ConfigError> {
        let client = ApiClient::from_config(config)?;
        tracing::info!(base_url = %config.base_url, "connecting");
        Ok(Self::bootstrap(client, storage))
    }
}
