//! Taskflow Client - state and data-access layer
//!
//! Everything between the UI and the REST API:
//! - A pluggable [`Transport`] with a `reqwest` implementation
//! - [`ApiClient`]: bearer injection, bounded retries, error normalization
//! - [`SessionStore`]: persisted authentication state
//! - Resource stores caching projects, tasks, comments, users and activity
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tf_client::{ClientConfig, MemoryStorage, Taskflow};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new().with_base_url("http://127.0.0.1:4000/api");
//! let app = Taskflow::connect(&config, Arc::new(MemoryStorage::new()))?;
//!
//! if app.session.login("admin@taskflow.pro", "Admin123!").await {
//!     app.projects.fetch_all().await;
//!     println!("{} projects", app.projects.items().len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod app;
pub mod config;
pub mod endpoints;
pub mod http;
pub mod permissions;
pub mod session;
pub mod storage;
pub mod stores;
pub mod transport;

pub use app::Taskflow;
pub use config::{ClientConfig, ConfigError, DEFAULT_BASE_URL};
pub use http::{
    normalize_error, should_retry, ApiClient, RequestOptions, TokenProvider, UnauthorizedHandler,
    UNEXPECTED_RESPONSE_MESSAGE,
};
pub use permissions::assert_permission;
pub use session::{SessionStore, SESSION_STORAGE_KEY};
pub use storage::{
    read_json, write_json, FileStorage, KeyValueStorage, MemoryStorage, StorageError,
};
pub use stores::{ActivityStore, ProjectsStore, StoreStatus, TasksStore, UsersStore};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the client
    pub use crate::{
        ApiClient, ClientConfig, HttpRequest, HttpResponse, KeyValueStorage, MemoryStorage,
        RequestOptions, SessionStore, Taskflow, Transport, TransportError,
    };
    pub use tf_core::{ApiError, ApiErrorCode, Permission, ProjectId, TaskId, TaskStatus, UserId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
