//! Resource stores
//!
//! One store per resource type. Each wraps CRUD endpoints around an in-memory
//! cache and keeps a single `loading` flag and `error` slot that the most
//! recent operation overwrites. Failures never propagate: they land in the
//! error slot and the method returns `None` / `false`.
//!
//! State lives behind a `parking_lot::RwLock` that is never held across an
//! await, so concurrent calls on one store interleave with last-write-wins
//! semantics.

pub mod activity;
pub mod cache;
pub mod projects;
pub mod tasks;
pub mod users;

pub use activity::ActivityStore;
pub use projects::ProjectsStore;
pub use tasks::TasksStore;
pub use users::UsersStore;

use tf_core::ApiError;

/// Shared `loading` / `error` slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// An operation is in flight
    pub loading: bool,
    /// Failure of the most recent operation
    pub error: Option<ApiError>,
}

impl StoreStatus {
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn settle<T>(&mut self, result: Result<T, ApiError>) -> Option<T> {
        self.loading = false;
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(code = %e.code, message = %e.message, "store operation failed");
                self.error = Some(e);
                None
            }
        }
    }
}
