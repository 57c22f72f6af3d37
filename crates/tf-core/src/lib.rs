//! Taskflow Core - shared domain model
//!
//! Types every other crate in the workspace speaks:
//! - Server-owned records (users, projects, tasks, comments, activity)
//! - Prefixed opaque identifiers
//! - The `ApiError` taxonomy
//! - The role → permission table
//!
//! # Example
//!
//! ```rust
//! use tf_core::{check_permission, Permission, UserRole};
//!
//! assert!(check_permission(Some(UserRole::Admin), Permission::ProjectsCreate).is_ok());
//! assert!(check_permission(Some(UserRole::Member), Permission::ProjectsCreate).is_err());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod ids;
pub mod permissions;
pub mod types;

pub use error::{
    ApiError, ApiErrorCode, GENERIC_FAILURE_MESSAGE, PERMISSION_DENIED_MESSAGE,
    SESSION_EXPIRED_MESSAGE,
};
pub use ids::{CommentId, EventId, ProjectId, TaskId, UserId};
pub use permissions::{check_permission, has_permission, permissions_for, Permission};
pub use types::{
    ActivityAction, ActivityEvent, AuthToken, CommentPayload, CreateProjectPayload,
    CreateTaskPayload, DeleteAck, DueDate, Identified, LoginPayload, Project, ProjectStatus,
    RegisterPayload, Session, Task, TaskComment, TaskPatch, TaskPriority, TaskStatus,
    UpdateProjectPayload, User, UserRole,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
