//! Role-based permission table
//!
//! A pure mapping from [`UserRole`] to the actions it may perform. There are
//! no ownership checks: a member holding `tasks:update` may update any task
//! they can see.

use crate::error::ApiError;
use crate::types::UserRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "projects:create")]
    ProjectsCreate,
    #[serde(rename = "projects:update")]
    ProjectsUpdate,
    #[serde(rename = "projects:delete")]
    ProjectsDelete,
    #[serde(rename = "users:manage")]
    UsersManage,
    #[serde(rename = "tasks:create")]
    TasksCreate,
    #[serde(rename = "tasks:update")]
    TasksUpdate,
}

impl Permission {
    /// Every permission, in table order
    pub const ALL: [Permission; 6] = [
        Permission::ProjectsCreate,
        Permission::ProjectsUpdate,
        Permission::ProjectsDelete,
        Permission::UsersManage,
        Permission::TasksCreate,
        Permission::TasksUpdate,
    ];

    /// Wire representation (`resource:action`)
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectsCreate => "projects:create",
            Self::ProjectsUpdate => "projects:update",
            Self::ProjectsDelete => "projects:delete",
            Self::UsersManage => "users:manage",
            Self::TasksCreate => "tasks:create",
            Self::TasksUpdate => "tasks:update",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &Permission::ALL;

const MEMBER_PERMISSIONS: &[Permission] = &[Permission::TasksCreate, Permission::TasksUpdate];

/// Permissions granted to a role
#[inline]
#[must_use]
pub fn permissions_for(role: UserRole) -> &'static [Permission] {
    match role {
        UserRole::Admin => ADMIN_PERMISSIONS,
        UserRole::Member => MEMBER_PERMISSIONS,
    }
}

/// Whether an (optional) role holds a permission
///
/// Anonymous callers hold nothing.
#[inline]
#[must_use]
pub fn has_permission(role: Option<UserRole>, permission: Permission) -> bool {
    role.is_some_and(|r| permissions_for(r).contains(&permission))
}

/// Fail with FORBIDDEN unless the role holds the permission
///
/// # Errors
/// [`ApiError::permission_denied`] when the permission is absent.
pub fn check_permission(role: Option<UserRole>, permission: Permission) -> Result<(), ApiError> {
    if has_permission(role, permission) {
        Ok(())
    } else {
        Err(ApiError::permission_denied())
    }
}

impl UserRole {
    /// Whether this role holds a permission
    #[inline]
    #[must_use]
    pub fn can(self, permission: Permission) -> bool {
        has_permission(Some(self), permission)
    }
}
