//! Permission gate consulted before mutating calls

use crate::session::SessionStore;
use tf_core::{check_permission, ApiError, Permission};

/// Fail with FORBIDDEN unless the signed-in role holds `permission`
///
/// Runs synchronously, before any request is issued.
///
/// # Errors
/// FORBIDDEN [`ApiError`] when the permission is missing or nobody is signed in.
pub fn assert_permission(session: &SessionStore, permission: Permission) -> Result<(), ApiError> {
    check_permission(session.role(), permission).map_err(|e| {
        tracing::debug!(%permission, "permission denied");
        e
    })
}
