// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role gate backed by the persisted user flags.

use tracing::{error, warn};

use super::{AuthError, RequestIdentity};
use crate::storage::{StoreError, UserRepository};

/// Roles a route can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Users with the `is_admin` flag
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Checks that `identity` holds `role`.
///
/// The flag lookup is not retried. A user missing from the store is
/// forbidden; any other store failure is an internal error.
pub async fn require_role(
    users: &dyn UserRepository,
    identity: Option<&RequestIdentity>,
    role: Role,
) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::MissingAuthHeader)?;

    match users.is_admin(&identity.user_id).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(user_id = %identity.user_id, %role, "role check denied");
            Err(AuthError::InsufficientPermissions)
        }
        Err(StoreError::NotFound(_)) => {
            warn!(user_id = %identity.user_id, %role, "role check for unknown user");
            Err(AuthError::InsufficientPermissions)
        }
        Err(e) => {
            error!(user_id = %identity.user_id, error = %e, "role lookup failed");
            Err(AuthError::InternalError(e.to_string()))
        }
    }
}
