// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the identity resolved by the auth gates.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity.user_id is the token subject
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{require_role, AuthError, RequestIdentity, Role};
use crate::state::AppState;

/// Identity of a request that passed the required gate.
///
/// Rejects with 401 when mounted on a route without the gate.
pub struct Auth(pub RequestIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Identity if the optional gate resolved one.
pub struct OptionalAuth(pub Option<RequestIdentity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<RequestIdentity>().cloned()))
    }
}

/// Identity of an authenticated admin. Runs the role gate.
pub struct AdminOnly(pub RequestIdentity);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<RequestIdentity>().cloned();
        require_role(state.repos.users.as_ref(), identity.as_ref(), Role::Admin).await?;
        identity.map(AdminOnly).ok_or(AuthError::MissingAuthHeader)
    }
}
