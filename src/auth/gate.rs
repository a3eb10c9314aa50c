// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token pipeline shared by both auth gates.
//!
//! ```text
//! header -> decode (unverified) -> exp check -> [refresh] -> verify -> claims
//! ```
//!
//! The required and optional gates differ only in what they do with an
//! error (abort vs. continue anonymously) and in whether `email` must be
//! present.

use tracing::{debug, warn};

use super::codec::expiry_of;
use super::{AuthError, RequestIdentity, TokenCodec};
use crate::providers::IdentityProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Abort on failure; `email` claim required.
    Required,
    /// Continue without identity on failure; `email` optional.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub identity: RequestIdentity,
    /// Access token issued by a refresh during this request.
    pub refreshed_token: Option<String>,
}

/// Runs the token pipeline for one request.
///
/// `now` is the current unix time in seconds.
pub async fn authenticate(
    codec: &TokenCodec,
    identity_provider: &dyn IdentityProvider,
    authorization: Option<&str>,
    refresh_token: Option<&str>,
    mode: GateMode,
    now: i64,
) -> Result<GateOutcome, AuthError> {
    let header = authorization.ok_or(AuthError::MissingAuthHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)?;

    let unverified = TokenCodec::decode_unverified(token);
    if unverified.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    let exp = expiry_of(&unverified).ok_or(AuthError::MissingExpiry)?;

    let mut refreshed_token = None;
    if now > exp {
        let refresh_token = refresh_token
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::TokenExpired)?;

        let grant = identity_provider.refresh(refresh_token).await.map_err(|e| {
            warn!(error = %e, "token refresh failed");
            AuthError::RefreshFailed(e.to_string())
        })?;
        let sub = unverified
            .get("sub")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        debug!(sub, "access token refreshed");
        refreshed_token = Some(grant.access_token);
    }

    let verified_token = refreshed_token.as_deref().unwrap_or(token);
    let claims = codec.verify(verified_token)?;

    let user_id = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or(AuthError::MissingClaims)?;
    let email = claims.email.filter(|email| !email.is_empty());
    if mode == GateMode::Required && email.is_none() {
        return Err(AuthError::MissingClaims);
    }

    Ok(GateOutcome {
        identity: RequestIdentity { user_id, email },
        refreshed_token,
    })
}
