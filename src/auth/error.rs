// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures of the auth gates and the role gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header is not `Bearer <token>`
    InvalidAuthHeader,
    /// Token payload could not be decoded
    MalformedToken,
    /// Token has no usable `exp` claim
    MissingExpiry,
    /// Token has expired and no refresh credential was supplied
    TokenExpired,
    /// The refresh grant failed; carries the provider diagnostic
    RefreshFailed(String),
    /// Token is not signed with an accepted algorithm
    InvalidSignature,
    /// Signature or structural validation failed
    InvalidToken,
    /// `sub` (or `email` where required) is missing
    MissingClaims,
    /// Authenticated but lacking the required role
    InsufficientPermissions,
    /// Role lookup failed
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingExpiry => "missing_expiry",
            AuthError::TokenExpired => "token_expired",
            AuthError::RefreshFailed(_) => "refresh_failed",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidToken => "invalid_token",
            AuthError::MissingClaims => "missing_claims",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::MissingExpiry => write!(f, "Token has no expiry"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::RefreshFailed(msg) => write!(f, "Token refresh failed: {msg}"),
            AuthError::InvalidSignature => write!(f, "Token signature algorithm is not accepted"),
            AuthError::InvalidToken => write!(f, "Token is invalid"),
            AuthError::MissingClaims => write!(f, "Token is missing required claims"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
