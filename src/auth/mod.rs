// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer tokens are HS256 JWTs issued by the identity provider and signed
//! with the shared `JWT_SECRET`.
//!
//! ## Request Pipeline
//!
//! 1. A gate middleware ([`middleware::require_auth`] or
//!    [`middleware::optional_auth`]) runs [`gate::authenticate`].
//! 2. An expired token is exchanged for a new one when the client sent
//!    `X-Refresh-Token`; the new token is echoed in `X-New-Access-Token`.
//! 3. The resolved [`RequestIdentity`] is stored in request extensions and
//!    read by handlers through the [`Auth`], [`OptionalAuth`] and
//!    [`AdminOnly`] extractors.
//!
//! ## Expiry
//!
//! Expiry is always authoritative: an expired token without a refresh
//! credential is rejected before its signature is looked at.

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod middleware;
pub mod roles;

pub use claims::{RequestIdentity, TokenClaims};
pub use codec::TokenCodec;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use gate::{authenticate, GateMode, GateOutcome};
pub use roles::{require_role, Role};

/// Header carrying the client's refresh credential.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Header carrying a token issued during the request.
pub const NEW_ACCESS_TOKEN_HEADER: &str = "x-new-access-token";
