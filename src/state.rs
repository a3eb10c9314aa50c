// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::providers::{BillingProvider, IdentityProvider, ObjectStorage};
use crate::storage::Repositories;

/// Request-independent settings read by handlers.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Frontend origin used to build billing redirect URLs.
    pub domain_url: String,
    pub stripe_webhook_secret: String,
    pub cors_allowed_origins: Vec<String>,
}

/// Shared handles injected into every handler and gate.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub identity: Arc<dyn IdentityProvider>,
    pub media: Arc<dyn ObjectStorage>,
    pub billing: Arc<dyn BillingProvider>,
    pub tokens: TokenCodec,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        identity: Arc<dyn IdentityProvider>,
        media: Arc<dyn ObjectStorage>,
        billing: Arc<dyn BillingProvider>,
        tokens: TokenCodec,
        settings: Settings,
    ) -> Self {
        Self {
            repos,
            identity,
            media,
            billing,
            tokens,
            settings: Arc::new(settings),
        }
    }
}
