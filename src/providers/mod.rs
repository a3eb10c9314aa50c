// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External service clients.
//!
//! Each provider is consumed through a narrow `async_trait` so handlers can
//! be exercised against in-memory fakes:
//!
//! - [`identity`] - signup, password login, token refresh, logout and admin
//!   deletion against the Supabase auth API.
//! - [`storage`] - media uploads to an S3 bucket.
//! - [`billing`] - Stripe connected accounts and subscription checkout.
//! - [`webhook`] - Stripe webhook signature verification.

use std::time::Duration;

pub mod billing;
pub mod identity;
pub mod storage;
pub mod webhook;

pub use billing::{BillingError, BillingProvider, CheckoutRequest, StripeClient};
pub use identity::{IdentityError, IdentityProvider, IdentityUser, SupabaseAuthClient, TokenGrant};
pub use storage::{ObjectStorage, S3Storage, StorageError};
pub use webhook::{verify_webhook, WebhookError, WebhookEvent};

/// Timeout applied to every outbound provider call.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}
