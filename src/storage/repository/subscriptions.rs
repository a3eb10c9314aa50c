// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Subscription repository.

use async_trait::async_trait;

use crate::models::Subscription;
use crate::storage::StoreResult;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The subscription of `subscriber_id` to `creator_id`, whatever its
    /// status.
    async fn find(&self, subscriber_id: &str, creator_id: &str)
        -> StoreResult<Option<Subscription>>;

    /// Insert or replace by id.
    async fn save(&self, subscription: &Subscription) -> StoreResult<()>;

    async fn count_active_subscribers(&self, creator_id: &str) -> StoreResult<i64>;

    async fn count_active_subscriptions(&self, subscriber_id: &str) -> StoreResult<i64>;
}
