// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Follow repository.

use async_trait::async_trait;

use crate::models::{Follow, User};
use crate::storage::StoreResult;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Fails with `Conflict` when the follower already follows the creator.
    async fn create(&self, follow: &Follow) -> StoreResult<()>;

    /// Fails with `NotFound` when there is no such follow.
    async fn delete(&self, follower_id: &str, creator_id: &str) -> StoreResult<()>;

    async fn is_following(&self, follower_id: &str, creator_id: &str) -> StoreResult<bool>;

    /// Users followed by `follower_id`.
    async fn following(&self, follower_id: &str) -> StoreResult<Vec<User>>;

    /// Users following `creator_id`.
    async fn followers(&self, creator_id: &str) -> StoreResult<Vec<User>>;

    async fn count_followers(&self, creator_id: &str) -> StoreResult<i64>;

    async fn count_following(&self, follower_id: &str) -> StoreResult<i64>;
}
