// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Like repository.

use async_trait::async_trait;

use crate::storage::StoreResult;

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Flip the like of `user_id` on `post_id` and return whether the post
    /// is liked afterwards. Read-then-write, not atomic across requests.
    async fn toggle(&self, user_id: &str, post_id: &str) -> StoreResult<bool>;

    async fn is_liked(&self, user_id: &str, post_id: &str) -> StoreResult<bool>;

    async fn count_for_post(&self, post_id: &str) -> StoreResult<i64>;
}
