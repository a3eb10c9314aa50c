// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post repository.

use async_trait::async_trait;

use crate::models::Post;
use crate::storage::StoreResult;

/// Which posts the public feed returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Also include the paid posts authored by this user.
    pub include_paid_of: Option<String>,
}

/// Post counters for a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCounts {
    pub total: i64,
    pub paid: i64,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> StoreResult<()>;

    async fn get(&self, post_id: &str) -> StoreResult<Post>;

    /// Posts of one author, newest first. Paid posts only when
    /// `include_paid` is set.
    async fn list_by_user(&self, user_id: &str, include_paid: bool) -> StoreResult<Vec<Post>>;

    /// Free posts of everyone, newest first, widened by `filter`.
    async fn list_feed(&self, filter: &FeedFilter) -> StoreResult<Vec<Post>>;

    async fn delete(&self, post_id: &str) -> StoreResult<()>;

    async fn counts_for_user(&self, user_id: &str) -> StoreResult<PostCounts>;
}
