// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Comment repository.

use async_trait::async_trait;

use crate::models::Comment;
use crate::storage::StoreResult;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> StoreResult<()>;

    async fn get(&self, comment_id: &str) -> StoreResult<Comment>;

    /// Comments of a post, newest first.
    async fn list_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>>;

    async fn delete(&self, comment_id: &str) -> StoreResult<()>;
}
