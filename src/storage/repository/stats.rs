// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Aggregates for the admin dashboard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoreResult;

/// All-time platform totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlatformTotals {
    pub total_users: i64,
    pub creators_count: i64,
    pub total_posts: i64,
    pub premium_posts: i64,
    pub total_likes: i64,
    /// Messages not soft-deleted.
    pub total_messages: i64,
}

/// Records created within a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActivityCounts {
    pub users: i64,
    pub posts: i64,
    pub likes: i64,
    pub messages: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContentDistribution {
    pub free_posts: i64,
    pub paid_posts: i64,
    pub likes: i64,
    pub messages: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TopUserByPosts {
    pub user_id: String,
    pub username: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TopUserByLikes {
    pub user_id: String,
    pub username: String,
    pub likes_count: i64,
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    async fn totals(&self) -> StoreResult<PlatformTotals>;

    /// Records created in `[start, end)`.
    async fn activity_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ActivityCounts>;

    /// Records created in `[start, end]`.
    async fn distribution_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ContentDistribution>;

    async fn top_by_posts(&self, limit: usize) -> StoreResult<Vec<TopUserByPosts>>;

    /// Ranked by likes received on authored posts.
    async fn top_by_likes(&self, limit: usize) -> StoreResult<Vec<TopUserByLikes>>;
}
