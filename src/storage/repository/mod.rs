// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository traits, one per resource.
//!
//! Each trait is object safe and `Send + Sync` so it can live behind an
//! `Arc<dyn _>` in the application state.

pub mod comments;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod posts;
pub mod reports;
pub mod stats;
pub mod subscriptions;
pub mod users;

pub use comments::CommentRepository;
pub use follows::FollowRepository;
pub use likes::LikeRepository;
pub use messages::{MessagePage, MessageRepository};
pub use posts::{FeedFilter, PostCounts, PostRepository};
pub use reports::{ReportFilter, ReportPage, ReportRepository, ReportStats};
pub use stats::{
    ActivityCounts, ContentDistribution, PlatformTotals, StatsRepository, TopUserByLikes,
    TopUserByPosts,
};
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;
