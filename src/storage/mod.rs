// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistence
//!
//! Every resource is reached through a repository trait declared in
//! [`repository`]. A [`Repositories`] bundle is built once at startup and
//! handed to handlers through `AppState`, so no handler touches a global
//! database handle.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - hash maps behind a tokio `RwLock`. Used by the test
//!   suite and when no `DATABASE_URL` is configured.
//! - [`PgStore`] - Postgres through `sqlx`, schema in `migrations/`.
//!
//! Handlers perform read-then-write sequences (like toggles, deletion
//! markers) without cross-request locking. Two concurrent requests on the
//! same row may race; the store's row-level consistency is all that is
//! guaranteed.

use std::sync::Arc;

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    CommentRepository, FollowRepository, LikeRepository, MessageRepository, PostRepository,
    ReportRepository, StatsRepository, SubscriptionRepository, UserRepository,
};

/// Errors surfaced by repositories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist. Carries the resource name.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique constraint rejected the write. Carries the resource name.
    #[error("{0} already exists")]
    Conflict(String),

    /// Any other backend failure.
    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Repository handles injected into request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub stats: Arc<dyn StatsRepository>,
}

impl Repositories {
    /// Wire every repository to the same backend.
    pub fn from_backend<S>(backend: S) -> Self
    where
        S: UserRepository
            + PostRepository
            + CommentRepository
            + LikeRepository
            + FollowRepository
            + SubscriptionRepository
            + MessageRepository
            + ReportRepository
            + StatsRepository
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(backend.clone()),
            posts: Arc::new(backend.clone()),
            comments: Arc::new(backend.clone()),
            likes: Arc::new(backend.clone()),
            follows: Arc::new(backend.clone()),
            subscriptions: Arc::new(backend.clone()),
            messages: Arc::new(backend.clone()),
            reports: Arc::new(backend.clone()),
            stats: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(MemoryStore::new())
    }
}
