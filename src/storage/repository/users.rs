// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.

use async_trait::async_trait;

use crate::models::User;
use crate::storage::StoreResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Conflict` when the id, email or
    /// username is already taken.
    async fn create(&self, user: &User) -> StoreResult<()>;

    async fn get(&self, user_id: &str) -> StoreResult<User>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Replace the stored record. Fails with `Conflict` on a username
    /// collision with another user.
    async fn update(&self, user: &User) -> StoreResult<()>;

    async fn delete(&self, user_id: &str) -> StoreResult<()>;

    /// Case-insensitive substring match on username, first and last name.
    async fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<User>>;

    /// Persisted admin flag. `NotFound` when the user is unknown.
    async fn is_admin(&self, user_id: &str) -> StoreResult<bool>;
}
