// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use async_trait::async_trait;

use super::{expect_rows, store_error, to_limit, PgStore};
use crate::models::User;
use crate::storage::{StoreResult, UserRepository};

const USER_COLUMNS: &str = "id, created_at, email, username, firstname, lastname, \
     avatar_url, bio, language, theme, is_admin, is_creator, subscription_price, stripe_account_id";

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, created_at, email, username, firstname, lastname, avatar_url, \
             bio, language, theme, is_admin, is_creator, subscription_price, stripe_account_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(&user.id)
        .bind(user.created_at)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(user.language.as_str())
        .bind(user.theme.as_str())
        .bind(user.is_admin)
        .bind(user.is_creator)
        .bind(user.subscription_price)
        .bind(&user.stripe_account_id)
        .execute(&self.pool)
        .await
        .map_err(store_error("User"))?;
        Ok(())
    }

    async fn get(&self, user_id: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("User"))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("User"))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("User"))
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, username = $3, firstname = $4, lastname = $5, \
             avatar_url = $6, bio = $7, language = $8, theme = $9, is_admin = $10, \
             is_creator = $11, subscription_price = $12, stripe_account_id = $13 WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(user.language.as_str())
        .bind(user.theme.as_str())
        .bind(user.is_admin)
        .bind(user.is_creator)
        .bind(user.subscription_price)
        .bind(&user.stripe_account_id)
        .execute(&self.pool)
        .await
        .map_err(store_error("Username"))?;
        expect_rows(result, "User")
    }

    async fn delete(&self, user_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("User"))?;
        expect_rows(result, "User")
    }

    async fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<User>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username ILIKE $1 OR firstname ILIKE $1 OR lastname ILIKE $1 \
             ORDER BY username LIMIT $2"
        ))
        .bind(pattern)
        .bind(to_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("User"))
    }

    async fn is_admin(&self, user_id: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("User"))
    }
}
