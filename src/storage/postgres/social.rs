// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Follows and subscriptions.

use async_trait::async_trait;

use super::{expect_rows, store_error, PgStore};
use crate::models::{Follow, Subscription, User};
use crate::storage::{FollowRepository, StoreResult, SubscriptionRepository};

const SUBSCRIPTION_COLUMNS: &str =
    "id, created_at, subscriber_id, creator_id, status, stripe_subscription_id, price";

/// User columns qualified with the `u` alias used in follow joins.
const JOINED_USER_COLUMNS: &str = "u.id, u.created_at, u.email, u.username, u.firstname, \
     u.lastname, u.avatar_url, u.bio, u.language, u.theme, u.is_admin, u.is_creator, \
     u.subscription_price, u.stripe_account_id";

#[async_trait]
impl FollowRepository for PgStore {
    async fn create(&self, follow: &Follow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO follows (id, created_at, follower_id, creator_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(&follow.id)
        .bind(follow.created_at)
        .bind(&follow.follower_id)
        .bind(&follow.creator_id)
        .execute(&self.pool)
        .await
        .map_err(store_error("Follow"))?;
        Ok(())
    }

    async fn delete(&self, follower_id: &str, creator_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND creator_id = $2")
            .bind(follower_id)
            .bind(creator_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Follow"))?;
        expect_rows(result, "Follow")
    }

    async fn is_following(&self, follower_id: &str, creator_id: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND creator_id = $2)",
        )
        .bind(follower_id)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Follow"))
    }

    async fn following(&self, follower_id: &str) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {JOINED_USER_COLUMNS} FROM follows f JOIN users u ON u.id = f.creator_id \
             WHERE f.follower_id = $1 ORDER BY f.created_at DESC"
        ))
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Follow"))
    }

    async fn followers(&self, creator_id: &str) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {JOINED_USER_COLUMNS} FROM follows f JOIN users u ON u.id = f.follower_id \
             WHERE f.creator_id = $1 ORDER BY f.created_at DESC"
        ))
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Follow"))
    }

    async fn count_followers(&self, creator_id: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE creator_id = $1")
            .bind(creator_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Follow"))
    }

    async fn count_following(&self, follower_id: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Follow"))
    }
}

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn find(
        &self,
        subscriber_id: &str,
        creator_id: &str,
    ) -> StoreResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE subscriber_id = $1 AND creator_id = $2 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(subscriber_id)
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Subscription"))
    }

    async fn save(&self, subscription: &Subscription) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO subscriptions \
             (id, created_at, subscriber_id, creator_id, status, stripe_subscription_id, price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             stripe_subscription_id = EXCLUDED.stripe_subscription_id, price = EXCLUDED.price",
        )
        .bind(&subscription.id)
        .bind(subscription.created_at)
        .bind(&subscription.subscriber_id)
        .bind(&subscription.creator_id)
        .bind(subscription.status.as_str())
        .bind(&subscription.stripe_subscription_id)
        .bind(subscription.price)
        .execute(&self.pool)
        .await
        .map_err(store_error("Subscription"))?;
        Ok(())
    }

    async fn count_active_subscribers(&self, creator_id: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE creator_id = $1 AND status = 'active'",
        )
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Subscription"))
    }

    async fn count_active_subscriptions(&self, subscriber_id: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1 AND status = 'active'",
        )
        .bind(subscriber_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Subscription"))
    }
}
