// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{store_error, to_limit, PgStore};
use crate::storage::repository::{
    ActivityCounts, ContentDistribution, PlatformTotals, TopUserByLikes, TopUserByPosts,
};
use crate::storage::{StatsRepository, StoreResult};

#[async_trait]
impl StatsRepository for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error("Database"))?;
        Ok(())
    }

    async fn totals(&self) -> StoreResult<PlatformTotals> {
        let (total_users, creators_count, total_posts, premium_posts, total_likes, total_messages) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
                "SELECT \
                 (SELECT COUNT(*) FROM users), \
                 (SELECT COUNT(*) FROM users WHERE is_creator), \
                 (SELECT COUNT(*) FROM posts), \
                 (SELECT COUNT(*) FROM posts WHERE is_paid), \
                 (SELECT COUNT(*) FROM likes), \
                 (SELECT COUNT(*) FROM messages WHERE NOT is_deleted)",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Stats"))?;

        Ok(PlatformTotals {
            total_users,
            creators_count,
            total_posts,
            premium_posts,
            total_likes,
            total_messages,
        })
    }

    async fn activity_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ActivityCounts> {
        let (users, posts, likes, messages) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT \
             (SELECT COUNT(*) FROM users WHERE created_at >= $1 AND created_at < $2), \
             (SELECT COUNT(*) FROM posts WHERE created_at >= $1 AND created_at < $2), \
             (SELECT COUNT(*) FROM likes WHERE created_at >= $1 AND created_at < $2), \
             (SELECT COUNT(*) FROM messages \
              WHERE NOT is_deleted AND created_at >= $1 AND created_at < $2)",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Stats"))?;

        Ok(ActivityCounts {
            users,
            posts,
            likes,
            messages,
        })
    }

    async fn distribution_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ContentDistribution> {
        let (free_posts, paid_posts, likes, messages) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT \
             (SELECT COUNT(*) FROM posts WHERE NOT is_paid AND created_at BETWEEN $1 AND $2), \
             (SELECT COUNT(*) FROM posts WHERE is_paid AND created_at BETWEEN $1 AND $2), \
             (SELECT COUNT(*) FROM likes WHERE created_at BETWEEN $1 AND $2), \
             (SELECT COUNT(*) FROM messages \
              WHERE NOT is_deleted AND created_at BETWEEN $1 AND $2)",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Stats"))?;

        Ok(ContentDistribution {
            free_posts,
            paid_posts,
            likes,
            messages,
        })
    }

    async fn top_by_posts(&self, limit: usize) -> StoreResult<Vec<TopUserByPosts>> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT p.user_id, COALESCE(u.username, ''), COUNT(*) AS post_count \
             FROM posts p LEFT JOIN users u ON u.id = p.user_id \
             GROUP BY p.user_id, u.username \
             ORDER BY post_count DESC, p.user_id LIMIT $1",
        )
        .bind(to_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Stats"))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, post_count)| TopUserByPosts {
                user_id,
                username,
                post_count,
            })
            .collect())
    }

    async fn top_by_likes(&self, limit: usize) -> StoreResult<Vec<TopUserByLikes>> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT p.user_id, COALESCE(u.username, ''), COUNT(*) AS likes_count \
             FROM likes l JOIN posts p ON p.id = l.post_id \
             LEFT JOIN users u ON u.id = p.user_id \
             GROUP BY p.user_id, u.username \
             ORDER BY likes_count DESC, p.user_id LIMIT $1",
        )
        .bind(to_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Stats"))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, likes_count)| TopUserByLikes {
                user_id,
                username,
                likes_count,
            })
            .collect())
    }
}
