// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Posts, comments and likes.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{expect_rows, store_error, PgStore};
use crate::models::{Comment, Post};
use crate::storage::repository::{FeedFilter, PostCounts};
use crate::storage::{CommentRepository, LikeRepository, PostRepository, StoreResult};

const POST_COLUMNS: &str = "id, created_at, user_id, title, description, media_url, is_paid";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, created_at, updated_at";

#[async_trait]
impl PostRepository for PgStore {
    async fn create(&self, post: &Post) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, created_at, user_id, title, description, media_url, is_paid) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&post.id)
        .bind(post.created_at)
        .bind(&post.user_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.media_url)
        .bind(post.is_paid)
        .execute(&self.pool)
        .await
        .map_err(store_error("Post"))?;
        Ok(())
    }

    async fn get(&self, post_id: &str) -> StoreResult<Post> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Post"))
    }

    async fn list_by_user(&self, user_id: &str, include_paid: bool) -> StoreResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE user_id = $1 AND ($2 OR NOT is_paid) ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(include_paid)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Post"))
    }

    async fn list_feed(&self, filter: &FeedFilter) -> StoreResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE NOT is_paid OR user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(filter.include_paid_of.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Post"))
    }

    async fn delete(&self, post_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Post"))?;
        expect_rows(result, "Post")
    }

    async fn counts_for_user(&self, user_id: &str) -> StoreResult<PostCounts> {
        let (total, paid) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_paid) FROM posts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Post"))?;
        Ok(PostCounts { total, paid })
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn create(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Comment"))?;
        Ok(())
    }

    async fn get(&self, comment_id: &str) -> StoreResult<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Comment"))
    }

    async fn list_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at DESC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Comment"))
    }

    async fn delete(&self, comment_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Comment"))?;
        expect_rows(result, "Comment")
    }
}

#[async_trait]
impl LikeRepository for PgStore {
    async fn toggle(&self, user_id: &str, post_id: &str) -> StoreResult<bool> {
        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Like"))?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO likes (id, created_at, user_id, post_id) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(Utc::now())
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(store_error("Like"))?;
        Ok(true)
    }

    async fn is_liked(&self, user_id: &str, post_id: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Like"))
    }

    async fn count_for_post(&self, post_id: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Like"))
    }
}
