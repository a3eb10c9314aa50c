// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, OptionalAuth},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeStatus {
    pub post_id: String,
    pub like_count: i64,
    pub is_liked: bool,
}

/// Like or unlike a post.
#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/like",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = LikeStatus),
        (status = 404, description = "Post not found")
    )
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(post_id): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let post = state.repos.posts.get(&post_id).await?;
    let is_liked = state.repos.likes.toggle(&identity.user_id, &post.id).await?;
    let like_count = state.repos.likes.count_for_post(&post.id).await?;
    debug!(post_id = %post.id, user_id = %identity.user_id, is_liked, "like toggled");

    Ok(Json(LikeStatus {
        post_id: post.id,
        like_count,
        is_liked,
    }))
}

/// Like count of a post and whether the viewer liked it.
#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/likes",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    responses(
        (status = 200, body = LikeStatus),
        (status = 404, description = "Post not found")
    )
)]
pub async fn like_status(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> Result<Json<LikeStatus>, ApiError> {
    let post = state.repos.posts.get(&post_id).await?;
    let like_count = state.repos.likes.count_for_post(&post.id).await?;
    let is_liked = match &viewer {
        Some(viewer) => state.repos.likes.is_liked(&viewer.user_id, &post.id).await?,
        None => false,
    };
    Ok(Json(LikeStatus {
        post_id: post.id,
        like_count,
        is_liked,
    }))
}

#[cfg(test)]
mod tests {
    use crate::testing::TestContext;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn toggling_twice_restores_original_state() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        ctx.seed_post("p1", &alice, false).await;

        let first = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/posts/p1/like",
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.json["is_liked"], true);
        assert_eq!(first.json["like_count"], 1);

        let second = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/posts/p1/like",
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(second.json["is_liked"], false);
        assert_eq!(second.json["like_count"], 0);
    }

    #[tokio::test]
    async fn like_status_is_personalized() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        ctx.seed_post("p1", &alice, false).await;
        ctx.state.repos.likes.toggle("u2", "p1").await.unwrap();

        let as_bob = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts/p1/likes",
                Some(&bob),
                None,
            ))
            .await;
        assert_eq!(as_bob.json["is_liked"], true);
        assert_eq!(as_bob.json["like_count"], 1);

        let anonymous = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts/p1/likes",
                None,
                None,
            ))
            .await;
        assert_eq!(anonymous.json["is_liked"], false);
    }

    #[tokio::test]
    async fn liking_missing_post_is_404() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;

        let response = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/posts/nope/like",
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
