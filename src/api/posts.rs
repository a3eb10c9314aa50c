// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post endpoints.
//!
//! Post views carry the like count and whether the viewer liked the post.
//! Paid posts are filtered through [`super::can_view_paid`].

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use super::{can_view_paid, discard_upload, new_id, post_view, post_views, users::MessageResponse};
use crate::{
    auth::{Auth, OptionalAuth},
    error::ApiError,
    media::{self, MultipartForm, POST_FOLDER},
    models::{Post, PostView},
    state::AppState,
    storage::repository::FeedFilter,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub post: PostView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostCreatedResponse {
    pub message: String,
    pub post: Post,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Include the caller's own paid posts.
    pub paywalled: Option<bool>,
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "on")
}

/// Publish a post (multipart).
///
/// Fields: `title` (required), `description`, `is_paid`, and a required
/// `media` image or video. `is_paid` is ignored for non-creators.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "Posts",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "Post fields and media file"),
    responses(
        (status = 201, body = PostCreatedResponse),
        (status = 400, description = "Missing title or media, bad extension"),
        (status = 502, description = "Media upload failed")
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PostCreatedResponse>), ApiError> {
    let mut form = MultipartForm::read(multipart).await?;
    let Some(title) = form.text("title").map(str::to_string) else {
        return Err(ApiError::bad_request("Title is required"));
    };
    let Some(file) = form.take_file("media") else {
        return Err(ApiError::bad_request("Media file is required"));
    };
    let extension = file.extension();
    if !media::is_post_media(&extension) {
        return Err(ApiError::bad_request("Invalid file extension"));
    }

    let author = state.repos.users.get(&identity.user_id).await?;
    let is_paid = author.is_creator && form.text("is_paid").is_some_and(is_truthy);

    let post_id = new_id();
    let media_url = state
        .media
        .put(
            POST_FOLDER,
            &media::post_file_name(&post_id, &extension),
            &file.content_type,
            file.bytes,
        )
        .await
        .map_err(|e| ApiError::upstream("Media upload failed", e.to_string()))?;

    let post = Post {
        id: post_id,
        created_at: Utc::now(),
        user_id: author.id,
        title,
        description: form.text_or_default("description"),
        media_url,
        is_paid,
    };
    if let Err(e) = state.repos.posts.create(&post).await {
        discard_upload(&state, &post.media_url).await;
        return Err(e.into());
    }
    info!(post_id = %post.id, user_id = %post.user_id, is_paid, "post created");

    Ok((
        StatusCode::CREATED,
        Json(PostCreatedResponse {
            message: "Post created".to_string(),
            post,
        }),
    ))
}

/// Feed of free posts, newest first.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(FeedQuery),
    tag = "Posts",
    responses((status = 200, body = PostListResponse))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<FeedQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let viewer_id = viewer.as_ref().map(|v| v.user_id.as_str());
    let filter = FeedFilter {
        include_paid_of: viewer_id
            .filter(|_| query.paywalled.unwrap_or(false))
            .map(str::to_string),
    };
    let posts = state.repos.posts.list_feed(&filter).await?;
    Ok(Json(PostListResponse {
        posts: post_views(&state, posts, viewer_id).await?,
    }))
}

/// A single post. Paid posts need the owner or an active subscriber.
#[utoipa::path(
    get,
    path = "/api/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    responses(
        (status = 200, body = PostResponse),
        (status = 403, description = "Paid post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let viewer_id = viewer.as_ref().map(|v| v.user_id.as_str());
    let post = state.repos.posts.get(&post_id).await?;
    if post.is_paid && !can_view_paid(&state, viewer_id, &post.user_id).await? {
        return Err(ApiError::forbidden("Subscription required"));
    }
    Ok(Json(PostResponse {
        post: post_view(&state, post, viewer_id).await?,
    }))
}

/// The caller's own posts, paid included.
#[utoipa::path(
    get,
    path = "/api/posts/me",
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses((status = 200, body = PostListResponse))
)]
pub async fn list_my_posts(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<PostListResponse>, ApiError> {
    let posts = state
        .repos
        .posts
        .list_by_user(&identity.user_id, true)
        .await?;
    Ok(Json(PostListResponse {
        posts: post_views(&state, posts, Some(&identity.user_id)).await?,
    }))
}

/// Posts of a user. Paid posts only when the viewer may see them.
#[utoipa::path(
    get,
    path = "/api/users/username/{username}/posts",
    params(("username" = String, Path, description = "Username")),
    tag = "Posts",
    responses(
        (status = 200, body = PostListResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_profile_posts(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(username): Path<String>,
) -> Result<Json<PostListResponse>, ApiError> {
    let Some(owner) = state.repos.users.find_by_username(&username).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    let viewer_id = viewer.as_ref().map(|v| v.user_id.as_str());
    let include_paid = can_view_paid(&state, viewer_id, &owner.id).await?;
    let posts = state.repos.posts.list_by_user(&owner.id, include_paid).await?;
    Ok(Json(PostListResponse {
        posts: post_views(&state, posts, viewer_id).await?,
    }))
}

/// Delete one of your posts and its media.
#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Post not found or not yours"),
        (status = 500, description = "Media deletion failed")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(post_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let post = state.repos.posts.get(&post_id).await?;
    if post.user_id != identity.user_id {
        return Err(ApiError::not_found("Post not found"));
    }

    if !post.media_url.is_empty() {
        state.media.delete_by_url(&post.media_url).await.map_err(|e| {
            error!(post_id = %post.id, error = %e, "post media deletion failed");
            ApiError::internal("Failed to delete post media").with_details(e.to_string())
        })?;
    }
    state.repos.posts.delete(&post.id).await?;
    info!(post_id = %post.id, "post deleted");

    Ok(Json(MessageResponse {
        message: "Post deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Subscription, SubscriptionStatus};
    use crate::testing::TestContext;
    use axum::http::Method;

    async fn subscribe(ctx: &TestContext, subscriber: &str, creator: &str) {
        ctx.state
            .repos
            .subscriptions
            .save(&Subscription {
                id: format!("sub-{subscriber}-{creator}"),
                created_at: Utc::now(),
                subscriber_id: subscriber.to_string(),
                creator_id: creator.to_string(),
                status: SubscriptionStatus::Active,
                stripe_subscription_id: None,
                price: 5.0,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn creator_can_publish_paid_post() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;

        let response = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/posts",
                Some(&carol),
                &[("title", "Behind the scenes"), ("is_paid", "true")],
                &[("media", "clip.MP4", b"video")],
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["post"]["is_paid"], true);
        let id = response.json["post"]["id"].as_str().unwrap();
        let url = response.json["post"]["media_url"].as_str().unwrap();
        assert_eq!(url, format!("https://media.test/posts/post_{id}.mp4"));
        assert!(ctx.media.contains(url));
    }

    #[tokio::test]
    async fn non_creator_posts_are_always_free() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;

        let response = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/posts",
                Some(&alice),
                &[("title", "Hi"), ("is_paid", "true")],
                &[("media", "a.png", b"png")],
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["post"]["is_paid"], false);
    }

    #[tokio::test]
    async fn post_requires_title_and_supported_media() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;

        let no_title = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/posts",
                Some(&alice),
                &[],
                &[("media", "a.png", b"png")],
            ))
            .await;
        assert_eq!(no_title.status, StatusCode::BAD_REQUEST);

        let bad_media = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/posts",
                Some(&alice),
                &[("title", "Doc")],
                &[("media", "notes.pdf", b"pdf")],
            ))
            .await;
        assert_eq!(bad_media.status, StatusCode::BAD_REQUEST);
        assert_eq!(ctx.media.len(), 0);
    }

    #[tokio::test]
    async fn feed_hides_paid_posts_unless_paywalled_for_owner() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;
        ctx.seed_post("free", &carol, false).await;
        ctx.seed_post("paid", &carol, true).await;

        let anonymous = ctx
            .send(TestContext::request(Method::GET, "/api/posts", None, None))
            .await;
        assert_eq!(anonymous.status, StatusCode::OK);
        assert_eq!(anonymous.json["posts"].as_array().unwrap().len(), 1);
        assert_eq!(anonymous.json["posts"][0]["id"], "free");
        assert_eq!(anonymous.json["posts"][0]["like_count"], 0);

        let owner = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts?paywalled=true",
                Some(&carol),
                None,
            ))
            .await;
        assert_eq!(owner.json["posts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn paid_post_detail_requires_subscription() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;
        let fan = ctx.seed_user("f1", "fan").await;
        ctx.seed_post("paid", &carol, true).await;

        let before = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts/paid",
                Some(&fan),
                None,
            ))
            .await;
        assert_eq!(before.status, StatusCode::FORBIDDEN);

        subscribe(&ctx, "f1", "c1").await;
        let after = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts/paid",
                Some(&fan),
                None,
            ))
            .await;
        assert_eq!(after.status, StatusCode::OK);
        assert_eq!(after.json["post"]["is_liked"], false);
    }

    #[tokio::test]
    async fn profile_posts_include_paid_for_subscribers() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;
        let fan = ctx.seed_user("f1", "fan").await;
        ctx.seed_post("free", &carol, false).await;
        ctx.seed_post("paid", &carol, true).await;
        subscribe(&ctx, "f1", "c1").await;

        let anonymous = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/users/username/carol/posts",
                None,
                None,
            ))
            .await;
        assert_eq!(anonymous.json["posts"].as_array().unwrap().len(), 1);

        let subscriber = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/users/username/carol/posts",
                Some(&fan),
                None,
            ))
            .await;
        assert_eq!(subscriber.json["posts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn my_posts_include_paid() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;
        ctx.seed_post("free", &carol, false).await;
        ctx.seed_post("paid", &carol, true).await;

        let response = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/posts/me",
                Some(&carol),
                None,
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["posts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn only_owner_can_delete_post() {
        let ctx = TestContext::new();
        let carol = ctx.seed_creator("c1", "carol").await;
        let mallory = ctx.seed_user("m1", "mallory").await;
        let post = ctx.seed_post("p1", &carol, false).await;
        ctx.state
            .media
            .put("posts", "post_p1.png", "image/png", b"png".to_vec())
            .await
            .unwrap();
        assert!(ctx.media.contains(&post.media_url));

        let stranger = ctx
            .send(TestContext::request(
                Method::DELETE,
                "/api/posts/p1",
                Some(&mallory),
                None,
            ))
            .await;
        assert_eq!(stranger.status, StatusCode::NOT_FOUND);

        let owner = ctx
            .send(TestContext::request(
                Method::DELETE,
                "/api/posts/p1",
                Some(&carol),
                None,
            ))
            .await;
        assert_eq!(owner.status, StatusCode::OK);
        assert!(!ctx.media.contains(&post.media_url));
        assert!(ctx.state.repos.posts.get("p1").await.is_err());
    }
}
