// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{can_view_paid, new_id, users::MessageResponse};
use crate::{
    auth::{Auth, OptionalAuth},
    error::ApiError,
    models::{Comment, Post},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentCreatedResponse {
    pub message: String,
    pub comment: Comment,
}

async fn visible_post(
    state: &AppState,
    post_id: &str,
    viewer_id: Option<&str>,
) -> Result<Post, ApiError> {
    let post = state.repos.posts.get(post_id).await?;
    if post.is_paid && !can_view_paid(state, viewer_id, &post.user_id).await? {
        return Err(ApiError::forbidden("Subscription required"));
    }
    Ok(post)
}

/// Comments of a post, newest first.
#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    responses(
        (status = 200, body = CommentListResponse),
        (status = 403, description = "Paid post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let viewer_id = viewer.as_ref().map(|v| v.user_id.as_str());
    let post = visible_post(&state, &post_id, viewer_id).await?;
    let comments = state.repos.comments.list_for_post(&post.id).await?;
    Ok(Json(CommentListResponse { comments }))
}

/// Comment on a post.
#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "Posts",
    security(("bearer_auth" = [])),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, body = CommentCreatedResponse),
        (status = 400, description = "Empty text"),
        (status = 403, description = "Paid post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Auth(identity): Auth,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentCreatedResponse>), ApiError> {
    let Json(request) = payload?;
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text cannot be empty"));
    }
    let post = visible_post(&state, &request.post_id, Some(&identity.user_id)).await?;

    let now = Utc::now();
    let comment = Comment {
        id: new_id(),
        post_id: post.id,
        user_id: identity.user_id,
        content: text.to_string(),
        created_at: now,
        updated_at: now,
    };
    state.repos.comments.create(&comment).await?;
    info!(comment_id = %comment.id, post_id = %comment.post_id, "comment created");

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            message: "Comment created".to_string(),
            comment,
        }),
    ))
}

/// Delete one of your comments.
#[utoipa::path(
    delete,
    path = "/api/comments/{comment_id}",
    params(("comment_id" = String, Path, description = "Comment identifier")),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Comment not found or not yours")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(comment_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let comment = state.repos.comments.get(&comment_id).await?;
    if comment.user_id != identity.user_id {
        return Err(ApiError::not_found("Comment not found"));
    }
    state.repos.comments.delete(&comment.id).await?;
    Ok(Json(MessageResponse {
        message: "Comment deleted".to_string(),
    }))
}
