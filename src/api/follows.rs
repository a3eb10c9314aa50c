// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::{new_id, users::MessageResponse};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{Follow, PublicUser},
    state::AppState,
    storage::StoreError,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowingResponse {
    pub following: Vec<PublicUser>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowersResponse {
    pub followers: Vec<PublicUser>,
}

/// Follow a user.
#[utoipa::path(
    post,
    path = "/api/follow/{user_id}",
    params(("user_id" = String, Path, description = "User to follow")),
    tag = "Follow",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = MessageResponse),
        (status = 400, description = "Cannot follow yourself"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already following")
    )
)]
pub async fn follow_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if identity.user_id == user_id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }
    let creator = state.repos.users.get(&user_id).await?;

    let follow = Follow {
        id: new_id(),
        created_at: Utc::now(),
        follower_id: identity.user_id,
        creator_id: creator.id,
    };
    state.repos.follows.create(&follow).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::conflict("Already following this user"),
        other => other.into(),
    })?;
    info!(follower_id = %follow.follower_id, creator_id = %follow.creator_id, "follow created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Followed".to_string(),
        }),
    ))
}

/// Stop following a user.
#[utoipa::path(
    delete,
    path = "/api/follow/{user_id}",
    params(("user_id" = String, Path, description = "User to unfollow")),
    tag = "Follow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Not following this user")
    )
)]
pub async fn unfollow_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .repos
        .follows
        .delete(&identity.user_id, &user_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::not_found("Not following this user"),
            other => other.into(),
        })?;
    Ok(Json(MessageResponse {
        message: "Unfollowed".to_string(),
    }))
}

/// Users the caller follows.
#[utoipa::path(
    get,
    path = "/api/follow",
    tag = "Follow",
    security(("bearer_auth" = [])),
    responses((status = 200, body = FollowingResponse))
)]
pub async fn list_following(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<FollowingResponse>, ApiError> {
    let users = state.repos.follows.following(&identity.user_id).await?;
    Ok(Json(FollowingResponse {
        following: users.iter().map(PublicUser::from).collect(),
    }))
}

/// Followers of a user.
#[utoipa::path(
    get,
    path = "/api/follow/followers/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    tag = "Follow",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = FollowersResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_followers(
    State(state): State<AppState>,
    Auth(_identity): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<FollowersResponse>, ApiError> {
    let user = state.repos.users.get(&user_id).await?;
    let users = state.repos.follows.followers(&user.id).await?;
    Ok(Json(FollowersResponse {
        followers: users.iter().map(PublicUser::from).collect(),
    }))
}
