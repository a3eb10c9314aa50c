// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User account and profile endpoints.

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{require_role, Auth, OptionalAuth, RequestIdentity, Role},
    error::ApiError,
    media::{self, MultipartForm, AVATAR_FOLDER, IMAGE_EXTENSIONS},
    models::{Language, PublicUser, Theme, User},
    state::AppState,
};

const SEARCH_MIN_CHARS: usize = 2;
const SEARCH_LIMIT: usize = 20;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Full account view, shown to the account owner and admins.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub avatar_url: String,
    pub bio: String,
    pub language: Language,
    pub theme: Theme,
    pub is_creator: bool,
    pub created_at: DateTime<Utc>,
    /// Present (and true) for admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    /// Present for creators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_price: Option<f64>,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            language: user.language,
            theme: user.theme,
            is_creator: user.is_creator,
            created_at: user.created_at,
            is_admin: user.is_admin.then_some(true),
            subscription_price: user.is_creator.then_some(user.subscription_price),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: AccountView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserUpdatedResponse {
    pub message: String,
    pub user: AccountView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Allow-listed fields of `PUT /api/users/{id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub bio: Option<String>,
    pub language: Option<Language>,
    pub theme: Option<Theme>,
    /// Admin only.
    pub is_creator: Option<bool>,
    /// Admin only.
    pub subscription_price: Option<f64>,
}

impl UserPatch {
    fn touches_admin_fields(&self) -> bool {
        self.is_creator.is_some() || self.subscription_price.is_some()
    }

    fn apply(self, user: &mut User) -> Result<(), ApiError> {
        if let Some(username) = self.username {
            let username = username.trim();
            if username.is_empty() {
                return Err(ApiError::bad_request("Username cannot be empty"));
            }
            user.username = username.to_string();
        }
        if let Some(firstname) = self.firstname {
            user.firstname = firstname;
        }
        if let Some(lastname) = self.lastname {
            user.lastname = lastname;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(language) = self.language {
            user.language = language;
        }
        if let Some(theme) = self.theme {
            user.theme = theme;
        }
        if let Some(is_creator) = self.is_creator {
            user.is_creator = is_creator;
        }
        if let Some(price) = self.subscription_price {
            if !price.is_finite() || price < 0.0 {
                return Err(ApiError::bad_request("Invalid subscription price"));
            }
            user.subscription_price = price;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Search text, at least 2 characters.
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub users: Vec<PublicUser>,
}

/// User fields on a profile page. Private fields only for your own profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileUser {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
    pub bio: String,
    pub is_creator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ProfileStats {
    pub followers_count: i64,
    pub subscribers_count: i64,
    pub posts_count: i64,
    pub paid_posts_count: i64,
    /// Own profile only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followings_count: Option<i64>,
    /// Own profile only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions_count: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: ProfileUser,
    pub stats: ProfileStats,
    /// Whether the viewer follows this user. Absent on your own profile and
    /// for anonymous viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    /// Whether the viewer has an active subscription. Creators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subscriber: Option<bool>,
    /// Price the viewer pays (active subscribers) or would pay. Creators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_price: Option<f64>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Passes when `identity` is `user_id` or an admin.
async fn require_self_or_admin(
    state: &AppState,
    identity: &RequestIdentity,
    user_id: &str,
) -> Result<(), ApiError> {
    if identity.user_id == user_id {
        return Ok(());
    }
    require_role(state.repos.users.as_ref(), Some(identity), Role::Admin)
        .await
        .map_err(|_| ApiError::forbidden("You can only manage your own account"))
}

async fn replace_avatar(
    state: &AppState,
    user: &mut User,
    form: &mut MultipartForm,
) -> Result<(), ApiError> {
    let Some(file) = form
        .take_file("avatar")
        .or_else(|| form.take_file("profile_picture"))
    else {
        return Ok(());
    };
    let extension = file.extension();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::bad_request("Invalid file extension"));
    }

    if !user.avatar_url.is_empty() {
        state
            .media
            .delete_by_url(&user.avatar_url)
            .await
            .map_err(|e| {
                ApiError::internal("Failed to delete previous avatar").with_details(e.to_string())
            })?;
    }

    let file_name = media::avatar_file_name(&user.id, &extension);
    user.avatar_url = state
        .media
        .put(AVATAR_FOLDER, &file_name, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::upstream("Avatar upload failed", e.to_string()))?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the authenticated user's account.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No local account")
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.repos.users.get(&identity.user_id).await?;
    Ok(Json(UserResponse {
        user: AccountView::from(&user),
    }))
}

/// Update the authenticated user's profile (multipart).
///
/// Fields: `username`, `firstname`, `lastname`, `bio`, `language`, `theme`
/// and an optional `avatar` image.
#[utoipa::path(
    put,
    path = "/api/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "Profile fields and optional avatar"),
    responses(
        (status = 200, body = UserUpdatedResponse),
        (status = 400, description = "Invalid field or file extension"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    Auth(identity): Auth,
    multipart: Multipart,
) -> Result<Json<UserUpdatedResponse>, ApiError> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut user = state.repos.users.get(&identity.user_id).await?;

    let patch = UserPatch {
        username: form.text("username").map(str::to_string),
        firstname: form.text("firstname").map(str::to_string),
        lastname: form.text("lastname").map(str::to_string),
        bio: form.text("bio").map(str::to_string),
        language: form
            .text("language")
            .map(Language::parse)
            .transpose()
            .map_err(|_| ApiError::bad_request("Unsupported language"))?,
        theme: form
            .text("theme")
            .map(Theme::parse)
            .transpose()
            .map_err(|_| ApiError::bad_request("Unsupported theme"))?,
        ..UserPatch::default()
    };
    patch.apply(&mut user)?;
    replace_avatar(&state, &mut user, &mut form).await?;

    state.repos.users.update(&user).await?;
    info!(user_id = %user.id, "profile updated");

    Ok(Json(UserUpdatedResponse {
        message: "Profile updated".to_string(),
        user: AccountView::from(&user),
    }))
}

/// Get an account by id.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(_identity): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.repos.users.get(&user_id).await?;
    Ok(Json(UserResponse {
        user: AccountView::from(&user),
    }))
}

/// Patch an account. Self or admin; creator fields are admin only.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = UserPatch,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 400, description = "Invalid patch"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(user_id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(patch) = payload?;
    require_self_or_admin(&state, &identity, &user_id).await?;

    if patch.touches_admin_fields() {
        require_role(state.repos.users.as_ref(), Some(&identity), Role::Admin)
            .await
            .map_err(|_| ApiError::forbidden("Only admins can change creator settings"))?;
    }

    let mut user = state.repos.users.get(&user_id).await?;
    patch.apply(&mut user)?;
    state.repos.users.update(&user).await?;
    info!(user_id = %user.id, updated_by = %identity.user_id, "user updated");

    Ok(Json(UserResponse {
        user: AccountView::from(&user),
    }))
}

/// Delete an account from the identity provider and the local store.
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Identity provider failure")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_self_or_admin(&state, &identity, &user_id).await?;
    let user = state.repos.users.get(&user_id).await?;

    state.identity.delete_user(&user.id).await.map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "identity provider delete failed");
        ApiError::upstream("Failed to delete user", e.to_string())
    })?;
    state.repos.users.delete(&user.id).await?;
    info!(user_id = %user.id, deleted_by = %identity.user_id, "user deleted");

    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}

/// Search users by username, first name or last name.
#[utoipa::path(
    get,
    path = "/api/users/search",
    params(SearchQuery),
    tag = "Users",
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "Query shorter than 2 characters")
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search parameter 'q' is required"));
    }
    if query.chars().count() < SEARCH_MIN_CHARS {
        return Err(ApiError::bad_request(
            "Search must contain at least 2 characters",
        ));
    }

    let users = state.repos.users.search(query, SEARCH_LIMIT).await?;
    Ok(Json(SearchResponse {
        users: users.iter().map(PublicUser::from).collect(),
    }))
}

/// Public profile by username, personalized for the viewer.
#[utoipa::path(
    get,
    path = "/api/users/username/{username}",
    params(("username" = String, Path, description = "Username")),
    tag = "Users",
    responses(
        (status = 200, body = ProfileResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Some(user) = state.repos.users.find_by_username(&username).await? else {
        warn!(username = %username, "profile not found");
        return Err(ApiError::not_found("User not found"));
    };
    let viewer_id = viewer.as_ref().map(|v| v.user_id.as_str());
    let is_self = viewer_id == Some(user.id.as_str());

    let (is_following, subscription) = match viewer_id {
        Some(viewer_id) if !is_self => (
            Some(state.repos.follows.is_following(viewer_id, &user.id).await?),
            state.repos.subscriptions.find(viewer_id, &user.id).await?,
        ),
        _ => (None, None),
    };

    let (is_subscriber, subscription_price) = if user.is_creator {
        let active = subscription.as_ref().filter(|s| s.is_active());
        (
            viewer_id.filter(|_| !is_self).map(|_| active.is_some()),
            Some(active.map_or(user.subscription_price, |s| s.price)),
        )
    } else {
        (None, None)
    };

    let counts = state.repos.posts.counts_for_user(&user.id).await?;
    let mut stats = ProfileStats {
        followers_count: state.repos.follows.count_followers(&user.id).await?,
        subscribers_count: state
            .repos
            .subscriptions
            .count_active_subscribers(&user.id)
            .await?,
        posts_count: counts.total,
        paid_posts_count: counts.paid,
        ..ProfileStats::default()
    };
    if is_self {
        stats.followings_count = Some(state.repos.follows.count_following(&user.id).await?);
        stats.subscriptions_count = Some(
            state
                .repos
                .subscriptions
                .count_active_subscriptions(&user.id)
                .await?,
        );
    }

    let profile = ProfileUser {
        id: user.id.clone(),
        username: user.username.clone(),
        avatar_url: user.avatar_url.clone(),
        bio: user.bio.clone(),
        is_creator: user.is_creator,
        email: is_self.then(|| user.email.clone()),
        firstname: is_self.then(|| user.firstname.clone()),
        lastname: is_self.then(|| user.lastname.clone()),
        language: is_self.then_some(user.language),
        theme: is_self.then_some(user.theme),
        is_admin: (is_self && user.is_admin).then_some(true),
    };

    Ok(Json(ProfileResponse {
        user: profile,
        stats,
        is_following,
        is_subscriber,
        subscription_price,
    }))
}
