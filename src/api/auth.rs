// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signup, login and logout against the identity provider.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::users::{AccountView, MessageResponse, UserUpdatedResponse};
use crate::{
    auth::{Auth, TokenCodec, REFRESH_TOKEN_HEADER},
    error::ApiError,
    media::{self, MultipartForm, AVATAR_FOLDER, IMAGE_EXTENSIONS},
    models::{Language, Theme, User},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AccountView,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Create an account (multipart).
///
/// Required fields: `email`, `password`, `username`. Optional: `firstname`,
/// `lastname`, `bio`, `language` (`fr`|`en`), `theme` (`light`|`dark`) and
/// a `profile_picture` image.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body(content_type = "multipart/form-data", description = "Account fields and optional profile picture"),
    responses(
        (status = 201, body = UserUpdatedResponse),
        (status = 400, description = "Missing field, bad language or file extension"),
        (status = 409, description = "Email or username already used"),
        (status = 502, description = "Identity provider failure")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UserUpdatedResponse>), ApiError> {
    let mut form = MultipartForm::read(multipart).await?;

    let (Some(email), Some(password), Some(username)) = (
        form.text("email").map(str::to_string),
        form.text("password").map(str::to_string),
        form.text("username").map(str::to_string),
    ) else {
        return Err(ApiError::bad_request(
            "Email, password and username are required",
        ));
    };
    let language = match form.text("language") {
        Some(value) => {
            Language::parse(value).map_err(|_| ApiError::bad_request("Unsupported language"))?
        }
        None => Language::Fr,
    };
    let theme = Theme::from_form(form.text("theme").unwrap_or_default());

    let avatar = form.take_file("profile_picture");
    if let Some(file) = &avatar {
        if !IMAGE_EXTENSIONS.contains(&file.extension().as_str()) {
            return Err(ApiError::bad_request("Invalid file extension"));
        }
    }

    if state.repos.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already used"));
    }
    if state.repos.users.find_by_username(&username).await?.is_some() {
        return Err(ApiError::conflict("Username already used"));
    }

    let account = state
        .identity
        .sign_up(&email, &password)
        .await
        .map_err(|e| {
            warn!(error = %e, "identity provider signup failed");
            ApiError::upstream("Signup failed", e.to_string())
        })?;

    let mut user = User {
        id: account.id,
        created_at: Utc::now(),
        email,
        username,
        firstname: form.text_or_default("firstname"),
        lastname: form.text_or_default("lastname"),
        avatar_url: String::new(),
        bio: form.text_or_default("bio"),
        language,
        theme,
        is_admin: false,
        is_creator: false,
        subscription_price: 0.0,
        stripe_account_id: None,
    };

    if let Some(file) = avatar {
        let extension = file.extension();
        let file_name = media::avatar_file_name(&user.id, &extension);
        user.avatar_url = state
            .media
            .put(AVATAR_FOLDER, &file_name, &file.content_type, file.bytes)
            .await
            .map_err(|e| ApiError::upstream("Avatar upload failed", e.to_string()))?;
    }

    if let Err(e) = state.repos.users.create(&user).await {
        if !user.avatar_url.is_empty() {
            super::discard_upload(&state, &user.avatar_url).await;
        }
        return Err(e.into());
    }
    info!(user_id = %user.id, username = %user.username, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(UserUpdatedResponse {
            message: "User created".to_string(),
            user: AccountView::from(&user),
        }),
    ))
}

/// Password login. Returns the provider's token pair and the local account.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, body = LoginResponse),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "No local account for this identity")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let grant = state
        .identity
        .sign_in(email, &request.password)
        .await
        .map_err(|e| {
            info!(error = %e, "login rejected");
            ApiError::unauthorized("Invalid credentials").with_details(e.to_string())
        })?;

    let claims = TokenCodec::decode_unverified(&grant.access_token);
    let user_id = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| ApiError::internal("Identity token has no subject"))?;
    let user = state.repos.users.get(user_id).await?;

    Ok(Json(LoginResponse {
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_in: grant.expires_in,
        user: AccountView::from(&user),
    }))
}

/// Revoke the caller's refresh token.
///
/// The refresh token is read from `X-Refresh-Token` or a JSON body
/// `{"refresh_token": "..."}`.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body(content = LogoutRequest, description = "Optional when X-Refresh-Token is sent"),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "No refresh token"),
        (status = 502, description = "Identity provider failure")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Auth(identity): Auth,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let from_header = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let refresh_token = match from_header {
        Some(token) => Some(token),
        None if body.is_empty() => None,
        None => serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| ApiError::bad_request("Invalid request body").with_details(e.to_string()))?
            .refresh_token
            .filter(|t| !t.trim().is_empty()),
    };
    let Some(refresh_token) = refresh_token else {
        return Err(ApiError::bad_request("Refresh token is required"));
    };

    let access_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    state
        .identity
        .sign_out(access_token, &refresh_token)
        .await
        .map_err(|e| ApiError::upstream("Logout failed", e.to_string()))?;
    info!(user_id = %identity.user_id, "user logged out");

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
