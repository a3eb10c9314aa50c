// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # REST API
//!
//! Resource routes live under `/api`, split in three groups by the auth
//! gate they run behind:
//!
//! | Group | Gate | Examples |
//! |-------|------|----------|
//! | public | none | signup, login, user search, billing webhook |
//! | personalized | [`optional_auth`] | feed, post detail, profiles |
//! | protected | [`require_auth`] | everything that writes, admin |
//!
//! Admin handlers additionally take the [`crate::auth::AdminOnly`]
//! extractor, which runs the role gate. Health probes sit at the root.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    auth::{
        middleware::{optional_auth, require_auth},
        NEW_ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER,
    },
    error::ApiError,
    models::{
        Comment, Conversation, Language, MessageType, Post, PostView, PublicUser, Report,
        ReportReason, ReportStatus, ReportTargetType, Subscription, SubscriptionStatus, Theme,
        User,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod billing;
pub mod comments;
pub mod follows;
pub mod health;
pub mod likes;
pub mod messages;
pub mod posts;
pub mod reports;
pub mod users;

/// Upper bound for multipart uploads (avatars, post media, attachments).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Upper bound for billing webhook payloads.
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/users/search", get(users::search_users))
        .route(
            "/stripe/webhook",
            post(billing::webhook).layer(RequestBodyLimitLayer::new(WEBHOOK_BODY_LIMIT)),
        );

    let personalized = Router::new()
        .route("/users/username/{username}", get(users::get_profile))
        .route(
            "/users/username/{username}/posts",
            get(posts::list_profile_posts),
        )
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/comments", get(comments::list_comments))
        .route("/posts/{post_id}/likes", get(likes::like_status))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(users::get_me).put(users::update_me))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/posts", post(posts::create_post))
        .route("/posts/me", get(posts::list_my_posts))
        .route("/posts/{post_id}", delete(posts::delete_post))
        .route("/posts/{post_id}/like", post(likes::toggle_like))
        .route("/comments", post(comments::create_comment))
        .route("/comments/{comment_id}", delete(comments::delete_comment))
        .route("/follow", get(follows::list_following))
        .route(
            "/follow/{user_id}",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route("/follow/followers/{user_id}", get(follows::list_followers))
        .route("/messages/conversations", get(messages::list_conversations))
        .route(
            "/messages/conversations/{conversation_id}",
            get(messages::get_conversation).delete(messages::delete_conversation),
        )
        .route("/messages/send", post(messages::send_message))
        .route("/messages/{message_id}/read", put(messages::mark_read))
        .route("/messages/{message_id}", delete(messages::delete_message))
        .route(
            "/stripe/create-account-link",
            post(billing::create_account_link),
        )
        .route("/stripe/complete-connect", get(billing::complete_connect))
        .route(
            "/stripe/create-subscription-session/{creator_id}",
            post(billing::create_subscription_session),
        )
        .route(
            "/stripe/unsubscribe/{creator_id}",
            delete(billing::unsubscribe),
        )
        .route("/reports", post(reports::create_report))
        .route("/admin/stats", get(admin::platform_stats))
        .route("/admin/charts/{chart_type}", get(admin::chart_data))
        .route("/admin/top-users", get(admin::top_users))
        .route("/admin/reports", get(reports::list_reports))
        .route("/admin/reports/stats", get(reports::report_stats))
        .route(
            "/admin/reports/{report_id}",
            put(reports::update_report).delete(reports::delete_report),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api_routes = public
        .merge(personalized)
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let cors = cors_layer(&state.settings.cors_allowed_origins);

    Router::new()
        .route("/", get(health::root))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REFRESH_TOKEN_HEADER),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            HeaderName::from_static(NEW_ACCESS_TOKEN_HEADER),
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

// ============================================================================
// Shared handler helpers
// ============================================================================

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Paid content of `owner_id` is visible to the owner and to active
/// subscribers.
pub(crate) async fn can_view_paid(
    state: &AppState,
    viewer_id: Option<&str>,
    owner_id: &str,
) -> Result<bool, ApiError> {
    let Some(viewer_id) = viewer_id else {
        return Ok(false);
    };
    if viewer_id == owner_id {
        return Ok(true);
    }
    Ok(state
        .repos
        .subscriptions
        .find(viewer_id, owner_id)
        .await?
        .is_some_and(|subscription| subscription.is_active()))
}

pub(crate) async fn post_view(
    state: &AppState,
    post: Post,
    viewer_id: Option<&str>,
) -> Result<PostView, ApiError> {
    let like_count = state.repos.likes.count_for_post(&post.id).await?;
    let is_liked = match viewer_id {
        Some(viewer_id) => state.repos.likes.is_liked(viewer_id, &post.id).await?,
        None => false,
    };
    Ok(PostView {
        post,
        like_count,
        is_liked,
    })
}

pub(crate) async fn post_views(
    state: &AppState,
    posts: Vec<Post>,
    viewer_id: Option<&str>,
) -> Result<Vec<PostView>, ApiError> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(post_view(state, post, viewer_id).await?);
    }
    Ok(views)
}

/// Deletes an uploaded object after a failed insert. Failures are logged
/// only.
pub(crate) async fn discard_upload(state: &AppState, url: &str) {
    if let Err(e) = state.media.delete_by_url(url).await {
        tracing::warn!(url, error = %e, "failed to delete orphaned upload");
    }
}

// ============================================================================
// OpenAPI
// ============================================================================

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::readiness,
        auth::signup,
        auth::login,
        auth::logout,
        users::get_me,
        users::update_me,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::search_users,
        users::get_profile,
        posts::create_post,
        posts::list_posts,
        posts::get_post,
        posts::list_my_posts,
        posts::list_profile_posts,
        posts::delete_post,
        comments::list_comments,
        comments::create_comment,
        comments::delete_comment,
        likes::toggle_like,
        likes::like_status,
        follows::follow_user,
        follows::unfollow_user,
        follows::list_following,
        follows::list_followers,
        messages::list_conversations,
        messages::get_conversation,
        messages::send_message,
        messages::mark_read,
        messages::delete_message,
        messages::delete_conversation,
        billing::create_account_link,
        billing::complete_connect,
        billing::create_subscription_session,
        billing::unsubscribe,
        billing::webhook,
        reports::create_report,
        reports::list_reports,
        reports::update_report,
        reports::delete_report,
        reports::report_stats,
        admin::platform_stats,
        admin::chart_data,
        admin::top_users
    ),
    components(
        schemas(
            User,
            PublicUser,
            Post,
            PostView,
            Comment,
            Conversation,
            Subscription,
            SubscriptionStatus,
            MessageType,
            Language,
            Theme,
            Report,
            ReportReason,
            ReportStatus,
            ReportTargetType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Signup, login and logout"),
        (name = "Users", description = "Profiles and account management"),
        (name = "Posts", description = "Posts, comments and likes"),
        (name = "Follow", description = "Follow relationships"),
        (name = "Messages", description = "Direct messaging"),
        (name = "Billing", description = "Creator onboarding and subscriptions"),
        (name = "Reports", description = "Content reports"),
        (name = "Admin", description = "Platform statistics and moderation")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let ctx = TestContext::new();
        let _ = router(ctx.state.clone()).into_make_service();
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let ctx = TestContext::new();
        let response = router(ctx.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let ctx = TestContext::new();
        let response = ctx.send(Request::get("/api/me").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn cors_preflight_allows_refresh_header() {
        let ctx = TestContext::new();
        let response = router(ctx.state.clone())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/posts")
                    .header(header::ORIGIN, "http://localhost:5000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-refresh-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5000"
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let ctx = TestContext::new();
        let response = router(ctx.state.clone())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
