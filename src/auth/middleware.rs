// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth gate middleware.
//!
//! Both gates are applied per router group with
//! `axum::middleware::from_fn_with_state(state, require_auth)` (or
//! `optional_auth`). A resolved [`super::RequestIdentity`] is inserted into the
//! request extensions for the extractors.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use super::{authenticate, GateMode, GateOutcome, NEW_ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER};
use crate::state::AppState;

async fn run_gate(
    state: &AppState,
    headers: &HeaderMap,
    mode: GateMode,
) -> Result<GateOutcome, super::AuthError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let refresh_token = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    authenticate(
        &state.tokens,
        state.identity.as_ref(),
        authorization,
        refresh_token,
        mode,
        Utc::now().timestamp(),
    )
    .await
}

fn attach_refreshed_token(response: &mut Response, token: Option<String>) {
    if let Some(value) = token.and_then(|t| HeaderValue::from_str(&t).ok()) {
        response
            .headers_mut()
            .insert(NEW_ACCESS_TOKEN_HEADER, value);
    }
}

/// Rejects the request unless a valid identity (with email) is resolved.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match run_gate(&state, request.headers(), GateMode::Required).await {
        Ok(outcome) => {
            request.extensions_mut().insert(outcome.identity);
            let mut response = next.run(request).await;
            attach_refreshed_token(&mut response, outcome.refreshed_token);
            response
        }
        Err(e) => {
            debug!(path = %request.uri().path(), error_code = e.error_code(), "request rejected by auth gate");
            e.into_response()
        }
    }
}

/// Resolves an identity when possible and always continues.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match run_gate(&state, request.headers(), GateMode::Optional).await {
        Ok(outcome) => {
            request.extensions_mut().insert(outcome.identity);
            let mut response = next.run(request).await;
            attach_refreshed_token(&mut response, outcome.refreshed_token);
            response
        }
        Err(_) => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Auth, OptionalAuth};
    use crate::testing::{mint_token, TestContext, FAR_FUTURE};
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn assert_send<T: Send>(_: &T) {}

    async fn whoami(Auth(identity): Auth) -> String {
        identity.user_id
    }

    async fn maybe_whoami(OptionalAuth(identity): OptionalAuth) -> String {
        identity.map(|i| i.user_id).unwrap_or_default()
    }

    fn gated(ctx: &TestContext) -> Router {
        let required = Router::new()
            .route("/required", get(whoami))
            .route_layer(from_fn_with_state(ctx.state.clone(), require_auth));
        let optional = Router::new()
            .route("/optional", get(maybe_whoami))
            .route_layer(from_fn_with_state(ctx.state.clone(), optional_auth));
        required.merge(optional).with_state(ctx.state.clone())
    }

    async fn call(router: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn gate_futures_are_send() {
        let ctx = TestContext::new();
        let headers = HeaderMap::new();
        assert_send(&run_gate(&ctx.state, &headers, GateMode::Required));
    }

    #[tokio::test]
    async fn required_gate_mounts_as_route_layer() {
        let ctx = TestContext::new();
        let token = mint_token("user-1", Some("a@b.com"), FAR_FUTURE);

        let (status, body) = call(gated(&ctx), "/required", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-1");

        let (status, _) = call(gated(&ctx), "/required", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn optional_gate_continues_without_identity() {
        let ctx = TestContext::new();
        let token = mint_token("user-2", None, FAR_FUTURE);

        let (status, body) = call(gated(&ctx), "/optional", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-2");

        let (status, body) = call(gated(&ctx), "/optional", Some("garbage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
    }
}
