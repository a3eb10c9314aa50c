// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Creator onboarding and paid subscriptions through Stripe Connect.
//!
//! A subscription row becomes active only when the signed
//! `checkout.session.completed` webhook arrives; creating a checkout session
//! does not touch the store.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

use super::{new_id, users::MessageResponse};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{Subscription, SubscriptionStatus, User},
    providers::{
        billing::CheckoutRequest,
        verify_webhook,
        webhook::{CompletedCheckout, SIGNATURE_HEADER},
    },
    state::AppState,
    storage::StoreError,
};

/// Price set when a creator finishes onboarding.
pub const DEFAULT_SUBSCRIPTION_PRICE: f64 = 5.0;

#[derive(Debug, Serialize, ToSchema)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CompleteConnectQuery {
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

fn price_in_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Start (or resume) Stripe onboarding for the caller.
#[utoipa::path(
    post,
    path = "/api/stripe/create-account-link",
    tag = "Billing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UrlResponse),
        (status = 400, description = "Already a creator"),
        (status = 502, description = "Stripe failure")
    )
)]
pub async fn create_account_link(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<UrlResponse>, ApiError> {
    let mut user = state.repos.users.get(&identity.user_id).await?;
    if user.is_creator {
        return Err(ApiError::bad_request("You are already a creator"));
    }

    let account_id = match user.stripe_account_id.clone().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            let id = state
                .billing
                .create_connected_account(&user.email)
                .await
                .map_err(|e| ApiError::upstream("Failed to create Stripe account", e.to_string()))?;
            user.stripe_account_id = Some(id.clone());
            state.repos.users.update(&user).await?;
            info!(user_id = %user.id, account_id = %id, "connected account created");
            id
        }
    };

    let base = state.settings.domain_url.trim_end_matches('/');
    let refresh_url = format!("{base}/{}?become_creator=error", user.username);
    let return_url = format!(
        "{base}/{}?become_creator=success&account_id={account_id}",
        user.username
    );
    let url = state
        .billing
        .create_onboarding_link(&account_id, &refresh_url, &return_url)
        .await
        .map_err(|e| ApiError::upstream("Failed to create onboarding link", e.to_string()))?;

    Ok(Json(UrlResponse { url }))
}

/// Finish onboarding: the caller becomes a creator once charges are enabled.
#[utoipa::path(
    get,
    path = "/api/stripe/complete-connect",
    params(CompleteConnectQuery),
    tag = "Billing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Missing account_id"),
        (status = 401, description = "Account not activated"),
        (status = 403, description = "Account does not belong to the caller")
    )
)]
pub async fn complete_connect(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Query(query): Query<CompleteConnectQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(account_id) = query.account_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::bad_request("account_id is required"));
    };
    let mut user = state.repos.users.get(&identity.user_id).await?;
    if user.stripe_account_id.as_deref() != Some(account_id.as_str()) {
        warn!(user_id = %user.id, account_id = %account_id, "account id mismatch on connect completion");
        return Err(ApiError::forbidden("This account does not belong to you"));
    }

    let enabled = state
        .billing
        .account_charges_enabled(&account_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch Stripe account", e.to_string()))?;
    if !enabled {
        return Err(ApiError::unauthorized("Stripe account not activated"));
    }

    user.is_creator = true;
    user.subscription_price = DEFAULT_SUBSCRIPTION_PRICE;
    state.repos.users.update(&user).await?;
    info!(user_id = %user.id, "user became a creator");

    Ok(Json(MessageResponse {
        message: "You are now a creator".to_string(),
    }))
}

/// Checkout session for a monthly subscription to a creator.
#[utoipa::path(
    post,
    path = "/api/stripe/create-subscription-session/{creator_id}",
    params(("creator_id" = String, Path, description = "Creator to subscribe to")),
    tag = "Billing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UrlResponse),
        (status = 400, description = "Self subscription or creator without Stripe account"),
        (status = 404, description = "Creator not found"),
        (status = 409, description = "Already subscribed"),
        (status = 502, description = "Stripe failure")
    )
)]
pub async fn create_subscription_session(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(creator_id): Path<String>,
) -> Result<Json<UrlResponse>, ApiError> {
    if creator_id == identity.user_id {
        return Err(ApiError::bad_request("You cannot subscribe to yourself"));
    }
    let creator = match state.repos.users.get(&creator_id).await {
        Ok(user) if user.is_creator => user,
        Ok(_) | Err(StoreError::NotFound(_)) => {
            return Err(ApiError::not_found("Creator not found"))
        }
        Err(e) => return Err(e.into()),
    };
    let Some(account_id) = creator.stripe_account_id.clone().filter(|id| !id.is_empty()) else {
        return Err(ApiError::bad_request("Creator has no Stripe account"));
    };

    let existing = state
        .repos
        .subscriptions
        .find(&identity.user_id, &creator.id)
        .await?;
    if existing.is_some_and(|s| s.is_active()) {
        return Err(ApiError::conflict("You are already subscribed"));
    }

    let subscriber = state.repos.users.get(&identity.user_id).await?;
    let base = state.settings.domain_url.trim_end_matches('/');
    let request = CheckoutRequest {
        connected_account_id: account_id,
        product_name: format!("OnlyFeed subscription to {}", creator.username),
        unit_amount_cents: price_in_cents(creator.subscription_price),
        customer_email: subscriber.email,
        success_url: format!("{base}/{}?subscribe=success", creator.username),
        cancel_url: format!("{base}/{}?subscribe=error", creator.username),
        creator_id: creator.id.clone(),
        subscriber_id: subscriber.id,
    };
    let url = state
        .billing
        .create_subscription_checkout(&request)
        .await
        .map_err(|e| ApiError::upstream("Failed to create checkout session", e.to_string()))?;
    debug!(creator_id = %creator.id, subscriber_id = %identity.user_id, "checkout session created");

    Ok(Json(UrlResponse { url }))
}

/// Cancel the caller's active subscription to a creator.
#[utoipa::path(
    delete,
    path = "/api/stripe/unsubscribe/{creator_id}",
    params(("creator_id" = String, Path, description = "Creator to unsubscribe from")),
    tag = "Billing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "No active subscription"),
        (status = 502, description = "Stripe failure")
    )
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(creator_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(mut subscription) = state
        .repos
        .subscriptions
        .find(&identity.user_id, &creator_id)
        .await?
        .filter(Subscription::is_active)
    else {
        return Err(ApiError::not_found("Subscription not found"));
    };
    let Some(stripe_subscription_id) = subscription
        .stripe_subscription_id
        .clone()
        .filter(|id| !id.is_empty())
    else {
        return Err(ApiError::internal("Subscription has no Stripe id"));
    };
    let creator = state.repos.users.get(&creator_id).await?;
    let Some(account_id) = creator.stripe_account_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::internal("Creator has no Stripe account"));
    };

    state
        .billing
        .cancel_subscription(&account_id, &stripe_subscription_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to cancel subscription", e.to_string()))?;

    subscription.status = SubscriptionStatus::Cancelled;
    state.repos.subscriptions.save(&subscription).await?;
    info!(subscriber_id = %identity.user_id, creator_id = %creator_id, "subscription cancelled");

    Ok(Json(MessageResponse {
        message: "Subscription cancelled".to_string(),
    }))
}

/// Stripe webhook endpoint. Requires a valid `Stripe-Signature`.
#[utoipa::path(
    post,
    path = "/api/stripe/webhook",
    tag = "Billing",
    request_body(content = String, description = "Raw Stripe event", content_type = "application/json"),
    responses(
        (status = 200, body = WebhookAck),
        (status = 400, description = "Invalid signature")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let event = verify_webhook(
        &body,
        signature,
        &state.settings.stripe_webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!(error = %e, "webhook rejected");
        ApiError::bad_request("Invalid Stripe signature")
    })?;

    match event.completed_checkout() {
        Some(checkout) => {
            if let Err(e) = activate_subscription(&state, &checkout).await {
                error!(event_id = %event.id, error = %e.message, "failed to record subscription");
            }
        }
        None => debug!(event_id = %event.id, event_type = %event.event_type, "webhook event ignored"),
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Creates or reactivates the subscription at the creator's current price.
async fn activate_subscription(
    state: &AppState,
    checkout: &CompletedCheckout,
) -> Result<(), ApiError> {
    let creator: User = state.repos.users.get(&checkout.creator_id).await?;
    let existing = state
        .repos
        .subscriptions
        .find(&checkout.subscriber_id, &checkout.creator_id)
        .await?;

    let subscription = match existing {
        Some(existing) if existing.is_active() => {
            debug!(subscriber_id = %checkout.subscriber_id, "subscription already active");
            return Ok(());
        }
        Some(existing) => Subscription {
            status: SubscriptionStatus::Active,
            stripe_subscription_id: Some(checkout.subscription_id.clone()),
            price: creator.subscription_price,
            ..existing
        },
        None => Subscription {
            id: new_id(),
            created_at: Utc::now(),
            subscriber_id: checkout.subscriber_id.clone(),
            creator_id: checkout.creator_id.clone(),
            status: SubscriptionStatus::Active,
            stripe_subscription_id: Some(checkout.subscription_id.clone()),
            price: creator.subscription_price,
        },
    };
    state.repos.subscriptions.save(&subscription).await?;
    info!(
        subscriber_id = %subscription.subscriber_id,
        creator_id = %subscription.creator_id,
        "subscription activated"
    );
    Ok(())
}
