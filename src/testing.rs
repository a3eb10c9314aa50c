// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the external providers and a router harness.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use crate::api::router;
use crate::auth::{TokenClaims, TokenCodec};
use crate::models::{Language, Post, Theme, User};
use crate::providers::{
    BillingError, BillingProvider, CheckoutRequest, IdentityError, IdentityProvider,
    IdentityUser, ObjectStorage, StorageError, TokenGrant,
};
use crate::state::{AppState, Settings};
use crate::storage::{Repositories, StoreError, StoreResult, UserRepository};

pub(crate) const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub(crate) const TEST_WEBHOOK_SECRET: &str = "whsec_test";
pub(crate) const TEST_DOMAIN_URL: &str = "http://localhost:5000";
/// Expiry far enough in the future for any test run.
pub(crate) const FAR_FUTURE: i64 = 4_000_000_000;

pub(crate) fn mint_token(sub: &str, email: Option<&str>, exp: i64) -> String {
    let claims = TokenClaims {
        sub: Some(sub.to_string()),
        email: email.map(str::to_string),
        exp: Some(exp),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub(crate) fn sample_user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        created_at: Utc::now(),
        email: format!("{username}@example.com"),
        username: username.to_string(),
        firstname: String::new(),
        lastname: String::new(),
        avatar_url: String::new(),
        bio: String::new(),
        language: Language::Fr,
        theme: Theme::Light,
        is_admin: false,
        is_creator: false,
        subscription_price: 0.0,
        stripe_account_id: None,
    }
}

// ============================================================================
// Identity provider
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeIdentity {
    /// email -> (user id, password)
    accounts: Mutex<HashMap<String, (String, String)>>,
    /// refresh token -> access token
    refresh_grants: Mutex<HashMap<String, String>>,
    pub signed_out: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn register_refresh(&self, refresh_token: &str, access_token: &str) {
        self.refresh_grants
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), access_token.to_string());
    }

    pub fn register_account(&self, user_id: &str, email: &str, password: &str) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            (user_id.to_string(), password.to_string()),
        );
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(IdentityError::Rejected {
                status: 422,
                body: "User already registered".to_string(),
            });
        }
        let id = uuid::Uuid::new_v4().to_string();
        accounts.insert(email.to_string(), (id.clone(), password.to_string()));
        Ok(IdentityUser { id })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((id, stored)) if stored == password => Ok(TokenGrant {
                access_token: mint_token(id, Some(email), FAR_FUTURE),
                refresh_token: format!("refresh-{id}"),
                expires_in: 3600,
            }),
            _ => Err(IdentityError::Rejected {
                status: 400,
                body: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError> {
        let grants = self.refresh_grants.lock().unwrap();
        match grants.get(refresh_token) {
            Some(access_token) => Ok(TokenGrant {
                access_token: access_token.clone(),
                refresh_token: format!("{refresh_token}-next"),
                expires_in: 3600,
            }),
            None => Err(IdentityError::Rejected {
                status: 400,
                body: "Invalid Refresh Token".to_string(),
            }),
        }
    }

    async fn sign_out(
        &self,
        _access_token: &str,
        refresh_token: &str,
    ) -> Result<(), IdentityError> {
        self.signed_out
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Object storage
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeStorage {
    pub fn contains(&self, url: &str) -> bool {
        self.objects.lock().unwrap().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put(
        &self,
        folder: &str,
        file_name: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = format!("https://media.test/{folder}/{file_name}");
        self.objects.lock().unwrap().insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(url);
        Ok(())
    }
}

// ============================================================================
// Billing
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeBilling {
    pub charges_enabled: AtomicBool,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
    pub cancelled: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn create_connected_account(&self, _email: &str) -> Result<String, BillingError> {
        Ok("acct_test".to_string())
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<String, BillingError> {
        Ok(format!("https://connect.test/onboarding/{account_id}"))
    }

    async fn account_charges_enabled(&self, _account_id: &str) -> Result<bool, BillingError> {
        Ok(self.charges_enabled.load(Ordering::SeqCst))
    }

    async fn create_subscription_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError> {
        self.checkouts.lock().unwrap().push(request.clone());
        Ok("https://checkout.test/session".to_string())
    }

    async fn cancel_subscription(
        &self,
        account_id: &str,
        subscription_id: &str,
    ) -> Result<(), BillingError> {
        self.cancelled
            .lock()
            .unwrap()
            .push((account_id.to_string(), subscription_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// Failing store
// ============================================================================

/// User repository whose every call fails with a connectivity error.
pub(crate) struct FailingUsers;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Database("connection refused".to_string()))
}

#[async_trait]
impl UserRepository for FailingUsers {
    async fn create(&self, _user: &User) -> StoreResult<()> {
        unavailable()
    }

    async fn get(&self, _user_id: &str) -> StoreResult<User> {
        unavailable()
    }

    async fn find_by_username(&self, _username: &str) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn update(&self, _user: &User) -> StoreResult<()> {
        unavailable()
    }

    async fn delete(&self, _user_id: &str) -> StoreResult<()> {
        unavailable()
    }

    async fn search(&self, _query: &str, _limit: usize) -> StoreResult<Vec<User>> {
        unavailable()
    }

    async fn is_admin(&self, _user_id: &str) -> StoreResult<bool> {
        unavailable()
    }
}

// ============================================================================
// Router harness
// ============================================================================

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

pub(crate) struct TestContext {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub media: Arc<FakeStorage>,
    pub billing: Arc<FakeBilling>,
}

impl TestContext {
    pub fn new() -> Self {
        let identity = Arc::new(FakeIdentity::default());
        let media = Arc::new(FakeStorage::default());
        let billing = Arc::new(FakeBilling::default());
        let state = AppState::new(
            Repositories::in_memory(),
            identity.clone(),
            media.clone(),
            billing.clone(),
            TokenCodec::new(TEST_JWT_SECRET),
            Settings {
                domain_url: TEST_DOMAIN_URL.to_string(),
                stripe_webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
                cors_allowed_origins: vec![TEST_DOMAIN_URL.to_string()],
            },
        );
        Self {
            state,
            identity,
            media,
            billing,
        }
    }

    /// Swaps the user repository for one that always fails.
    pub fn with_failing_users(mut self) -> Self {
        self.state.repos.users = Arc::new(FailingUsers);
        self
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            json,
        }
    }

    pub async fn seed_user(&self, id: &str, username: &str) -> User {
        let user = sample_user(id, username);
        self.state.repos.users.create(&user).await.unwrap();
        user
    }

    pub async fn seed_admin(&self, id: &str, username: &str) -> User {
        let mut user = sample_user(id, username);
        user.is_admin = true;
        self.state.repos.users.create(&user).await.unwrap();
        user
    }

    pub async fn seed_creator(&self, id: &str, username: &str) -> User {
        let mut user = sample_user(id, username);
        user.is_creator = true;
        user.subscription_price = 5.0;
        user.stripe_account_id = Some(format!("acct_{id}"));
        self.state.repos.users.create(&user).await.unwrap();
        user
    }

    pub async fn seed_post(&self, id: &str, owner: &User, is_paid: bool) -> Post {
        let post = Post {
            id: id.to_string(),
            created_at: Utc::now(),
            user_id: owner.id.clone(),
            title: format!("post {id}"),
            description: String::new(),
            media_url: format!("https://media.test/posts/post_{id}.png"),
            is_paid,
        };
        self.state.repos.posts.create(&post).await.unwrap();
        post
    }

    pub fn bearer(user: &User) -> String {
        format!(
            "Bearer {}",
            mint_token(&user.id, Some(&user.email), FAR_FUTURE)
        )
    }

    /// Request with an optional bearer token and JSON body.
    pub fn request(
        method: Method,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, Self::bearer(user));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Multipart request. `files` are `(field, file name, bytes)`.
    pub fn multipart(
        method: Method,
        uri: &str,
        user: Option<&User>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Request<Body> {
        const BOUNDARY: &str = "onlyfeed-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, Self::bearer(user));
        }
        builder.body(Body::from(body)).unwrap()
    }
}
