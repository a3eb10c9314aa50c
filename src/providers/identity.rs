// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supabase auth API client.
//!
//! Tokens issued here are HS256 JWTs signed with the project's JWT secret,
//! which is what [`crate::auth::TokenCodec`] verifies locally. The refresh
//! grant is the only call made from inside the auth gates.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::IdentityConfig;

/// User created by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: String,
}

/// Token pair returned by password and refresh grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The provider answered with a non-2xx status.
    #[error("identity provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),

    #[error("identity provider request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, IdentityError>;

    /// Exchanges a refresh token for a new token pair. Single attempt.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError>;

    async fn sign_out(&self, access_token: &str, refresh_token: &str)
        -> Result<(), IdentityError>;

    /// Removes the account with the service role key.
    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone)]
pub struct SupabaseAuthClient {
    base_url: String,
    anon_key: String,
    service_role_key: String,
    http: Client,
}

impl SupabaseAuthClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let http = super::http_client()
            .map_err(|e| IdentityError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, label: &str, request: RequestBuilder) -> Result<Response, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("{label} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            debug!(status, label, "identity provider rejected request");
            return Err(IdentityError::Rejected { status, body });
        }
        Ok(response)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<TokenGrant, IdentityError> {
        let request = self
            .http
            .post(self.url(&format!("/auth/v1/token?grant_type={grant_type}")))
            .header("apikey", &self.anon_key)
            .json(&body);
        let response = self.send(grant_type, request).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("invalid JSON: {e}")))?;
        parse_grant(payload)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let request = self
            .http
            .post(self.url("/auth/v1/signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));
        let response = self.send("signup", request).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("invalid JSON: {e}")))?;
        extract_user_id(&payload)
            .map(|id| IdentityUser { id })
            .ok_or_else(|| IdentityError::InvalidResponse("missing user id".to_string()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, IdentityError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), IdentityError> {
        let request = self
            .http
            .post(self.url("/auth/v1/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "refresh_token": refresh_token }));
        self.send("logout", request).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let request = self
            .http
            .delete(self.url(&format!("/auth/v1/admin/users/{user_id}")))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key);
        self.send("admin delete", request).await?;
        Ok(())
    }
}

/// Signup answers with either `{ "user": { "id" } }` or the user object
/// itself when email confirmation is enabled.
fn extract_user_id(payload: &Value) -> Option<String> {
    payload
        .get("user")
        .and_then(|user| user.get("id"))
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn parse_grant(payload: Value) -> Result<TokenGrant, IdentityError> {
    let grant: TokenGrant = serde_json::from_value(payload)
        .map_err(|e| IdentityError::InvalidResponse(format!("unexpected token payload: {e}")))?;
    if grant.access_token.is_empty() {
        return Err(IdentityError::InvalidResponse(
            "empty access token".to_string(),
        ));
    }
    Ok(grant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_read_from_nested_or_top_level() {
        let nested = json!({ "user": { "id": "abc" }, "session": null });
        assert_eq!(extract_user_id(&nested).as_deref(), Some("abc"));

        let flat = json!({ "id": "def", "email": "a@b.com" });
        assert_eq!(extract_user_id(&flat).as_deref(), Some("def"));

        assert_eq!(extract_user_id(&json!({ "user": {} })), None);
    }

    #[test]
    fn grant_requires_access_token() {
        let ok = parse_grant(json!({
            "access_token": "new",
            "refresh_token": "r2",
            "expires_in": 3600,
            "token_type": "bearer"
        }))
        .unwrap();
        assert_eq!(ok.access_token, "new");
        assert_eq!(ok.expires_in, 3600);

        let empty = parse_grant(json!({ "access_token": "", "refresh_token": "r" }));
        assert!(matches!(empty, Err(IdentityError::InvalidResponse(_))));

        let malformed = parse_grant(json!({ "error": "invalid_grant" }));
        assert!(matches!(malformed, Err(IdentityError::InvalidResponse(_))));
    }

    #[test]
    fn rejection_message_carries_status_and_body() {
        let err = IdentityError::Rejected {
            status: 400,
            body: "invalid refresh token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "identity provider returned 400: invalid refresh token"
        );
    }
}
