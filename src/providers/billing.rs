// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe Connect client.
//!
//! Creators get a standard connected account. Subscription products, prices
//! and checkout sessions are created on the creator's account (the
//! `Stripe-Account` header) and the platform keeps an application fee on
//! each invoice.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::BillingConfig;

/// Platform share of each subscription invoice.
pub const APPLICATION_FEE_PERCENT: &str = "20";
const CURRENCY: &str = "eur";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("Stripe returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Stripe response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Stripe request failed: {0}")]
    Request(String),
}

/// Monthly subscription checkout on a creator's connected account.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub connected_account_id: String,
    pub product_name: String,
    /// Monthly price in euro cents.
    pub unit_amount_cents: i64,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub creator_id: String,
    pub subscriber_id: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Returns the new account id.
    async fn create_connected_account(&self, email: &str) -> Result<String, BillingError>;

    /// Returns the hosted onboarding URL.
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, BillingError>;

    async fn account_charges_enabled(&self, account_id: &str) -> Result<bool, BillingError>;

    /// Returns the checkout session URL.
    async fn create_subscription_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError>;

    async fn cancel_subscription(
        &self,
        account_id: &str,
        subscription_id: &str,
    ) -> Result<(), BillingError>;
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    api_base_url: String,
    secret_key: String,
    http: Client,
}

type Form = Vec<(String, String)>;

fn field(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        let http = super::http_client()
            .map_err(|e| BillingError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            http,
        })
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        account: Option<&str>,
        form: &Form,
    ) -> Result<Value, BillingError> {
        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.api_base_url, path))
            .bearer_auth(&self.secret_key);
        if let Some(account) = account {
            request = request.header("Stripe-Account", account);
        }
        if !form.is_empty() {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BillingError::Request(format!("{method} {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            debug!(status, path, "Stripe rejected request");
            return Err(BillingError::Rejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| BillingError::InvalidResponse(format!("{method} {path} invalid JSON: {e}")))
    }
}

fn string_field(payload: &Value, name: &str) -> Result<String, BillingError> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BillingError::InvalidResponse(format!("missing {name}")))
}

fn price_form(product_id: &str, unit_amount_cents: i64) -> Form {
    vec![
        field("product", product_id),
        field("currency", CURRENCY),
        field("unit_amount", unit_amount_cents.to_string()),
        field("recurring[interval]", "month"),
    ]
}

fn checkout_form(request: &CheckoutRequest, price_id: &str) -> Form {
    vec![
        field("mode", "subscription"),
        field("success_url", request.success_url.as_str()),
        field("cancel_url", request.cancel_url.as_str()),
        field("line_items[0][price]", price_id),
        field("line_items[0][quantity]", "1"),
        field("customer_email", request.customer_email.as_str()),
        field(
            "subscription_data[application_fee_percent]",
            APPLICATION_FEE_PERCENT,
        ),
        field("metadata[creator_id]", request.creator_id.as_str()),
        field("metadata[subscriber_id]", request.subscriber_id.as_str()),
    ]
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_connected_account(&self, email: &str) -> Result<String, BillingError> {
        let form = vec![field("type", "standard"), field("email", email)];
        let account = self.call(Method::POST, "/v1/accounts", None, &form).await?;
        string_field(&account, "id")
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, BillingError> {
        let form = vec![
            field("account", account_id),
            field("refresh_url", refresh_url),
            field("return_url", return_url),
            field("type", "account_onboarding"),
        ];
        let link = self
            .call(Method::POST, "/v1/account_links", None, &form)
            .await?;
        string_field(&link, "url")
    }

    async fn account_charges_enabled(&self, account_id: &str) -> Result<bool, BillingError> {
        let account = self
            .call(
                Method::GET,
                &format!("/v1/accounts/{account_id}"),
                None,
                &Vec::new(),
            )
            .await?;
        Ok(account
            .get("charges_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn create_subscription_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError> {
        let account = Some(request.connected_account_id.as_str());

        let product = self
            .call(
                Method::POST,
                "/v1/products",
                account,
                &vec![field("name", request.product_name.as_str())],
            )
            .await?;
        let product_id = string_field(&product, "id")?;

        let price = self
            .call(
                Method::POST,
                "/v1/prices",
                account,
                &price_form(&product_id, request.unit_amount_cents),
            )
            .await?;
        let price_id = string_field(&price, "id")?;

        let session = self
            .call(
                Method::POST,
                "/v1/checkout/sessions",
                account,
                &checkout_form(request, &price_id),
            )
            .await?;
        string_field(&session, "url")
    }

    async fn cancel_subscription(
        &self,
        account_id: &str,
        subscription_id: &str,
    ) -> Result<(), BillingError> {
        self.call(
            Method::DELETE,
            &format!("/v1/subscriptions/{subscription_id}"),
            Some(account_id),
            &Vec::new(),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            connected_account_id: "acct_1".to_string(),
            product_name: "OnlyFeed subscription to alice".to_string(),
            unit_amount_cents: 500,
            customer_email: "bob@example.com".to_string(),
            success_url: "http://localhost:5000/alice?subscribe=success".to_string(),
            cancel_url: "http://localhost:5000/alice?subscribe=error".to_string(),
            creator_id: "creator-1".to_string(),
            subscriber_id: "subscriber-1".to_string(),
        }
    }

    fn value_of<'a>(form: &'a Form, key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn checkout_form_carries_fee_and_metadata() {
        let form = checkout_form(&request(), "price_9");
        assert_eq!(value_of(&form, "mode"), Some("subscription"));
        assert_eq!(value_of(&form, "line_items[0][price]"), Some("price_9"));
        assert_eq!(
            value_of(&form, "subscription_data[application_fee_percent]"),
            Some("20")
        );
        assert_eq!(value_of(&form, "metadata[creator_id]"), Some("creator-1"));
        assert_eq!(
            value_of(&form, "metadata[subscriber_id]"),
            Some("subscriber-1")
        );
    }

    #[test]
    fn price_form_is_monthly_in_euro_cents() {
        let form = price_form("prod_1", 500);
        assert_eq!(value_of(&form, "currency"), Some("eur"));
        assert_eq!(value_of(&form, "unit_amount"), Some("500"));
        assert_eq!(value_of(&form, "recurring[interval]"), Some("month"));
    }

    #[test]
    fn string_field_rejects_missing_or_empty_values() {
        assert_eq!(
            string_field(&json!({ "id": "acct_1" }), "id").unwrap(),
            "acct_1"
        );
        assert!(string_field(&json!({ "id": "" }), "id").is_err());
        assert!(string_field(&json!({}), "url").is_err());
    }
}
