// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe webhook verification.
//!
//! The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>]`.
//! A valid event carries at least one `v1` equal to
//! `HMAC-SHA256(secret, "{t}.{raw body}")` and a timestamp no older than
//! [`TOLERANCE_SECS`].

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const TOLERANCE_SECS: i64 = 300;
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("signature header is malformed")]
    MalformedHeader,

    #[error("signature timestamp is outside the tolerance window")]
    TimestampOutsideTolerance,

    #[error("no signature matches the payload")]
    SignatureMismatch,

    #[error("event payload is invalid: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Fields of a completed subscription checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub creator_id: String,
    pub subscriber_id: String,
    pub subscription_id: String,
}

impl WebhookEvent {
    /// `None` unless this is a completed checkout with both metadata ids and
    /// a subscription id. The subscription may be a bare id or expanded.
    pub fn completed_checkout(&self) -> Option<CompletedCheckout> {
        if self.event_type != CHECKOUT_SESSION_COMPLETED {
            return None;
        }
        let session = &self.data.object;
        let metadata = |key: &str| {
            session
                .get("metadata")
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let subscription_id = match session.get("subscription") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(expanded) => expanded
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            None => None,
        }
        .filter(|id| !id.is_empty())?;

        Some(CompletedCheckout {
            creator_id: metadata("creator_id")?,
            subscriber_id: metadata("subscriber_id")?,
            subscription_id,
        })
    }
}

/// Verifies `header` against the raw `payload` and parses the event.
/// `now` is the current unix time in seconds.
pub fn verify_webhook(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<WebhookEvent, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if now - timestamp > TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutsideTolerance);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

/// Builds a `Stripe-Signature` header for `payload`.
#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn checkout_event(subscription: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "subscription": subscription,
                "metadata": { "creator_id": "c1", "subscriber_id": "s1" }
            }}
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_signature_and_extracts_checkout() {
        let payload = checkout_event(json!("sub_1"));
        let header = sign_payload(&payload, SECRET, 1_700_000_000);
        let event = verify_webhook(&payload, &header, SECRET, 1_700_000_010).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
        assert_eq!(
            event.completed_checkout(),
            Some(CompletedCheckout {
                creator_id: "c1".to_string(),
                subscriber_id: "s1".to_string(),
                subscription_id: "sub_1".to_string(),
            })
        );
    }

    #[test]
    fn expanded_subscription_object_is_supported() {
        let payload = checkout_event(json!({ "id": "sub_2", "object": "subscription" }));
        let header = sign_payload(&payload, SECRET, 100);
        let event = verify_webhook(&payload, &header, SECRET, 100).unwrap();
        assert_eq!(event.completed_checkout().unwrap().subscription_id, "sub_2");
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = checkout_event(json!("sub_1"));
        let header = sign_payload(&payload, SECRET, 100);
        let tampered = checkout_event(json!("sub_evil"));
        assert_eq!(
            verify_webhook(&tampered, &header, SECRET, 100),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = checkout_event(json!("sub_1"));
        let header = sign_payload(&payload, SECRET, 100);
        assert_eq!(
            verify_webhook(&payload, &header, SECRET, 100 + TOLERANCE_SECS + 1),
            Err(WebhookError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn rejects_header_without_signature() {
        assert_eq!(
            verify_webhook(b"{}", "t=100", SECRET, 100),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook(b"{}", "v1=abcd", SECRET, 100),
            Err(WebhookError::MalformedHeader)
        );
    }

    #[test]
    fn other_event_types_have_no_checkout() {
        let payload = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "invoice.paid",
            "data": { "object": {} }
        }))
        .unwrap();
        let header = sign_payload(&payload, SECRET, 5);
        let event = verify_webhook(&payload, &header, SECRET, 5).unwrap();
        assert!(event.completed_checkout().is_none());
    }
}
