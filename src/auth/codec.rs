// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token decoding and verification.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use super::{AuthError, TokenClaims};

/// Symmetric algorithms the shared secret may sign with.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Reads and verifies bearer tokens signed with the shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    key: DecodingKey,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Decodes the payload segment without checking the signature.
    ///
    /// Returns an empty map when the token is not three dot-separated
    /// segments or the payload is not a base64url JSON object.
    pub fn decode_unverified(token: &str) -> Map<String, Value> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Map::new();
        }
        let Ok(bytes) = Base64UrlUnpadded::decode_vec(segments[1].trim_end_matches('=')) else {
            return Map::new();
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Verifies signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::InvalidSignature);
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_aud = false;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Reads `exp` as epoch seconds. Fractional values are truncated, strings
/// are treated as absent.
pub fn expiry_of(claims: &Map<String, Value>) -> Option<i64> {
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mint_token, TEST_JWT_SECRET};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn unsigned(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decode_unverified_reads_payload() {
        let token = mint_token("user-1", Some("a@b.com"), 1_900_000_000);
        let claims = TokenCodec::decode_unverified(&token);
        assert_eq!(claims["sub"], "user-1");
        assert_eq!(expiry_of(&claims), Some(1_900_000_000));
    }

    #[test]
    fn decode_unverified_is_empty_on_garbage() {
        assert!(TokenCodec::decode_unverified("not-a-token").is_empty());
        assert!(TokenCodec::decode_unverified("a.b").is_empty());
        assert!(TokenCodec::decode_unverified("a.%%%.c").is_empty());
        assert!(TokenCodec::decode_unverified(&unsigned("{}", "[1,2]")).is_empty());
    }

    #[test]
    fn expiry_accepts_fractional_seconds_only_as_numbers() {
        let claims = TokenCodec::decode_unverified(&unsigned("{}", r#"{"exp":1700000000.7}"#));
        assert_eq!(expiry_of(&claims), Some(1_700_000_000));
        let claims = TokenCodec::decode_unverified(&unsigned("{}", r#"{"exp":"1700000000"}"#));
        assert_eq!(expiry_of(&claims), None);
    }

    #[test]
    fn verify_accepts_shared_secret_token() {
        let codec = TokenCodec::new(TEST_JWT_SECRET);
        let token = mint_token("user-1", Some("a@b.com"), 4_000_000_000);
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let codec = TokenCodec::new("another-secret");
        let token = mint_token("user-1", None, 4_000_000_000);
        assert_eq!(codec.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn verify_rejects_asymmetric_algorithm() {
        let codec = TokenCodec::new(TEST_JWT_SECRET);
        let token = unsigned(
            r#"{"alg":"RS256","typ":"JWT"}"#,
            r#"{"sub":"user-1","exp":4000000000}"#,
        );
        assert_eq!(codec.verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn verify_reports_expiry() {
        let codec = TokenCodec::new(TEST_JWT_SECRET);
        let token = mint_token("user-1", None, 1_000);
        assert_eq!(codec.verify(&token), Err(AuthError::TokenExpired));
    }
}
