// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! S3 media storage.
//!
//! Requests are signed with AWS Signature Version 4 using an unsigned
//! payload, so uploads are streamed without hashing the body. With the
//! default endpoint objects are addressed virtual-host style
//! (`https://{bucket}.s3.{region}.amazonaws.com/{key}`); a custom endpoint
//! switches to path style (`{endpoint}/{bucket}/{key}`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::ObjectStorageConfig;

type HmacSha256 = Hmac<Sha256>;

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("object storage returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("object storage request failed: {0}")]
    Request(String),

    #[error("url does not belong to the media bucket: {0}")]
    ForeignUrl(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `{folder}/{file_name}` and returns its public URL.
    async fn put(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    async fn delete_by_url(&self, url: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    /// Scheme and host requests are sent to.
    origin: String,
    host: String,
    /// Prefix of every object path, `/` or `/{bucket}/`.
    path_prefix: String,
    http: Client,
}

impl S3Storage {
    pub fn new(config: &ObjectStorageConfig) -> Result<Self, StorageError> {
        let http = super::http_client()
            .map_err(|e| StorageError::Request(format!("failed to build HTTP client: {e}")))?;

        let (origin, host, path_prefix) = match config.endpoint.as_deref() {
            Some(endpoint) => {
                let parsed = url::Url::parse(endpoint)
                    .map_err(|e| StorageError::Request(format!("invalid endpoint: {e}")))?;
                let host = match (parsed.host_str(), parsed.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => {
                        return Err(StorageError::Request("endpoint has no host".to_string()))
                    }
                };
                (
                    format!("{}://{host}", parsed.scheme()),
                    host,
                    format!("/{}/", config.bucket),
                )
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", config.bucket, config.region);
                (format!("https://{host}"), host, "/".to_string())
            }
        };

        Ok(Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            origin,
            host,
            path_prefix,
            http,
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!("{}{}", self.path_prefix, encode_path(key))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.origin, self.object_path(key))
    }

    /// Recovers the object key from a URL produced by [`Self::public_url`].
    fn key_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}{}", self.origin, self.path_prefix);
        url.strip_prefix(&prefix)
            .filter(|key| !key.is_empty())
            .map(decode_path)
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key);
        let signed = sign_request(
            &SigningInput {
                method: method.as_str(),
                host: &self.host,
                path: &path,
                region: &self.region,
                access_key_id: &self.access_key_id,
                secret_access_key: &self.secret_access_key,
            },
            Utc::now(),
        );

        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.origin, path))
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", UNSIGNED_PAYLOAD)
            .header("authorization", &signed.authorization);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("{method} {key} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status, body });
        }
        debug!(bucket = %self.bucket, key, %method, "object storage request succeeded");
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = format!("{}/{}", folder.trim_matches('/'), file_name);
        self.send(Method::PUT, &key, Some(content_type), bytes)
            .await?;
        Ok(self.public_url(&key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), StorageError> {
        let key = self
            .key_from_url(url)
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;
        self.send(Method::DELETE, &key, None, Vec::new()).await
    }
}

struct SigningInput<'a> {
    method: &'a str,
    host: &'a str,
    path: &'a str,
    region: &'a str,
    access_key_id: &'a str,
    secret_access_key: &'a str,
}

struct SignedHeaders {
    amz_date: String,
    authorization: String,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn canonical_request(method: &str, host: &str, path: &str, amz_date: &str) -> String {
    format!(
        "{method}\n{path}\n\nhost:{host}\nx-amz-content-sha256:{UNSIGNED_PAYLOAD}\n\
         x-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{UNSIGNED_PAYLOAD}"
    )
}

fn sign_request(input: &SigningInput<'_>, now: DateTime<Utc>) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let scope = format!("{date_stamp}/{}/s3/aws4_request", input.region);

    let canonical = canonical_request(input.method, input.host, input.path, &amz_date);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );
    let key = signing_key(input.secret_access_key, &date_stamp, input.region, "s3");
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            input.access_key_id
        ),
        amz_date,
    }
}

/// Percent-encodes everything but unreserved characters and `/`.
fn encode_path(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

fn decode_path(path: &str) -> String {
    url::form_urlencoded::parse(format!("k={}", path.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(endpoint: Option<&str>) -> ObjectStorageConfig {
        ObjectStorageConfig {
            bucket: "onlyfeed-media".to_string(),
            region: "eu-west-3".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn derives_documented_signing_key() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn public_url_is_virtual_host_style_by_default() {
        let storage = S3Storage::new(&config(None)).unwrap();
        assert_eq!(
            storage.public_url("avatars/user_42.png"),
            "https://onlyfeed-media.s3.eu-west-3.amazonaws.com/avatars/user_42.png"
        );
    }

    #[test]
    fn custom_endpoint_uses_path_style() {
        let storage = S3Storage::new(&config(Some("http://localhost:9000"))).unwrap();
        let url = storage.public_url("posts/post_1.mp4");
        assert_eq!(url, "http://localhost:9000/onlyfeed-media/posts/post_1.mp4");
        assert_eq!(storage.key_from_url(&url).as_deref(), Some("posts/post_1.mp4"));
    }

    #[test]
    fn key_round_trips_through_encoded_url() {
        let storage = S3Storage::new(&config(None)).unwrap();
        let url = storage.public_url("messages/my file+1.pdf");
        assert!(url.ends_with("messages/my%20file%2B1.pdf"));
        assert_eq!(
            storage.key_from_url(&url).as_deref(),
            Some("messages/my file+1.pdf")
        );
        assert_eq!(storage.key_from_url("https://elsewhere.example/x.png"), None);
    }

    #[test]
    fn authorization_header_names_scope_and_signed_headers() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let signed = sign_request(
            &SigningInput {
                method: "PUT",
                host: "onlyfeed-media.s3.eu-west-3.amazonaws.com",
                path: "/avatars/user_1.png",
                region: "eu-west-3",
                access_key_id: "AKIDEXAMPLE",
                secret_access_key: "secret",
            },
            now,
        );
        assert_eq!(signed.amz_date, "20260301T120000Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20260301/eu-west-3/s3/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        let signature = signed.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
    }
}
