// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into an [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_URL` | Postgres connection string (alias `SUPABASE_DB_URL`) | In-memory store |
//! | `JWT_SECRET` | Shared HMAC secret used to verify bearer tokens | Required |
//! | `SUPABASE_URL` | Identity provider base URL (alias `NEXT_PUBLIC_SUPABASE_URL`) | Required |
//! | `SUPABASE_ANON_KEY` | Identity provider public API key | Required |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Identity provider admin key | Required |
//! | `AWS_BUCKET_NAME` | Media bucket | Required |
//! | `AWS_REGION` | Media bucket region | Required |
//! | `AWS_ACCESS_KEY_ID` | Object storage access key | Required |
//! | `AWS_SECRET_ACCESS_KEY` | Object storage secret key | Required |
//! | `AWS_ENDPOINT_URL` | Object storage endpoint override | Optional |
//! | `STRIPE_SECRET_KEY` | Stripe API key | Required |
//! | `STRIPE_WEBHOOK_SECRET` | Stripe webhook signing secret | Required |
//! | `STRIPE_API_BASE_URL` | Stripe API base | `https://api.stripe.com` |
//! | `DOMAIN_URL` | Frontend origin used in billing redirects | `http://localhost:5000` |
//! | `CORS_ALLOWED_ORIGINS` | Comma separated allowed origins | Frontend origins |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_URL_FALLBACK_ENV: &str = "SUPABASE_DB_URL";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_URL_FALLBACK_ENV: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const SUPABASE_SERVICE_ROLE_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const AWS_BUCKET_NAME_ENV: &str = "AWS_BUCKET_NAME";
pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_ENDPOINT_URL_ENV: &str = "AWS_ENDPOINT_URL";
pub const STRIPE_SECRET_KEY_ENV: &str = "STRIPE_SECRET_KEY";
pub const STRIPE_WEBHOOK_SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";
pub const STRIPE_API_BASE_URL_ENV: &str = "STRIPE_API_BASE_URL";
pub const DOMAIN_URL_ENV: &str = "DOMAIN_URL";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_DOMAIN_URL: &str = "http://localhost:5000";
const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "https://onlyfeed-9f05c.web.app,http://localhost:5000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env_optional(LOG_FORMAT_ENV).as_deref() {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub anon_key: String,
    pub service_role_key: String,
}

#[derive(Debug, Clone)]
pub struct ObjectStorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base_url: String,
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub identity: IdentityConfig,
    pub object_storage: ObjectStorageConfig,
    pub billing: BillingConfig,
    pub domain_url: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env_optional(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: env_or_default(HOST_ENV, DEFAULT_HOST),
            port,
            database_url: env_optional(DATABASE_URL_ENV)
                .or_else(|| env_optional(DATABASE_URL_FALLBACK_ENV)),
            jwt_secret: env_required(JWT_SECRET_ENV)?,
            identity: IdentityConfig {
                base_url: env_optional(SUPABASE_URL_ENV)
                    .or_else(|| env_optional(SUPABASE_URL_FALLBACK_ENV))
                    .ok_or(ConfigError::Missing(SUPABASE_URL_ENV))?,
                anon_key: env_required(SUPABASE_ANON_KEY_ENV)?,
                service_role_key: env_required(SUPABASE_SERVICE_ROLE_KEY_ENV)?,
            },
            object_storage: ObjectStorageConfig {
                bucket: env_required(AWS_BUCKET_NAME_ENV)?,
                region: env_required(AWS_REGION_ENV)?,
                access_key_id: env_required(AWS_ACCESS_KEY_ID_ENV)?,
                secret_access_key: env_required(AWS_SECRET_ACCESS_KEY_ENV)?,
                endpoint: env_optional(AWS_ENDPOINT_URL_ENV),
            },
            billing: BillingConfig {
                secret_key: env_required(STRIPE_SECRET_KEY_ENV)?,
                webhook_secret: env_required(STRIPE_WEBHOOK_SECRET_ENV)?,
                api_base_url: env_or_default(STRIPE_API_BASE_URL_ENV, DEFAULT_STRIPE_API_BASE_URL),
            },
            domain_url: env_or_default(DOMAIN_URL_ENV, DEFAULT_DOMAIN_URL)
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origins: parse_origins(&env_or_default(
                CORS_ALLOWED_ORIGINS_ENV,
                DEFAULT_CORS_ALLOWED_ORIGINS,
            )),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits a comma separated origin list. Trailing slashes are dropped since
/// browsers never send them in `Origin`.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

pub fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
