// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use onlyfeed_server::{
    api::router,
    auth::TokenCodec,
    config::{AppConfig, LogFormat},
    providers::{S3Storage, StripeClient, SupabaseAuthClient},
    state::{AppState, Settings},
    storage::{PgStore, Repositories},
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn repositories(config: &AppConfig) -> Result<Repositories, Box<dyn std::error::Error>> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("no database configured, using the in-memory store; data is lost on restart");
        return Ok(Repositories::in_memory());
    };
    let store = PgStore::connect(database_url).await?;
    store.migrate().await?;
    info!("connected to postgres and applied migrations");
    Ok(Repositories::from_backend(store))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let repos = repositories(&config).await?;

    let state = AppState::new(
        repos,
        Arc::new(SupabaseAuthClient::new(&config.identity)?),
        Arc::new(S3Storage::new(&config.object_storage)?),
        Arc::new(StripeClient::new(&config.billing)?),
        TokenCodec::new(&config.jwt_secret),
        Settings {
            domain_url: config.domain_url.clone(),
            stripe_webhook_secret: config.billing.webhook_secret.clone(),
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        },
    );
    let app = router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "OnlyFeed server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
