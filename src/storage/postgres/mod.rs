// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postgres backend.
//!
//! Enumerations are stored as text and decoded through the `TryFrom<String>`
//! impls in [`crate::models`]. The schema lives in `migrations/` and is
//! applied by [`PgStore::migrate`] at startup.

use sqlx::{postgres::PgPoolOptions, PgPool};

use super::StoreError;

mod content;
mod messages;
mod reports;
mod social;
mod stats;
mod users;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

/// Maps a driver error for `resource` onto the store taxonomy.
pub(super) fn store_error(resource: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |error| match &error {
        sqlx::Error::RowNotFound => StoreError::NotFound(resource.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(resource.to_string())
        }
        _ => StoreError::Database(error.to_string()),
    }
}

/// `Ok` when at least one row was touched, `NotFound` otherwise.
pub(super) fn expect_rows(
    result: sqlx::postgres::PgQueryResult,
    resource: &'static str,
) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        Err(StoreError::NotFound(resource.to_string()))
    } else {
        Ok(())
    }
}

pub(super) fn to_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
