// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OnlyFeed - creator subscription platform backend
//!
//! This crate serves the REST API behind the OnlyFeed frontend: profiles,
//! posts with paid media, likes, comments, follows, direct messages, reports
//! and the admin dashboard. Identity, object storage and payments are
//! delegated to external providers behind narrow traits.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token gate, refresh handling and role gate
//! - `providers` - Identity provider, object storage and billing clients
//! - `storage` - Repository traits with in-memory and Postgres backends

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
