// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Report repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Report, ReportReason, ReportStatus, ReportTargetType};
use crate::storage::StoreResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub target_type: Option<ReportTargetType>,
    pub reason: Option<ReportReason>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage {
    pub reports: Vec<Report>,
    /// Matches before pagination.
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: ReportStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TargetTypeCount {
    pub target_type: ReportTargetType,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReasonCount {
    pub reason: ReportReason,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportStats {
    pub stats_by_status: Vec<StatusCount>,
    pub stats_by_type: Vec<TargetTypeCount>,
    pub stats_by_reason: Vec<ReasonCount>,
    pub recent_count: i64,
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, report: &Report) -> StoreResult<()>;

    async fn get(&self, report_id: &str) -> StoreResult<Report>;

    /// Whether `reporter_id` already reported this target.
    async fn exists_for(
        &self,
        reporter_id: &str,
        target_type: ReportTargetType,
        target_id: &str,
    ) -> StoreResult<bool>;

    async fn update(&self, report: &Report) -> StoreResult<()>;

    async fn delete(&self, report_id: &str) -> StoreResult<()>;

    /// Newest first.
    async fn list(&self, filter: &ReportFilter, offset: usize, limit: usize)
        -> StoreResult<ReportPage>;

    /// Groupings over all reports. `recent_count` counts reports created
    /// after `since`.
    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<ReportStats>;
}
