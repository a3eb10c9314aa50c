// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{expect_rows, store_error, to_limit, PgStore};
use crate::models::{Report, ReportReason, ReportStatus, ReportTargetType, UnknownVariant};
use crate::storage::repository::reports::{ReasonCount, StatusCount, TargetTypeCount};
use crate::storage::repository::{ReportFilter, ReportPage, ReportStats};
use crate::storage::{ReportRepository, StoreError, StoreResult};

const REPORT_COLUMNS: &str = "id, created_at, updated_at, reporter_id, target_type, target_id, \
     reason, description, status, admin_id, admin_note, resolved_at";

/// Shared WHERE clause for the optional list filters, bound as `$1..$3`.
const FILTER_CLAUSE: &str = "($1::text IS NULL OR status = $1) \
     AND ($2::text IS NULL OR target_type = $2) \
     AND ($3::text IS NULL OR reason = $3)";

fn decode(error: UnknownVariant) -> StoreError {
    StoreError::Database(error.to_string())
}

impl PgStore {
    async fn grouped(&self, column: &'static str) -> StoreResult<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT {column}, COUNT(*) FROM reports GROUP BY {column}"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Report"))
    }
}

/// Orders parsed groups the way the variants are declared.
fn ordered<T: PartialEq + Copy, C>(
    all: &[T],
    rows: Vec<(String, i64)>,
    parse: impl Fn(&str) -> Result<T, UnknownVariant>,
    build: impl Fn(T, i64) -> C,
) -> StoreResult<Vec<C>> {
    let mut parsed = rows
        .into_iter()
        .map(|(value, count)| parse(&value).map(|variant| (variant, count)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(decode)?;
    parsed.sort_by_key(|(variant, _)| all.iter().position(|v| v == variant));
    Ok(parsed
        .into_iter()
        .map(|(variant, count)| build(variant, count))
        .collect())
}

#[async_trait]
impl ReportRepository for PgStore {
    async fn create(&self, report: &Report) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, created_at, updated_at, reporter_id, target_type, \
             target_id, reason, description, status, admin_id, admin_note, resolved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&report.id)
        .bind(report.created_at)
        .bind(report.updated_at)
        .bind(&report.reporter_id)
        .bind(report.target_type.as_str())
        .bind(&report.target_id)
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(&report.admin_id)
        .bind(&report.admin_note)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Report"))?;
        Ok(())
    }

    async fn get(&self, report_id: &str) -> StoreResult<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(report_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Report"))
    }

    async fn exists_for(
        &self,
        reporter_id: &str,
        target_type: ReportTargetType,
        target_id: &str,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reports \
             WHERE reporter_id = $1 AND target_type = $2 AND target_id = $3)",
        )
        .bind(reporter_id)
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Report"))
    }

    async fn update(&self, report: &Report) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE reports SET updated_at = $2, status = $3, admin_id = $4, admin_note = $5, \
             resolved_at = $6 WHERE id = $1",
        )
        .bind(&report.id)
        .bind(report.updated_at)
        .bind(report.status.as_str())
        .bind(&report.admin_id)
        .bind(&report.admin_note)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Report"))?;
        expect_rows(result, "Report")
    }

    async fn delete(&self, report_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Report"))?;
        expect_rows(result, "Report")
    }

    async fn list(
        &self,
        filter: &ReportFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<ReportPage> {
        let status = filter.status.map(|s| s.as_str());
        let target_type = filter.target_type.map(|t| t.as_str());
        let reason = filter.reason.map(|r| r.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM reports WHERE {FILTER_CLAUSE}"
        ))
        .bind(status)
        .bind(target_type)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Report"))?;

        let reports = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(status)
        .bind(target_type)
        .bind(reason)
        .bind(to_limit(limit))
        .bind(to_limit(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Report"))?;

        Ok(ReportPage { reports, total })
    }

    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<ReportStats> {
        let stats_by_status = ordered(
            ReportStatus::ALL,
            self.grouped("status").await?,
            ReportStatus::parse,
            |status, count| StatusCount { status, count },
        )?;
        let stats_by_type = ordered(
            ReportTargetType::ALL,
            self.grouped("target_type").await?,
            ReportTargetType::parse,
            |target_type, count| TargetTypeCount { target_type, count },
        )?;
        let stats_by_reason = ordered(
            ReportReason::ALL,
            self.grouped("reason").await?,
            ReportReason::parse,
            |reason, count| ReasonCount { reason, count },
        )?;
        let recent_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE created_at > $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error("Report"))?;

        Ok(ReportStats {
            stats_by_status,
            stats_by_type,
            stats_by_reason,
            recent_count,
        })
    }
}
