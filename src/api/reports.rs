// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User reports and their moderation queue.
//!
//! Any signed-in user can report a post, a user or a comment once. Admins
//! page through the queue, move reports through their statuses and read
//! aggregate counts.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::{new_id, users::MessageResponse};
use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    models::{Report, ReportReason, ReportStatus, ReportTargetType},
    state::AppState,
    storage::{
        repository::{ReportFilter, ReportStats},
        StoreError,
    },
};

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
const RECENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    /// `post`, `user` or `comment`.
    pub target_type: String,
    pub target_id: String,
    pub reason: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReportRequest {
    pub status: String,
    #[serde(default)]
    pub admin_note: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReportListQuery {
    /// 1-based page, default 1.
    pub page: Option<usize>,
    /// Page size, default 20, at most 100.
    pub limit: Option<usize>,
    pub status: Option<String>,
    pub target_type: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub message: String,
    pub report: Report,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
    pub pagination: Pagination,
}

fn invalid(field: &str, err: impl ToString) -> ApiError {
    ApiError::bad_request(format!("Invalid {field}")).with_details(err.to_string())
}

impl ReportListQuery {
    fn filter(&self) -> Result<ReportFilter, ApiError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        Ok(ReportFilter {
            status: non_empty(&self.status)
                .map(|v| ReportStatus::parse(&v))
                .transpose()
                .map_err(|e| invalid("status", e))?,
            target_type: non_empty(&self.target_type)
                .map(|v| ReportTargetType::parse(&v))
                .transpose()
                .map_err(|e| invalid("target type", e))?,
            reason: non_empty(&self.reason)
                .map(|v| ReportReason::parse(&v))
                .transpose()
                .map_err(|e| invalid("reason", e))?,
        })
    }

    fn page_and_limit(&self) -> (usize, usize) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        (page, limit)
    }
}

/// 404 unless the reported record exists.
async fn ensure_target_exists(
    state: &AppState,
    target_type: ReportTargetType,
    target_id: &str,
) -> Result<(), ApiError> {
    let found = match target_type {
        ReportTargetType::Post => state.repos.posts.get(target_id).await.map(drop),
        ReportTargetType::User => state.repos.users.get(target_id).await.map(drop),
        ReportTargetType::Comment => state.repos.comments.get(target_id).await.map(drop),
    };
    found.map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::not_found("Reported content not found"),
        other => other.into(),
    })
}

/// Report a post, user or comment.
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "Reports",
    security(("bearer_auth" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 201, body = ReportResponse),
        (status = 400, description = "Invalid target type or reason"),
        (status = 404, description = "Reported content not found"),
        (status = 409, description = "Already reported")
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    Auth(identity): Auth,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let Json(request) = payload?;
    let target_type =
        ReportTargetType::parse(&request.target_type).map_err(|e| invalid("target type", e))?;
    let reason = ReportReason::parse(&request.reason).map_err(|e| invalid("reason", e))?;
    if request.target_id.trim().is_empty() {
        return Err(ApiError::bad_request("target_id is required"));
    }

    ensure_target_exists(&state, target_type, &request.target_id).await?;
    if state
        .repos
        .reports
        .exists_for(&identity.user_id, target_type, &request.target_id)
        .await?
    {
        return Err(ApiError::conflict("You have already reported this content"));
    }

    let now = Utc::now();
    let report = Report {
        id: new_id(),
        created_at: now,
        updated_at: now,
        reporter_id: identity.user_id,
        target_type,
        target_id: request.target_id,
        reason,
        description: request.description.trim().to_string(),
        status: ReportStatus::Pending,
        admin_id: None,
        admin_note: String::new(),
        resolved_at: None,
    };
    state.repos.reports.create(&report).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::conflict("You have already reported this content"),
        other => other.into(),
    })?;
    info!(
        report_id = %report.id,
        target_type = %report.target_type,
        target_id = %report.target_id,
        "report created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            message: "Report submitted".to_string(),
            report,
        }),
    ))
}

/// Moderation queue, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(ReportListQuery),
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ReportListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_reports(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let filter = query.filter()?;
    let (page, limit) = query.page_and_limit();
    let result = state
        .repos
        .reports
        .list(&filter, (page - 1).saturating_mul(limit), limit)
        .await?;
    let per_page = limit as i64;

    Ok(Json(ReportListResponse {
        reports: result.reports,
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            pages: (result.total + per_page - 1) / per_page,
        },
    }))
}

/// Move a report through review.
#[utoipa::path(
    put,
    path = "/api/admin/reports/{report_id}",
    params(("report_id" = String, Path, description = "Report identifier")),
    tag = "Reports",
    security(("bearer_auth" = [])),
    request_body = UpdateReportRequest,
    responses(
        (status = 200, body = ReportResponse),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Report not found")
    )
)]
pub async fn update_report(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(report_id): Path<String>,
    payload: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(request) = payload?;
    let status = ReportStatus::parse(&request.status).map_err(|e| invalid("status", e))?;

    let mut report = state.repos.reports.get(&report_id).await?;
    let now = Utc::now();
    report.status = status;
    report.admin_note = request.admin_note;
    report.admin_id = Some(admin.user_id);
    report.updated_at = now;
    if status.is_final() {
        report.resolved_at = Some(now);
    }
    state.repos.reports.update(&report).await?;
    info!(report_id = %report.id, status = %report.status, "report updated");

    Ok(Json(ReportResponse {
        message: "Report updated".to_string(),
        report,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reports/{report_id}",
    params(("report_id" = String, Path, description = "Report identifier")),
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Report not found")
    )
)]
pub async fn delete_report(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Path(report_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repos.reports.delete(&report_id).await?;
    Ok(Json(MessageResponse {
        message: "Report deleted".to_string(),
    }))
}

/// Counts by status, target type and reason, plus the last 24 hours.
#[utoipa::path(
    get,
    path = "/api/admin/reports/stats",
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ReportStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn report_stats(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<ReportStats>, ApiError> {
    let since = Utc::now() - Duration::hours(RECENT_WINDOW_HOURS);
    Ok(Json(state.repos.reports.stats(since).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::User, testing::TestContext};
    use axum::http::Method;
    use serde_json::{json, Value};

    async fn report(ctx: &TestContext, reporter: &User, body: Value) -> crate::testing::TestResponse {
        ctx.send(TestContext::request(
            Method::POST,
            "/api/reports",
            Some(reporter),
            Some(body),
        ))
        .await
    }

    #[tokio::test]
    async fn report_post_once() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        ctx.seed_post("p1", &alice, false).await;
        let body = json!({
            "target_type": "post",
            "target_id": "p1",
            "reason": "spam",
            "description": " buy now "
        });

        let created = report(&ctx, &bob, body.clone()).await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.json["report"]["status"], "pending");
        assert_eq!(created.json["report"]["description"], "buy now");
        assert_eq!(created.json["report"]["reporter_id"], "u2");

        let duplicate = report(&ctx, &bob, body).await;
        assert_eq!(duplicate.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_values_and_missing_targets() {
        let ctx = TestContext::new();
        let bob = ctx.seed_user("u2", "bob").await;

        let bad_type = report(
            &ctx,
            &bob,
            json!({ "target_type": "wallet", "target_id": "x", "reason": "spam" }),
        )
        .await;
        assert_eq!(bad_type.status, StatusCode::BAD_REQUEST);

        let bad_reason = report(
            &ctx,
            &bob,
            json!({ "target_type": "user", "target_id": "u2", "reason": "boring" }),
        )
        .await;
        assert_eq!(bad_reason.status, StatusCode::BAD_REQUEST);

        let missing = report(
            &ctx,
            &bob,
            json!({ "target_type": "comment", "target_id": "nope", "reason": "other" }),
        )
        .await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn moderation_queue_is_admin_only() {
        let ctx = TestContext::new();
        let bob = ctx.seed_user("u2", "bob").await;

        for uri in ["/api/admin/reports", "/api/admin/reports/stats"] {
            let response = ctx
                .send(TestContext::request(Method::GET, uri, Some(&bob), None))
                .await;
            assert_eq!(response.status, StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn admin_lists_filters_and_resolves() {
        let ctx = TestContext::new();
        let admin = ctx.seed_admin("a1", "root").await;
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        ctx.seed_post("p1", &alice, false).await;
        report(
            &ctx,
            &bob,
            json!({ "target_type": "post", "target_id": "p1", "reason": "spam" }),
        )
        .await;
        let created = report(
            &ctx,
            &bob,
            json!({ "target_type": "user", "target_id": "u1", "reason": "impersonation" }),
        )
        .await;
        let report_id = created.json["report"]["id"].as_str().unwrap().to_string();

        let listed = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/admin/reports?target_type=user&limit=1",
                Some(&admin),
                None,
            ))
            .await;
        assert_eq!(listed.status, StatusCode::OK);
        assert_eq!(listed.json["reports"].as_array().unwrap().len(), 1);
        assert_eq!(listed.json["reports"][0]["reason"], "impersonation");
        assert_eq!(listed.json["pagination"]["total"], 1);
        assert_eq!(listed.json["pagination"]["pages"], 1);

        let bad_filter = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/admin/reports?status=closed",
                Some(&admin),
                None,
            ))
            .await;
        assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);

        let resolved = ctx
            .send(TestContext::request(
                Method::PUT,
                &format!("/api/admin/reports/{report_id}"),
                Some(&admin),
                Some(json!({ "status": "resolved", "admin_note": "banned" })),
            ))
            .await;
        assert_eq!(resolved.status, StatusCode::OK);
        assert_eq!(resolved.json["report"]["admin_id"], "a1");
        assert_eq!(resolved.json["report"]["admin_note"], "banned");
        assert!(resolved.json["report"]["resolved_at"].is_string());

        let stats = ctx
            .send(TestContext::request(
                Method::GET,
                "/api/admin/reports/stats",
                Some(&admin),
                None,
            ))
            .await;
        assert_eq!(stats.status, StatusCode::OK);
        assert_eq!(stats.json["recent_count"], 2);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let ctx = TestContext::new();
        let admin = ctx.seed_admin("a1", "root").await;
        let bob = ctx.seed_user("u2", "bob").await;
        ctx.seed_user("u1", "alice").await;
        report(
            &ctx,
            &bob,
            json!({ "target_type": "user", "target_id": "u1", "reason": "spam" }),
        )
        .await;

        let response = ctx
            .send(TestContext::request(
                Method::GET,
                &format!("/api/admin/reports?page={}&limit=100", usize::MAX),
                Some(&admin),
                None,
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.json["reports"].as_array().unwrap().is_empty());
        assert_eq!(response.json["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn reviewing_keeps_report_open() {
        let ctx = TestContext::new();
        let admin = ctx.seed_admin("a1", "root").await;
        let bob = ctx.seed_user("u2", "bob").await;
        ctx.seed_user("u1", "alice").await;
        let created = report(
            &ctx,
            &bob,
            json!({ "target_type": "user", "target_id": "u1", "reason": "other" }),
        )
        .await;
        let uri = format!(
            "/api/admin/reports/{}",
            created.json["report"]["id"].as_str().unwrap()
        );

        let reviewed = ctx
            .send(TestContext::request(
                Method::PUT,
                &uri,
                Some(&admin),
                Some(json!({ "status": "reviewed" })),
            ))
            .await;
        assert_eq!(reviewed.json["report"]["status"], "reviewed");
        assert!(reviewed.json["report"].get("resolved_at").is_none());

        let deleted = ctx
            .send(TestContext::request(Method::DELETE, &uri, Some(&admin), None))
            .await;
        assert_eq!(deleted.status, StatusCode::OK);
        let again = ctx
            .send(TestContext::request(Method::DELETE, &uri, Some(&admin), None))
            .await;
        assert_eq!(again.status, StatusCode::NOT_FOUND);
    }
}
