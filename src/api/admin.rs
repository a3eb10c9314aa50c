// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin dashboard endpoints.
//!
//! Every handler takes [`AdminOnly`], so a caller without the admin flag gets
//! 403 before any aggregate is computed. Totals are all-time; the date range
//! only shapes the chart series and is echoed back for the dashboard.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    state::AppState,
    storage::repository::{PlatformTotals, TopUserByLikes, TopUserByPosts},
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_RANGE_DAYS: u64 = 30;
/// Longest series the evolution chart will compute.
const MAX_RANGE_DAYS: i64 = 366;
const DEFAULT_TOP_LIMIT: usize = 10;
const MAX_TOP_LIMIT: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Date window, both ends inclusive.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    /// YYYY-MM-DD, defaults to 30 days before `end_date`.
    pub start_date: Option<String>,
    /// YYYY-MM-DD, defaults to today.
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(value_type = String, example = "2026-01-01")]
    pub start: NaiveDate,
    #[schema(value_type = String, example = "2026-01-31")]
    pub end: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformStats {
    #[serde(flatten)]
    pub totals: PlatformTotals,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformStatsResponse {
    pub stats: PlatformStats,
}

/// One day of the evolution chart.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyActivity {
    #[schema(value_type = String, example = "2026-01-01")]
    pub date: NaiveDate,
    pub users: i64,
    pub posts: i64,
    pub likes: i64,
    pub messages: i64,
}

/// One slice of the distribution chart.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChartSlice {
    pub name: String,
    pub value: i64,
    pub color: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ChartData {
    Evolution(Vec<DailyActivity>),
    Distribution(Vec<ChartSlice>),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartResponse {
    pub data: ChartData,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TopUsersQuery {
    /// 1 to 100, default 10. Out-of-range values fall back to the default.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopUsersResponse {
    pub top_by_posts: Vec<TopUserByPosts>,
    pub top_by_likes: Vec<TopUserByLikes>,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        ApiError::bad_request(format!("Invalid date format for {field}"))
            .with_details("expected YYYY-MM-DD")
    })
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl DateRangeQuery {
    fn resolve(&self) -> Result<DateRange, ApiError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let end = match non_empty(&self.end_date) {
            Some(value) => parse_date("end_date", &value)?,
            None => Utc::now().date_naive(),
        };
        let start = match non_empty(&self.start_date) {
            Some(value) => parse_date("start_date", &value)?,
            None => end
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS))
                .unwrap_or(end),
        };
        if start > end {
            return Err(ApiError::bad_request("start_date must not be after end_date"));
        }
        Ok(DateRange { start, end })
    }
}

impl DateRange {
    /// Half-open instant window covering every day of the range.
    fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let after_end = self.end.succ_opt().unwrap_or(self.end);
        (midnight(self.start), midnight(after_end))
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Platform totals.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    params(DateRangeQuery),
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PlatformStatsResponse),
        (status = 400, description = "Invalid date"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn platform_stats(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    let date_range = query.resolve()?;
    let totals = state.repos.stats.totals().await?;
    info!(admin_id = %admin.user_id, "platform stats retrieved");

    Ok(Json(PlatformStatsResponse {
        stats: PlatformStats { totals, date_range },
    }))
}

/// Chart series for the dashboard: `evolution` or `distribution`.
#[utoipa::path(
    get,
    path = "/api/admin/charts/{chart_type}",
    params(
        ("chart_type" = String, Path, description = "`evolution` or `distribution`"),
        DateRangeQuery
    ),
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ChartResponse),
        (status = 400, description = "Unsupported chart type or invalid date"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn chart_data(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(chart_type): Path<String>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<ChartResponse>, ApiError> {
    let range = query.resolve()?;

    let data = match chart_type.as_str() {
        "evolution" => {
            if (range.end - range.start).num_days() >= MAX_RANGE_DAYS {
                return Err(ApiError::bad_request(format!(
                    "Date range exceeds {MAX_RANGE_DAYS} days"
                )));
            }
            let mut series = Vec::new();
            for day in range.days() {
                let (start, end) = DateRange { start: day, end: day }.bounds();
                let counts = state.repos.stats.activity_between(start, end).await?;
                series.push(DailyActivity {
                    date: day,
                    users: counts.users,
                    posts: counts.posts,
                    likes: counts.likes,
                    messages: counts.messages,
                });
            }
            ChartData::Evolution(series)
        }
        "distribution" => {
            let (start, end) = range.bounds();
            let counts = state.repos.stats.distribution_between(start, end).await?;
            let slice = |name: &str, value: i64, color: &str| ChartSlice {
                name: name.to_string(),
                value,
                color: color.to_string(),
            };
            ChartData::Distribution(vec![
                slice("Free posts", counts.free_posts, "#3B82F6"),
                slice("Premium posts", counts.paid_posts, "#F59E0B"),
                slice("Likes", counts.likes, "#EF4444"),
                slice("Messages", counts.messages, "#8B5CF6"),
            ])
        }
        _ => return Err(ApiError::bad_request("Unsupported chart type")),
    };
    info!(
        admin_id = %admin.user_id,
        chart_type = %chart_type,
        start = %range.start,
        end = %range.end,
        "chart data retrieved"
    );

    Ok(Json(ChartResponse { data }))
}

/// Most active creators.
#[utoipa::path(
    get,
    path = "/api/admin/top-users",
    params(TopUsersQuery),
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = TopUsersResponse),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn top_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(query): Query<TopUsersQuery>,
) -> Result<Json<TopUsersResponse>, ApiError> {
    let limit = query
        .limit
        .filter(|l| (1..=MAX_TOP_LIMIT).contains(l))
        .unwrap_or(DEFAULT_TOP_LIMIT);
    let top_by_posts = state.repos.stats.top_by_posts(limit).await?;
    let top_by_likes = state.repos.stats.top_by_likes(limit).await?;

    Ok(Json(TopUsersResponse {
        top_by_posts,
        top_by_likes,
    }))
}
