//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::report::{OverdueItem, StatEntry, SummaryResponse, UserActivity},
};

use super::ActingUser;

/// Overdue equipment report
#[derive(Serialize, ToSchema)]
pub struct OverdueResponse {
    /// Number of overdue items
    pub total: usize,
    pub items: Vec<OverdueItem>,
    /// Overdue counts grouped by holder
    pub by_user: Vec<StatEntry>,
}

/// Date range for the activity report; defaults to the last 30 days
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ActivityQuery {
    /// Range start (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Range end (YYYY-MM-DD)
    pub end_date: Option<String>,
}

fn parse_date(value: &str, field: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!("Invalid {} format. Use YYYY-MM-DD", field))
    })
}

/// Equipment counts by status
#[utoipa::path(
    get,
    path = "/reports/status",
    tag = "reports",
    responses(
        (status = 200, description = "Status histogram", body = Vec<StatEntry>)
    )
)]
pub async fn get_status_report(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
) -> AppResult<Json<Vec<StatEntry>>> {
    let stats = state.services.reports.status_histogram().await?;
    Ok(Json(stats))
}

/// Equipment counts by category
#[utoipa::path(
    get,
    path = "/reports/categories",
    tag = "reports",
    responses(
        (status = 200, description = "Category histogram", body = Vec<StatEntry>)
    )
)]
pub async fn get_category_report(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
) -> AppResult<Json<Vec<StatEntry>>> {
    let stats = state.services.reports.category_histogram().await?;
    Ok(Json(stats))
}

/// Overdue equipment as of today; feeds the external reminder workflow
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    responses(
        (status = 200, description = "Overdue equipment", body = OverdueResponse)
    )
)]
pub async fn get_overdue_report(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
) -> AppResult<Json<OverdueResponse>> {
    let today = actor.context().today;
    let items = state.services.reports.overdue(today).await?;
    let by_user = state.services.reports.overdue_by_user(today).await?;

    Ok(Json(OverdueResponse {
        total: items.len(),
        items,
        by_user,
    }))
}

/// Per-user checkout activity over a date range
#[utoipa::path(
    get,
    path = "/reports/activity",
    tag = "reports",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Per-user checkout activity", body = Vec<UserActivity>),
        (status = 400, description = "Invalid date format")
    )
)]
pub async fn get_activity_report(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<UserActivity>>> {
    let today = actor.context().today;

    let start_date = match query.start_date {
        Some(ref s) => parse_date(s, "start_date")?,
        None => today - Duration::days(30),
    };
    let end_date = match query.end_date {
        Some(ref s) => parse_date(s, "end_date")?,
        None => today,
    };
    if end_date < start_date {
        return Err(AppError::Validation(
            "end_date must not precede start_date".to_string(),
        ));
    }

    let activity = state
        .services
        .reports
        .user_activity(start_date, end_date)
        .await?;
    Ok(Json(activity))
}

/// Combined dashboard numbers
#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    responses(
        (status = 200, description = "Summary statistics", body = SummaryResponse)
    )
)]
pub async fn get_summary(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
) -> AppResult<Json<SummaryResponse>> {
    let today = actor.context().today;
    let summary = state.services.reports.summary(today).await?;
    Ok(Json(summary))
}
