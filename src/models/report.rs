//! Read-only reporting projections

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Label/count pair for histograms
#[derive(Debug, Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Checked-out equipment past its due date
#[derive(Debug, Serialize, ToSchema)]
pub struct OverdueItem {
    pub sku: String,
    pub name: String,
    pub checked_out_by: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Whole days past due (today − due_date)
    pub days_overdue: i64,
}

/// Per-user checkout activity over a date range
#[derive(Debug, Serialize, ToSchema)]
pub struct UserActivity {
    pub user: String,
    /// Checkouts started in the range
    pub checkouts: i64,
    /// Mean checkout duration in whole days over records closed in the
    /// range; None when the user has no closed records there
    pub avg_checkout_days: Option<f64>,
}

/// Combined dashboard numbers
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub equipment: EquipmentStats,
    pub checkouts: CheckoutStats,
    pub users: UserCountStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentStats {
    pub total: i64,
    pub by_status: Vec<StatEntry>,
    pub by_category: Vec<StatEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutStats {
    /// Open ledger records
    pub open: i64,
    /// Checked-out equipment past due
    pub overdue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCountStats {
    pub total: i64,
}
