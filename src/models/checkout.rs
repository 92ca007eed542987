//! Checkout ledger model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::equipment::{Equipment, EquipmentStatus};

/// One row of the checkout ledger. Created by checkout, closed (return_date
/// set) by the matching return, otherwise immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CheckoutRecord {
    pub id: i64,
    pub sku: String,
    /// Equipment name snapshot taken at checkout time
    pub equipment_name: String,
    pub user: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    /// None while the checkout is open
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CheckoutRecord {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Condition reported when equipment comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReturnCondition {
    Good,
    #[serde(rename = "Needs Maintenance")]
    NeedsMaintenance,
    Damaged,
}

impl ReturnCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCondition::Good => "Good",
            ReturnCondition::NeedsMaintenance => "Needs Maintenance",
            ReturnCondition::Damaged => "Damaged",
        }
    }

    /// Status the equipment lands in after return. Damaged resolves to
    /// In Stock with the damage recorded in the ledger notes, matching the
    /// historical behavior of the system.
    pub fn resolved_status(&self) -> EquipmentStatus {
        match self {
            ReturnCondition::Good | ReturnCondition::Damaged => EquipmentStatus::InStock,
            ReturnCondition::NeedsMaintenance => EquipmentStatus::Maintenance,
        }
    }
}

impl std::fmt::Display for ReturnCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkout request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    /// Borrower; defaults to the acting user. Checking out for someone else
    /// requires the admin role.
    pub user: Option<String>,
    /// Checkout duration in days; defaults from configuration
    #[validate(range(min = 1, max = 180))]
    pub duration_days: Option<i64>,
    pub notes: Option<String>,
}

/// Return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub condition: ReturnCondition,
    pub notes: Option<String>,
}

/// Result of a successful checkout
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutOutcome {
    pub equipment: Equipment,
    pub record: CheckoutRecord,
}

/// Result of a successful return.
///
/// `integrity_warnings` carries detected-but-nonfatal ledger inconsistencies
/// (no open record found, more than one open record); the equipment
/// transition itself has already been committed when these are reported.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub equipment: Equipment,
    pub record: Option<CheckoutRecord>,
    pub integrity_warnings: Vec<String>,
}

/// Result of removing a user and force-releasing their holdings
#[derive(Debug, Serialize, ToSchema)]
pub struct CascadeOutcome {
    pub username: String,
    /// SKUs force-returned to stock
    pub released: Vec<String>,
    pub integrity_warnings: Vec<String>,
}

/// Result of deleting equipment
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteOutcome {
    pub sku: String,
    pub integrity_warnings: Vec<String>,
}
