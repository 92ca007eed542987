//! Equipment model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Equipment lifecycle status.
///
/// Stored in the database under the operator-facing labels, so the column
/// values double as display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum EquipmentStatus {
    #[serde(rename = "In Stock")]
    #[sqlx(rename = "In Stock")]
    InStock,
    #[serde(rename = "Checked Out")]
    #[sqlx(rename = "Checked Out")]
    CheckedOut,
    #[serde(rename = "Under Maintenance")]
    #[sqlx(rename = "Under Maintenance")]
    Maintenance,
    #[serde(rename = "Lost/Missing")]
    #[sqlx(rename = "Lost/Missing")]
    Lost,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::InStock => "In Stock",
            EquipmentStatus::CheckedOut => "Checked Out",
            EquipmentStatus::Maintenance => "Under Maintenance",
            EquipmentStatus::Lost => "Lost/Missing",
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    /// Stock keeping unit (LAB-NNNNN), immutable once assigned
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub status: EquipmentStatus,
    /// Holder username; set together with checkout_date/due_date iff checked out
    pub checked_out_by: Option<String>,
    pub checkout_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub location: Option<String>,
    /// Reference to an externally managed image; never interpreted here
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Clear the checkout field group; must accompany any transition away
    /// from CheckedOut
    pub fn clear_checkout_fields(&mut self) {
        self.checked_out_by = None;
        self.checkout_date = None;
        self.due_date = None;
    }
}

/// Create equipment request (intake); the SKU is generated server-side
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub purchase_price: Option<f64>,
    /// Initial status; defaults to In Stock. CheckedOut is rejected since
    /// holdings only come from the checkout operation.
    pub status: Option<EquipmentStatus>,
    pub location: Option<String>,
    pub image_path: Option<String>,
}

/// Update equipment request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub purchase_price: Option<f64>,
    /// Ignored while the equipment is checked out (status lock)
    pub status: Option<EquipmentStatus>,
    pub location: Option<String>,
    pub image_path: Option<String>,
}
