//! Equipment and checkout endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        checkout::{
            CheckoutOutcome, CheckoutRecord, CheckoutRequest, DeleteOutcome, ReturnOutcome,
            ReturnRequest,
        },
        equipment::{CreateEquipment, Equipment, EquipmentStatus, UpdateEquipment},
    },
};

use super::ActingUser;

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentListQuery {
    /// Filter by status label (e.g. "In Stock")
    pub status: Option<EquipmentStatus>,
    /// Filter by exact category
    pub category: Option<String>,
    /// Case-insensitive substring over sku/name/description/manufacturer
    pub search: Option<String>,
}

/// Equipment deletion parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DeleteEquipmentQuery {
    /// Delete even if checked out, closing the open ledger record
    pub force: Option<bool>,
}

/// List equipment with optional filters
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    params(EquipmentListQuery),
    responses(
        (status = 200, description = "Equipment list", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
    Query(query): Query<EquipmentListQuery>,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state
        .services
        .lifecycle
        .list_equipment(query.status, query.category.as_deref(), query.search.as_deref())
        .await?;
    Ok(Json(equipment))
}

/// Get equipment by SKU
#[utoipa::path(
    get,
    path = "/equipment/{sku}",
    tag = "equipment",
    params(("sku" = String, Path, description = "Equipment SKU")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Unknown SKU")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
    Path(sku): Path<String>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.lifecycle.get_equipment(&sku).await?;
    Ok(Json(equipment))
}

/// Intake new equipment; the SKU is assigned server-side
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    actor.require_admin()?;
    data.validate()?;

    let equipment = state.services.lifecycle.create_equipment(&data).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update equipment attributes
#[utoipa::path(
    put,
    path = "/equipment/{sku}",
    tag = "equipment",
    params(("sku" = String, Path, description = "Equipment SKU")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 404, description = "Unknown SKU")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(sku): Path<String>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    actor.require_admin()?;
    data.validate()?;

    let ctx = actor.context();
    let equipment = state.services.lifecycle.edit(&ctx, &sku, &data).await?;
    Ok(Json(equipment))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipment/{sku}",
    tag = "equipment",
    params(
        ("sku" = String, Path, description = "Equipment SKU"),
        DeleteEquipmentQuery
    ),
    responses(
        (status = 200, description = "Equipment deleted", body = DeleteOutcome),
        (status = 404, description = "Unknown SKU"),
        (status = 409, description = "Checked out and force not set")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(sku): Path<String>,
    Query(query): Query<DeleteEquipmentQuery>,
) -> AppResult<Json<DeleteOutcome>> {
    actor.require_admin()?;

    let ctx = actor.context();
    let outcome = state
        .services
        .lifecycle
        .delete_equipment(&ctx, &sku, query.force.unwrap_or(false))
        .await?;
    Ok(Json(outcome))
}

/// Check out equipment
#[utoipa::path(
    post,
    path = "/equipment/{sku}/checkout",
    tag = "checkouts",
    params(("sku" = String, Path, description = "Equipment SKU")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Equipment checked out", body = CheckoutOutcome),
        (status = 400, description = "Invalid duration"),
        (status = 404, description = "Unknown SKU or user"),
        (status = 409, description = "Not in stock")
    )
)]
pub async fn checkout_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(sku): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<CheckoutOutcome>)> {
    actor.require_write()?;
    request.validate()?;

    // Checking out on someone else's behalf is an admin action
    if let Some(ref user) = request.user {
        if user != &actor.username {
            actor.require_admin()?;
        }
    }

    let ctx = actor.context();
    let outcome = state.services.lifecycle.checkout(&ctx, &sku, &request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Return checked-out equipment
#[utoipa::path(
    post,
    path = "/equipment/{sku}/return",
    tag = "checkouts",
    params(("sku" = String, Path, description = "Equipment SKU")),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Equipment returned", body = ReturnOutcome),
        (status = 404, description = "Unknown SKU"),
        (status = 409, description = "Not checked out")
    )
)]
pub async fn return_equipment(
    State(state): State<crate::AppState>,
    ActingUser(actor): ActingUser,
    Path(sku): Path<String>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ReturnOutcome>> {
    actor.require_write()?;

    // Non-admins may only return their own holdings
    if !actor.role.is_admin() {
        let equipment = state.services.lifecycle.get_equipment(&sku).await?;
        if equipment.checked_out_by.as_deref() != Some(actor.username.as_str()) {
            return Err(AppError::Authorization(
                "Only the holder or an administrator can return this equipment".to_string(),
            ));
        }
    }

    let ctx = actor.context();
    let outcome = state
        .services
        .lifecycle
        .return_equipment(&ctx, &sku, &request)
        .await?;
    Ok(Json(outcome))
}

/// Checkout history for one SKU, newest first
#[utoipa::path(
    get,
    path = "/equipment/{sku}/history",
    tag = "checkouts",
    params(("sku" = String, Path, description = "Equipment SKU")),
    responses(
        (status = 200, description = "Checkout history", body = Vec<CheckoutRecord>),
        (status = 404, description = "Unknown SKU")
    )
)]
pub async fn equipment_history(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
    Path(sku): Path<String>,
) -> AppResult<Json<Vec<CheckoutRecord>>> {
    // 404 on unknown SKU rather than an empty list
    state.services.lifecycle.get_equipment(&sku).await?;
    let records = state.services.reports.history(Some(&sku), None, None).await?;
    Ok(Json(records))
}

/// Checkout ledger filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct HistoryListQuery {
    /// Restrict to one SKU
    pub sku: Option<String>,
    /// Earliest checkout date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Latest checkout date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

/// Full checkout ledger, optionally filtered, newest first
#[utoipa::path(
    get,
    path = "/history",
    tag = "checkouts",
    params(HistoryListQuery),
    responses(
        (status = 200, description = "Checkout ledger", body = Vec<CheckoutRecord>),
        (status = 400, description = "Invalid date format")
    )
)]
pub async fn list_history(
    State(state): State<crate::AppState>,
    ActingUser(_actor): ActingUser,
    Query(query): Query<HistoryListQuery>,
) -> AppResult<Json<Vec<CheckoutRecord>>> {
    let parse = |value: &str, field: &str| {
        chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid {} format. Use YYYY-MM-DD", field))
        })
    };
    let start_date = query
        .start_date
        .as_deref()
        .map(|s| parse(s, "start_date"))
        .transpose()?;
    let end_date = query
        .end_date
        .as_deref()
        .map(|s| parse(s, "end_date"))
        .transpose()?;

    let records = state
        .services
        .reports
        .history(query.sku.as_deref(), start_date, end_date)
        .await?;
    Ok(Json(records))
}
