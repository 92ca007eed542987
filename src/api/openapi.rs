//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{equipment, health, reports, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabTrack API",
        version = "1.0.0",
        description = "Lab Equipment Tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Checkouts
        equipment::checkout_equipment,
        equipment::return_equipment,
        equipment::equipment_history,
        equipment::list_history,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
        users::get_user_equipment,
        // Reports
        reports::get_status_report,
        reports::get_category_report,
        reports::get_overdue_report,
        reports::get_activity_report,
        reports::get_summary,
    ),
    components(
        schemas(
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Checkouts
            crate::models::checkout::CheckoutRecord,
            crate::models::checkout::ReturnCondition,
            crate::models::checkout::CheckoutRequest,
            crate::models::checkout::ReturnRequest,
            crate::models::checkout::CheckoutOutcome,
            crate::models::checkout::ReturnOutcome,
            crate::models::checkout::CascadeOutcome,
            crate::models::checkout::DeleteOutcome,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::CreateUser,
            crate::models::user::UserProfile,
            // Reports
            crate::models::report::StatEntry,
            crate::models::report::OverdueItem,
            crate::models::report::UserActivity,
            crate::models::report::SummaryResponse,
            crate::models::report::EquipmentStats,
            crate::models::report::CheckoutStats,
            crate::models::report::UserCountStats,
            reports::OverdueResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment inventory management"),
        (name = "checkouts", description = "Checkout and return lifecycle"),
        (name = "users", description = "User management"),
        (name = "reports", description = "Reporting projections")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
