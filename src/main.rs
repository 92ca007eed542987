//! LabTrack Server - Lab Equipment Tracking System
//!
//! A Rust REST API server for equipment checkout management.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labtrack_server::{api, config::AppConfig, db, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("labtrack_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LabTrack Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = db::create_pool(&config.database)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Create tables and seed the admin account
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database schema ready");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.checkout.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Equipment
        .route("/equipment", get(api::equipment::list_equipment))
        .route("/equipment", post(api::equipment::create_equipment))
        .route("/equipment/:sku", get(api::equipment::get_equipment))
        .route("/equipment/:sku", put(api::equipment::update_equipment))
        .route("/equipment/:sku", delete(api::equipment::delete_equipment))
        // Checkout lifecycle
        .route("/equipment/:sku/checkout", post(api::equipment::checkout_equipment))
        .route("/equipment/:sku/return", post(api::equipment::return_equipment))
        .route("/equipment/:sku/history", get(api::equipment::equipment_history))
        .route("/history", get(api::equipment::list_history))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users", post(api::users::create_user))
        .route("/users/:username", get(api::users::get_user))
        .route("/users/:username", delete(api::users::delete_user))
        .route("/users/:username/equipment", get(api::users::get_user_equipment))
        // Reports
        .route("/reports/status", get(api::reports::get_status_report))
        .route("/reports/categories", get(api::reports::get_category_report))
        .route("/reports/overdue", get(api::reports::get_overdue_report))
        .route("/reports/activity", get(api::reports::get_activity_report))
        .route("/reports/summary", get(api::reports::get_summary))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
