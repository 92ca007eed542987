//! Shared helpers for integration tests: an in-memory database with the
//! full schema, plus builders for the fixtures most tests need.

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use labtrack_server::{
    config::CheckoutConfig,
    models::equipment::CreateEquipment,
    models::user::{CreateUser, Role},
    repository::Repository,
    services::lifecycle::RequestContext,
    services::Services,
};

/// Services over a fresh in-memory database. A single connection keeps the
/// in-memory database alive and shared for the whole test. The pool is also
/// returned so tests can inspect or corrupt state directly.
pub async fn test_services() -> (Services, sqlx::SqlitePool) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    labtrack_server::db::run_migrations(&pool)
        .await
        .expect("Failed to set up schema");

    let services = Services::new(Repository::new(pool.clone()), CheckoutConfig::default());
    (services, pool)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn admin_ctx(today: NaiveDate) -> RequestContext {
    RequestContext {
        actor: "admin".to_string(),
        role: Role::Admin,
        today,
    }
}

pub fn new_equipment(name: &str) -> CreateEquipment {
    CreateEquipment {
        name: name.to_string(),
        description: None,
        category: Some("Instruments".to_string()),
        manufacturer: None,
        model: None,
        serial_number: None,
        purchase_date: None,
        purchase_price: None,
        status: None,
        location: None,
        image_path: None,
    }
}

pub fn new_user(username: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "changeme1".to_string(),
        role: Role::User,
        name: username.to_string(),
        department: Some("Research".to_string()),
    }
}

/// Seed one user and one equipment item, returning the assigned SKU
pub async fn seed_user_and_equipment(services: &Services, username: &str, name: &str) -> String {
    services
        .users
        .create(&new_user(username))
        .await
        .expect("Failed to create user");
    let equipment = services
        .lifecycle
        .create_equipment(&new_equipment(name))
        .await
        .expect("Failed to create equipment");
    equipment.sku
}
