//! Database pool construction and schema setup

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::repository::equipment::parse_sku_suffix;
use crate::services::users::hash_password;

/// Create the SQLite connection pool, creating the database file and its
/// parent directory if needed
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let file = config
        .url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if file != ":memory:" {
        if let Some(parent) = std::path::Path::new(file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create database tables if they don't exist and seed the admin account
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY CHECK(length(username) >= 3 AND length(username) <= 50),
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('admin', 'user', 'readonly')),
            name TEXT NOT NULL,
            department TEXT,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS equipment (
            sku TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0),
            description TEXT,
            category TEXT,
            manufacturer TEXT,
            model TEXT,
            serial_number TEXT,
            purchase_date DATE,
            purchase_price REAL CHECK(purchase_price IS NULL OR purchase_price >= 0),
            status TEXT NOT NULL DEFAULT 'In Stock' CHECK(
                status IN ('In Stock', 'Checked Out', 'Under Maintenance', 'Lost/Missing')
            ),
            checked_out_by TEXT,
            checkout_date DATE,
            due_date DATE,
            location TEXT,
            image_path TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (checked_out_by) REFERENCES users (username)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Audit ledger: rows deliberately carry no foreign keys so history
    // survives deletion of the equipment or user it refers to.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checkout_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sku TEXT NOT NULL,
            equipment_name TEXT NOT NULL,
            user TEXT NOT NULL,
            checkout_date DATE NOT NULL,
            due_date DATE NOT NULL,
            return_date DATE,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_sku_open ON checkout_history (sku, return_date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_user ON checkout_history (user)",
    )
    .execute(pool)
    .await?;

    // SKU counter: suffixes increase monotonically and are never reused,
    // even after the equipment row with the highest suffix is deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sku_sequence (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            last_suffix INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    seed_sku_sequence(pool).await?;
    seed_admin_user(pool).await?;

    Ok(())
}

/// Seed the SKU counter from the highest suffix already assigned. A no-op
/// once the counter row exists.
async fn seed_sku_sequence(pool: &SqlitePool) -> Result<()> {
    let skus: Vec<String> = sqlx::query_scalar("SELECT sku FROM equipment WHERE sku LIKE 'LAB-%'")
        .fetch_all(pool)
        .await?;

    let seed = skus
        .iter()
        .filter_map(|sku| parse_sku_suffix(sku))
        .max()
        .unwrap_or(0);

    sqlx::query("INSERT OR IGNORE INTO sku_sequence (id, last_suffix) VALUES (1, ?)")
        .bind(seed as i64)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the default admin account on first startup
async fn seed_admin_user(pool: &SqlitePool) -> Result<()> {
    let admin_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = 'admin')")
            .fetch_one(pool)
            .await?;

    if !admin_exists {
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role, name, department, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind("admin")
        .bind("admin@example.com")
        .bind(hash_password("admin123"))
        .bind("admin")
        .bind("Administrator")
        .bind("IT")
        .bind(chrono::Utc::now())
        .execute(pool)
        .await?;

        tracing::info!("Seeded default admin account");
    }

    Ok(())
}
