//! Equipment store: a pure keyed record set. Business validation lives in
//! the lifecycle service, not here.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, EquipmentStatus},
};

static SKU_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^LAB-(\d+)$").unwrap());

/// Numeric suffix of a well-formed SKU, None for anything else
pub(crate) fn parse_sku_suffix(sku: &str) -> Option<u64> {
    SKU_PATTERN
        .captures(sku)
        .and_then(|c| c[1].parse::<u64>().ok())
}

/// SKU label for a counter value, zero-padded to five digits
fn format_sku(suffix: u64) -> String {
    format!("LAB-{:05}", suffix)
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: SqlitePool,
}

impl EquipmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get equipment by SKU
    pub async fn get(&self, sku: &str) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE sku = ?")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", sku)))
    }

    /// List equipment, optionally filtered by status, category and a free
    /// text search over sku/name/description/manufacturer
    pub async fn list(
        &self,
        status: Option<EquipmentStatus>,
        category: Option<&str>,
        search: Option<&str>,
    ) -> AppResult<Vec<Equipment>> {
        let mut conditions = Vec::new();
        if status.is_some() {
            conditions.push("status = ?");
        }
        if category.is_some() {
            conditions.push("category = ?");
        }
        if search.is_some() {
            conditions.push(
                "(sku LIKE ? OR name LIKE ? OR description LIKE ? OR manufacturer LIKE ?)",
            );
        }

        let mut sql = "SELECT * FROM equipment".to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY sku");

        let mut query = sqlx::query_as::<_, Equipment>(&sql);
        if let Some(s) = status {
            query = query.bind(s.as_str());
        }
        if let Some(c) = category {
            query = query.bind(c.to_string());
        }
        if let Some(term) = search {
            let pattern = format!("%{}%", term);
            query = query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Equipment currently held by the given user
    pub async fn held_by(&self, username: &str) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE checked_out_by = ? ORDER BY due_date",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Intake: assign the next SKU and insert the record. The counter bump
    /// and the insert share one transaction so concurrent intakes cannot
    /// collide, and deleted suffixes are never handed out again.
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let now = Utc::now();
        let status = data.status.unwrap_or(EquipmentStatus::InStock);

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE sku_sequence SET last_suffix = last_suffix + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        let suffix: i64 = sqlx::query_scalar("SELECT last_suffix FROM sku_sequence WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;

        let sku = format_sku(suffix as u64);

        sqlx::query(
            r#"
            INSERT INTO equipment (
                sku, name, description, category, manufacturer, model, serial_number,
                purchase_date, purchase_price, status, checked_out_by, checkout_date,
                due_date, location, image_path, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?, ?, ?)
            "#,
        )
        .bind(&sku)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.manufacturer)
        .bind(&data.model)
        .bind(&data.serial_number)
        .bind(data.purchase_date)
        .bind(data.purchase_price)
        .bind(status.as_str())
        .bind(&data.location)
        .bind(&data.image_path)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(&sku).await
    }

    /// Replace the record with matching SKU, or insert if absent. Runs on the
    /// caller's transaction so the lifecycle service can pair it with a
    /// ledger write.
    pub async fn upsert(&self, conn: &mut SqliteConnection, equipment: &Equipment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO equipment (
                sku, name, description, category, manufacturer, model, serial_number,
                purchase_date, purchase_price, status, checked_out_by, checkout_date,
                due_date, location, image_path, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&equipment.sku)
        .bind(&equipment.name)
        .bind(&equipment.description)
        .bind(&equipment.category)
        .bind(&equipment.manufacturer)
        .bind(&equipment.model)
        .bind(&equipment.serial_number)
        .bind(equipment.purchase_date)
        .bind(equipment.purchase_price)
        .bind(equipment.status.as_str())
        .bind(&equipment.checked_out_by)
        .bind(equipment.checkout_date)
        .bind(equipment.due_date)
        .bind(&equipment.location)
        .bind(&equipment.image_path)
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete equipment by SKU; cascade checks are the lifecycle service's
    /// responsibility
    pub async fn delete(&self, conn: &mut SqliteConnection, sku: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment WHERE sku = ?")
            .bind(sku)
            .execute(conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", sku)));
        }
        Ok(())
    }
}
