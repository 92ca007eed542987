//! Checkout history ledger: append-oriented, one row per checkout event,
//! closed by the matching return.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::checkout::CheckoutRecord,
};

#[derive(Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a ledger record by id
    pub async fn get_by_id(&self, id: i64) -> AppResult<CheckoutRecord> {
        sqlx::query_as::<_, CheckoutRecord>("SELECT * FROM checkout_history WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checkout record {} not found", id)))
    }

    /// Append a new ledger row; the id field of the argument is ignored and
    /// the assigned id returned. Runs on the caller's transaction.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        record: &CheckoutRecord,
    ) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO checkout_history (
                sku, equipment_name, user, checkout_date, due_date, return_date, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.sku)
        .bind(&record.equipment_name)
        .bind(&record.user)
        .bind(record.checkout_date)
        .bind(record.due_date)
        .bind(record.return_date)
        .bind(&record.notes)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Open records for a SKU, most recently created first.
    ///
    /// The invariant allows at most one; callers treat anything beyond the
    /// first entry as an integrity anomaly and close the highest id.
    pub async fn open_records(&self, sku: &str) -> AppResult<Vec<CheckoutRecord>> {
        let rows = sqlx::query_as::<_, CheckoutRecord>(
            "SELECT * FROM checkout_history WHERE sku = ? AND return_date IS NULL ORDER BY id DESC",
        )
        .bind(sku)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Close an open record: set the return date and replace the notes with
    /// the appended text. Fails if the record is already closed; closed
    /// records are never reopened or rewritten.
    pub async fn close(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        return_date: NaiveDate,
        notes: &str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE checkout_history SET return_date = ?, notes = ? WHERE id = ? AND return_date IS NULL",
        )
        .bind(return_date)
        .bind(notes)
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidState(format!(
                "Checkout record {} is already closed",
                id
            )));
        }
        Ok(())
    }

    /// List ledger rows, optionally restricted to one SKU and/or a checkout
    /// date range (inclusive), newest checkout first (display order)
    pub async fn list(
        &self,
        sku: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<CheckoutRecord>> {
        let mut conditions = Vec::new();
        if sku.is_some() {
            conditions.push("sku = ?");
        }
        if start_date.is_some() {
            conditions.push("checkout_date >= ?");
        }
        if end_date.is_some() {
            conditions.push("checkout_date <= ?");
        }

        let mut sql = "SELECT * FROM checkout_history".to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY checkout_date DESC, id DESC");

        let mut query = sqlx::query_as::<_, CheckoutRecord>(&sql);
        if let Some(sku) = sku {
            query = query.bind(sku.to_string());
        }
        if let Some(start) = start_date {
            query = query.bind(start);
        }
        if let Some(end) = end_date {
            query = query.bind(end);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Count open ledger records
    pub async fn count_open(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM checkout_history WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
