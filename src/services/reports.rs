//! Reporting service: read-only projections over equipment and the checkout
//! ledger. Never mutates; reads see only committed lifecycle transitions.

use chrono::NaiveDate;
use sqlx::Row;

use crate::{
    error::AppResult,
    models::report::{
        CheckoutStats, EquipmentStats, OverdueItem, StatEntry, SummaryResponse, UserActivity,
        UserCountStats,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Database connectivity probe for the readiness endpoint
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.repository.pool)
            .await?;
        Ok(())
    }

    /// Checkout ledger rows, optionally filtered by SKU and checkout date
    /// range, newest checkout first
    pub async fn history(
        &self,
        sku: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<Vec<crate::models::CheckoutRecord>> {
        self.repository.history.list(sku, start_date, end_date).await
    }

    /// Equipment counts by status
    pub async fn status_histogram(&self) -> AppResult<Vec<StatEntry>> {
        let rows = sqlx::query(
            "SELECT status as label, COUNT(*) as value FROM equipment GROUP BY status ORDER BY value DESC",
        )
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StatEntry {
                label: row.get("label"),
                value: row.get("value"),
            })
            .collect())
    }

    /// Equipment counts by category
    pub async fn category_histogram(&self) -> AppResult<Vec<StatEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(category, 'Uncategorized') as label, COUNT(*) as value
            FROM equipment GROUP BY category ORDER BY value DESC
            "#,
        )
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StatEntry {
                label: row.get("label"),
                value: row.get("value"),
            })
            .collect())
    }

    /// Checked-out equipment past its due date, most overdue first
    pub async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<OverdueItem>> {
        let rows = sqlx::query(
            r#"
            SELECT sku, name, checked_out_by, checkout_date, due_date
            FROM equipment
            WHERE status = 'Checked Out' AND due_date < ?
            ORDER BY due_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.repository.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let checked_out_by: Option<String> = row.get("checked_out_by");
            let checkout_date: Option<NaiveDate> = row.get("checkout_date");
            let due_date: Option<NaiveDate> = row.get("due_date");
            let sku: String = row.get("sku");

            // The field group is non-null whenever status is Checked Out;
            // a row violating that is skipped rather than fabricated.
            let (Some(checked_out_by), Some(checkout_date), Some(due_date)) =
                (checked_out_by, checkout_date, due_date)
            else {
                tracing::warn!(sku = %sku, "checked-out equipment with missing checkout fields");
                continue;
            };

            items.push(OverdueItem {
                sku,
                name: row.get("name"),
                checked_out_by,
                checkout_date,
                due_date,
                days_overdue: (today - due_date).num_days(),
            });
        }

        Ok(items)
    }

    /// Overdue equipment counts grouped by holder
    pub async fn overdue_by_user(&self, today: NaiveDate) -> AppResult<Vec<StatEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT checked_out_by as label, COUNT(*) as value
            FROM equipment
            WHERE status = 'Checked Out' AND due_date < ? AND checked_out_by IS NOT NULL
            GROUP BY checked_out_by ORDER BY value DESC
            "#,
        )
        .bind(today)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StatEntry {
                label: row.get("label"),
                value: row.get("value"),
            })
            .collect())
    }

    /// Per-user checkout counts and mean checkout duration over the ledger
    /// records whose checkout falls inside the date range (inclusive). The
    /// mean only considers closed records; dates are day-granular so the
    /// duration is a whole number of days per record.
    pub async fn user_activity(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<UserActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT user,
                   COUNT(*) as checkouts,
                   AVG(CASE WHEN return_date IS NOT NULL
                       THEN julianday(return_date) - julianday(checkout_date) END) as avg_days
            FROM checkout_history
            WHERE checkout_date >= ? AND checkout_date <= ?
            GROUP BY user
            ORDER BY checkouts DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserActivity {
                user: row.get("user"),
                checkouts: row.get("checkouts"),
                avg_checkout_days: row.get("avg_days"),
            })
            .collect())
    }

    /// Combined dashboard numbers
    pub async fn summary(&self, today: NaiveDate) -> AppResult<SummaryResponse> {
        let pool = &self.repository.pool;

        let total_equipment: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment")
            .fetch_one(pool)
            .await?;

        let overdue: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM equipment WHERE status = 'Checked Out' AND due_date < ?",
        )
        .bind(today)
        .fetch_one(pool)
        .await?;

        Ok(SummaryResponse {
            equipment: EquipmentStats {
                total: total_equipment,
                by_status: self.status_histogram().await?,
                by_category: self.category_histogram().await?,
            },
            checkouts: CheckoutStats {
                open: self.repository.history.count_open().await?,
                overdue,
            },
            users: UserCountStats {
                total: self.repository.users.count().await?,
            },
        })
    }
}
