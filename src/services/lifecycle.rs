//! Equipment lifecycle engine.
//!
//! Owns every write to the equipment store and the checkout ledger. Each
//! operation serializes on a per-SKU lock around its read-validate-write
//! sequence, and pairs both stores' writes in one database transaction, so
//! readers never observe a checkout without its open ledger row or vice
//! versa.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::CheckoutConfig,
    error::{AppError, AppResult},
    models::{
        checkout::{
            CascadeOutcome, CheckoutOutcome, CheckoutRecord, CheckoutRequest, DeleteOutcome,
            ReturnOutcome, ReturnRequest,
        },
        equipment::{EquipmentStatus, UpdateEquipment},
        user::Role,
    },
    repository::Repository,
};

/// Per-call context supplied by the caller: who is acting, with which role,
/// and what day it is. The engine holds no session state of its own.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: String,
    pub role: Role,
    pub today: NaiveDate,
}

/// Bounded wait for a SKU lock before telling the caller to retry
const LOCK_WAIT: StdDuration = StdDuration::from_secs(5);

/// Per-SKU mutual exclusion registry
#[derive(Clone, Default)]
struct SkuLocks {
    inner: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SkuLocks {
    /// Acquire the lock for one SKU, waiting at most [`LOCK_WAIT`]
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned (indicates a panic in another
    /// thread)
    async fn acquire(&self, sku: &str) -> AppResult<OwnedMutexGuard<()>> {
        // Get or insert the entry (release the map lock quickly)
        let entry = {
            let map = self
                .inner
                .read()
                .expect("SKU lock registry poisoned - indicates a panic in another thread");
            map.get(sku).cloned()
        };
        let entry = match entry {
            Some(e) => e,
            None => {
                let mut map = self
                    .inner
                    .write()
                    .expect("SKU lock registry poisoned - indicates a panic in another thread");
                map.entry(sku.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };

        tokio::time::timeout(LOCK_WAIT, entry.lock_owned())
            .await
            .map_err(|_| {
                AppError::Conflict(format!(
                    "Equipment {} is busy with another operation, retry shortly",
                    sku
                ))
            })
    }
}

/// Ledger note text in the original append format
fn appended_return_notes(existing: Option<&str>, condition: &str, return_notes: &str) -> String {
    format!(
        "{}\nReturn Condition: {}\nReturn Notes: {}",
        existing.unwrap_or(""),
        condition,
        return_notes
    )
    .trim()
    .to_string()
}

#[derive(Clone)]
pub struct LifecycleService {
    repository: Repository,
    config: CheckoutConfig,
    locks: SkuLocks,
}

impl LifecycleService {
    pub fn new(repository: Repository, config: CheckoutConfig) -> Self {
        Self {
            repository,
            config,
            locks: SkuLocks::default(),
        }
    }

    /// Get equipment by SKU
    pub async fn get_equipment(&self, sku: &str) -> AppResult<crate::models::Equipment> {
        self.repository.equipment.get(sku).await
    }

    /// List equipment with optional filters
    pub async fn list_equipment(
        &self,
        status: Option<EquipmentStatus>,
        category: Option<&str>,
        search: Option<&str>,
    ) -> AppResult<Vec<crate::models::Equipment>> {
        self.repository.equipment.list(status, category, search).await
    }

    /// Intake new equipment under a freshly assigned SKU. Checked Out is not
    /// a valid starting status: holdings only come from the checkout
    /// operation, which pairs them with an open ledger record.
    pub async fn create_equipment(
        &self,
        data: &crate::models::equipment::CreateEquipment,
    ) -> AppResult<crate::models::Equipment> {
        if data.status == Some(EquipmentStatus::CheckedOut) {
            return Err(AppError::Validation(
                "New equipment cannot start in Checked Out; use the checkout operation".to_string(),
            ));
        }
        let equipment = self.repository.equipment.create(data).await?;
        tracing::info!(sku = %equipment.sku, name = %equipment.name, "equipment added to inventory");
        Ok(equipment)
    }

    /// Check out equipment to a user.
    ///
    /// Fails with `InvalidState` unless the equipment is In Stock, and with
    /// `Validation` when the duration is outside the allowed range. On
    /// success the equipment row and a new open ledger row are committed
    /// together.
    pub async fn checkout(
        &self,
        ctx: &RequestContext,
        sku: &str,
        request: &CheckoutRequest,
    ) -> AppResult<CheckoutOutcome> {
        let duration_days = request
            .duration_days
            .unwrap_or(self.config.default_duration_days);
        if duration_days < 1 || duration_days > self.config.max_duration_days {
            return Err(AppError::Validation(format!(
                "Checkout duration must be between 1 and {} days",
                self.config.max_duration_days
            )));
        }

        let borrower = request.user.clone().unwrap_or_else(|| ctx.actor.clone());
        self.repository.users.get(&borrower).await?;

        let _guard = self.locks.acquire(sku).await?;

        let mut equipment = self.repository.equipment.get(sku).await?;
        if equipment.status != EquipmentStatus::InStock {
            return Err(AppError::InvalidState(format!(
                "Equipment {} is {} and cannot be checked out",
                sku, equipment.status
            )));
        }

        let checkout_date = ctx.today;
        let due_date = ctx.today + Duration::days(duration_days);

        equipment.status = EquipmentStatus::CheckedOut;
        equipment.checked_out_by = Some(borrower.clone());
        equipment.checkout_date = Some(checkout_date);
        equipment.due_date = Some(due_date);
        equipment.updated_at = Utc::now();

        let mut record = CheckoutRecord {
            id: 0,
            sku: sku.to_string(),
            equipment_name: equipment.name.clone(),
            user: borrower,
            checkout_date,
            due_date,
            return_date: None,
            notes: request.notes.clone(),
        };

        let mut tx = self.repository.pool.begin().await?;
        self.repository.equipment.upsert(&mut tx, &equipment).await?;
        record.id = self.repository.history.append(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(sku = %sku, user = %record.user, due_date = %due_date, "equipment checked out");

        Ok(CheckoutOutcome { equipment, record })
    }

    /// Return checked-out equipment.
    ///
    /// The new status follows the reported condition (Damaged comes back as
    /// In Stock; the damage lives in the ledger notes). The matching open
    /// ledger record is closed in the same transaction. A missing or
    /// duplicated open record does not block the equipment transition (the
    /// equipment row is the source of truth for availability) but is
    /// reported in `integrity_warnings` and logged.
    pub async fn return_equipment(
        &self,
        ctx: &RequestContext,
        sku: &str,
        request: &ReturnRequest,
    ) -> AppResult<ReturnOutcome> {
        let _guard = self.locks.acquire(sku).await?;

        let mut equipment = self.repository.equipment.get(sku).await?;
        if equipment.status != EquipmentStatus::CheckedOut {
            return Err(AppError::InvalidState(format!(
                "Equipment {} is {} and cannot be returned",
                sku, equipment.status
            )));
        }

        let mut warnings = Vec::new();
        let open = self.repository.history.open_records(sku).await?;
        if open.is_empty() {
            tracing::warn!(sku = %sku, "no open checkout record found on return");
            warnings.push(format!(
                "No open checkout record found for {}; equipment state corrected without a ledger close",
                sku
            ));
        } else if open.len() > 1 {
            tracing::warn!(sku = %sku, count = open.len(), "multiple open checkout records for one SKU");
            warnings.push(format!(
                "{} open checkout records found for {}; closed the most recent",
                open.len(),
                sku
            ));
        }

        equipment.status = request.condition.resolved_status();
        equipment.clear_checkout_fields();
        equipment.updated_at = Utc::now();

        let mut closed = None;
        let mut tx = self.repository.pool.begin().await?;
        self.repository.equipment.upsert(&mut tx, &equipment).await?;
        if let Some(record) = open.into_iter().next() {
            let notes = appended_return_notes(
                record.notes.as_deref(),
                request.condition.as_str(),
                request.notes.as_deref().unwrap_or(""),
            );
            self.repository
                .history
                .close(&mut tx, record.id, ctx.today, &notes)
                .await?;
            closed = Some(CheckoutRecord {
                return_date: Some(ctx.today),
                notes: Some(notes),
                ..record
            });
        }
        tx.commit().await?;

        tracing::info!(
            sku = %sku,
            condition = %request.condition,
            new_status = %equipment.status,
            "equipment returned"
        );

        Ok(ReturnOutcome {
            equipment,
            record: closed,
            integrity_warnings: warnings,
        })
    }

    /// Edit equipment attributes.
    ///
    /// Absent fields stay untouched. The status field is locked while the
    /// equipment is checked out: a requested change is silently dropped
    /// rather than rejected, matching the edit form's historical behavior.
    /// Checked Out can never be reached through an edit.
    pub async fn edit(
        &self,
        _ctx: &RequestContext,
        sku: &str,
        update: &UpdateEquipment,
    ) -> AppResult<crate::models::Equipment> {
        if update.status == Some(EquipmentStatus::CheckedOut) {
            return Err(AppError::Validation(
                "Status cannot be set to Checked Out directly; use the checkout operation".to_string(),
            ));
        }

        let _guard = self.locks.acquire(sku).await?;

        let mut equipment = self.repository.equipment.get(sku).await?;

        if let Some(ref name) = update.name {
            equipment.name = name.clone();
        }
        if let Some(ref description) = update.description {
            equipment.description = Some(description.clone());
        }
        if let Some(ref category) = update.category {
            equipment.category = Some(category.clone());
        }
        if let Some(ref manufacturer) = update.manufacturer {
            equipment.manufacturer = Some(manufacturer.clone());
        }
        if let Some(ref model) = update.model {
            equipment.model = Some(model.clone());
        }
        if let Some(ref serial_number) = update.serial_number {
            equipment.serial_number = Some(serial_number.clone());
        }
        if let Some(purchase_date) = update.purchase_date {
            equipment.purchase_date = Some(purchase_date);
        }
        if let Some(purchase_price) = update.purchase_price {
            equipment.purchase_price = Some(purchase_price);
        }
        if let Some(ref location) = update.location {
            equipment.location = Some(location.clone());
        }
        if let Some(ref image_path) = update.image_path {
            equipment.image_path = Some(image_path.clone());
        }
        if let Some(status) = update.status {
            if equipment.status == EquipmentStatus::CheckedOut {
                tracing::debug!(sku = %sku, "status change ignored while checked out");
            } else {
                equipment.status = status;
            }
        }
        equipment.updated_at = Utc::now();

        let mut conn = self.repository.pool.acquire().await?;
        self.repository.equipment.upsert(&mut conn, &equipment).await?;

        Ok(equipment)
    }

    /// Delete equipment.
    ///
    /// Checked-out equipment is refused unless `force` is set, in which case
    /// any open ledger record is closed with a system-generated reason first
    /// so the ledger never ends up pointing at a vanished checkout.
    pub async fn delete_equipment(
        &self,
        ctx: &RequestContext,
        sku: &str,
        force: bool,
    ) -> AppResult<DeleteOutcome> {
        let _guard = self.locks.acquire(sku).await?;

        let equipment = self.repository.equipment.get(sku).await?;
        if equipment.status == EquipmentStatus::CheckedOut && !force {
            return Err(AppError::InvalidState(format!(
                "Equipment {} is checked out; return it first or pass force=true",
                sku
            )));
        }

        let mut warnings = Vec::new();
        let open = self.repository.history.open_records(sku).await?;
        if !open.is_empty() && equipment.status != EquipmentStatus::CheckedOut {
            tracing::warn!(sku = %sku, count = open.len(), "open checkout records on non-checked-out equipment");
            warnings.push(format!(
                "{} open checkout records found for {} despite status {}",
                open.len(),
                sku,
                equipment.status
            ));
        }

        let mut tx = self.repository.pool.begin().await?;
        for record in &open {
            let notes = appended_return_notes(
                record.notes.as_deref(),
                "Force Released",
                &format!("equipment {} deleted from inventory", sku),
            );
            self.repository
                .history
                .close(&mut tx, record.id, ctx.today, &notes)
                .await?;
        }
        self.repository.equipment.delete(&mut tx, sku).await?;
        tx.commit().await?;

        tracing::info!(sku = %sku, forced = force, "equipment deleted");

        Ok(DeleteOutcome {
            sku: sku.to_string(),
            integrity_warnings: warnings,
        })
    }

    /// Delete a user, force-returning everything they hold.
    ///
    /// Each held item is released under its own SKU lock and transaction:
    /// the equipment goes back to In Stock and the open ledger record is
    /// closed with a system-generated reason. (The ledger close is a
    /// deliberate departure from the historical behavior, which left the
    /// record dangling open.) The user row is removed last.
    pub async fn delete_user_cascade(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> AppResult<CascadeOutcome> {
        self.repository.users.get(username).await?;

        let held = self.repository.equipment.held_by(username).await?;
        let mut released = Vec::new();
        let mut warnings = Vec::new();

        for item in held {
            let _guard = self.locks.acquire(&item.sku).await?;

            // Re-read under the lock; the holding may have changed
            let mut equipment = match self.repository.equipment.get(&item.sku).await {
                Ok(e) => e,
                Err(AppError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if equipment.checked_out_by.as_deref() != Some(username) {
                continue;
            }

            let open = self.repository.history.open_records(&equipment.sku).await?;
            if open.is_empty() {
                tracing::warn!(sku = %equipment.sku, "no open checkout record for held equipment");
                warnings.push(format!(
                    "No open checkout record found for {} while force-releasing",
                    equipment.sku
                ));
            } else if open.len() > 1 {
                tracing::warn!(sku = %equipment.sku, count = open.len(), "multiple open checkout records for one SKU");
                warnings.push(format!(
                    "{} open checkout records found for {}; closed the most recent",
                    open.len(),
                    equipment.sku
                ));
            }

            equipment.status = EquipmentStatus::InStock;
            equipment.clear_checkout_fields();
            equipment.updated_at = Utc::now();

            let mut tx = self.repository.pool.begin().await?;
            self.repository.equipment.upsert(&mut tx, &equipment).await?;
            if let Some(record) = open.first() {
                let notes = appended_return_notes(
                    record.notes.as_deref(),
                    "Force Released",
                    &format!("released automatically when user {} was deleted", username),
                );
                self.repository
                    .history
                    .close(&mut tx, record.id, ctx.today, &notes)
                    .await?;
            }
            tx.commit().await?;

            released.push(equipment.sku);
        }

        let mut conn = self.repository.pool.acquire().await?;
        self.repository.users.delete(&mut conn, username).await?;

        tracing::info!(
            username = %username,
            released = released.len(),
            deleted_by = %ctx.actor,
            "user deleted with holdings released"
        );

        Ok(CascadeOutcome {
            username: username.to_string(),
            released,
            integrity_warnings: warnings,
        })
    }
}
