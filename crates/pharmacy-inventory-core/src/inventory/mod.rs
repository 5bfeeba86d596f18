//! Inventory service: the only mutation entry point for stock.
//!
//! Operations: Dispense (FIFO) → Restock → Adjust → Write-off, plus read-side
//! snapshots and category rollups.
//!
//! Every mutation loads the medication with its batches, validates, applies
//! the change in memory, then writes batches, medication and one ledger entry
//! inside a single SQLite transaction. Any error rolls the whole operation
//! back. Callers sharing a store across threads must serialize access (the FFI
//! layer holds the [`Database`] behind a mutex).

mod adjust;
mod dispense;
mod restock;
mod summary;

pub use dispense::*;
pub use restock::*;
pub use summary::*;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::config::InventorySettings;
use crate::db::{Database, DbError};
use crate::ledger::{Ledger, LedgerError, LedgerVerification};
use crate::models::{
    Medication, MedicationSnapshot, MedicationUpdate, NewMedication, Transaction, TransactionType,
};
use crate::status::StatusResolver;

/// Inventory errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error(
        "Eligible stock shortfall: requested {requested}, dispensable batches hold {eligible}, recorded stock {current_stock}"
    )]
    EligibleStockShortfall {
        requested: i64,
        eligible: i64,
        current_stock: i64,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<rusqlite::Error> for InventoryError {
    fn from(e: rusqlite::Error) -> Self {
        InventoryError::Database(DbError::Sqlite(e))
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Inventory service bound to one store.
pub struct Inventory<'a> {
    db: &'a Database,
    resolver: StatusResolver,
    operator: String,
    today: Option<NaiveDate>,
}

impl<'a> Inventory<'a> {
    /// Create a service with default settings.
    pub fn new(db: &'a Database) -> Self {
        Self::with_settings(db, &InventorySettings::default())
    }

    /// Create a service from loaded settings.
    pub fn with_settings(db: &'a Database, settings: &InventorySettings) -> Self {
        Self {
            db,
            resolver: StatusResolver::new(settings.near_expiry_days),
            operator: settings.default_operator.clone(),
            today: None,
        }
    }

    /// Record movements as performed by `operator`.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    /// Evaluate expiry against a fixed date instead of the current day.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The date statuses are evaluated against.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    // =========================================================================
    // Medication records
    // =========================================================================

    /// Register a medication. It starts with no stock and no batches.
    pub fn add_medication(&self, new: NewMedication) -> InventoryResult<MedicationSnapshot> {
        require_text("name", &new.name)?;
        require_text("strength", &new.strength)?;
        require_text("dosage form", &new.dosage_form)?;
        require_text("location", &new.location)?;
        validate_thresholds(new.pack_size, new.minimum_stock, new.maximum_stock, new.monthly_usage)?;

        let medication = new.into_medication();
        self.db.insert_medication(&medication)?;

        info!(
            medication_id = %medication.id,
            name = %medication.display_name(),
            category = %medication.category,
            "Medication registered"
        );
        Ok(self.snapshot(medication))
    }

    /// Edit descriptive fields and thresholds. Stock and batches are untouched.
    pub fn update_medication(
        &self,
        medication_id: &str,
        update: MedicationUpdate,
    ) -> InventoryResult<MedicationSnapshot> {
        self.atomically(|| {
            let mut medication = self.load(medication_id)?;
            update.apply_to(&mut medication);

            require_text("name", &medication.name)?;
            require_text("strength", &medication.strength)?;
            validate_thresholds(
                medication.pack_size,
                medication.minimum_stock,
                medication.maximum_stock,
                medication.monthly_usage,
            )?;

            medication.touch();
            self.save(&medication)?;
            info!(medication_id = %medication.id, "Medication updated");
            Ok(self.snapshot(medication))
        })
    }

    /// Get a medication with derived status fields populated.
    pub fn get_medication(&self, medication_id: &str) -> InventoryResult<MedicationSnapshot> {
        Ok(self.snapshot(self.load(medication_id)?))
    }

    /// All medications ordered by name, with derived status.
    pub fn list_medications(&self) -> InventoryResult<Vec<MedicationSnapshot>> {
        Ok(self
            .db
            .list_medications()?
            .into_iter()
            .map(|m| self.snapshot(m))
            .collect())
    }

    /// `current_stock` minus the batch total (non-zero only after adjustments).
    pub fn stock_drift(&self, medication_id: &str) -> InventoryResult<i64> {
        Ok(self.load(medication_id)?.unallocated_units())
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Transactions most-recent-first, optionally for one medication.
    pub fn list_transactions(&self, medication_id: Option<&str>) -> InventoryResult<Vec<Transaction>> {
        if let Some(id) = medication_id {
            if !self.db.medication_exists(id)? {
                return Err(InventoryError::NotFound(format!("medication {}", id)));
            }
        }
        Ok(self.db.list_transactions(medication_id)?)
    }

    /// Transactions of one type, most-recent-first.
    pub fn list_transactions_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> InventoryResult<Vec<Transaction>> {
        Ok(self.db.list_transactions_by_type(transaction_type)?)
    }

    /// Recompute the ledger hash chain.
    pub fn verify_ledger(&self) -> InventoryResult<LedgerVerification> {
        Ok(Ledger::new(self.db).verify()?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load(&self, medication_id: &str) -> InventoryResult<Medication> {
        self.db
            .get_medication(medication_id)?
            .ok_or_else(|| InventoryError::NotFound(format!("medication {}", medication_id)))
    }

    fn snapshot(&self, medication: Medication) -> MedicationSnapshot {
        MedicationSnapshot::resolve(medication, self.today(), &self.resolver)
    }

    fn save(&self, medication: &Medication) -> InventoryResult<()> {
        if !self.db.update_medication(medication)? {
            return Err(InventoryError::NotFound(format!("medication {}", medication.id)));
        }
        Ok(())
    }

    /// Persist a mutated medication and its ledger entry.
    fn record(&self, medication: &Medication, transaction: &Transaction) -> InventoryResult<()> {
        self.save(medication)?;
        Ledger::new(self.db).append(transaction)?;
        Ok(())
    }

    /// Run `op` inside one SQLite transaction, committing only on success.
    fn atomically<T>(&self, op: impl FnOnce() -> InventoryResult<T>) -> InventoryResult<T> {
        let tx = self.db.begin()?;
        let value = op()?;
        tx.commit()?;
        Ok(value)
    }
}

fn require_text(field: &str, value: &str) -> InventoryResult<()> {
    if value.trim().is_empty() {
        return Err(InventoryError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_thresholds(
    pack_size: i64,
    minimum_stock: i64,
    maximum_stock: i64,
    monthly_usage: i64,
) -> InventoryResult<()> {
    if pack_size <= 0 {
        return Err(InventoryError::InvalidInput("pack size must be positive".into()));
    }
    if minimum_stock < 0 || maximum_stock < 0 || monthly_usage < 0 {
        return Err(InventoryError::InvalidInput(
            "stock thresholds and usage must not be negative".into(),
        ));
    }
    if maximum_stock < minimum_stock {
        return Err(InventoryError::InvalidInput(
            "maximum stock must not be below minimum stock".into(),
        ));
    }
    Ok(())
}

/// Shared fixtures for the inventory unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::MedicationCategory;
    use chrono::Duration;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    pub fn in_days(days: i64) -> NaiveDate {
        today() + Duration::days(days)
    }

    pub fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn inventory(db: &Database) -> Inventory<'_> {
        Inventory::new(db).as_of(today()).with_operator("tester")
    }

    pub fn add_amoxicillin(inv: &Inventory<'_>, minimum_stock: i64) -> String {
        let mut new = NewMedication::new(
            "Amoxicillin",
            MedicationCategory::Antibiotics,
            "500mg",
            "Capsule",
            "A-01",
        );
        new.minimum_stock = minimum_stock;
        new.maximum_stock = 1000;
        new.pack_size = 10;
        inv.add_medication(new).unwrap().medication.id
    }

    pub fn restock(inv: &Inventory<'_>, id: &str, lot: &str, packs: i64, expiry_in_days: i64) {
        inv.restock(
            id,
            RestockRequest::new(10, packs, lot, in_days(expiry_in_days)),
        )
        .unwrap();
    }
}
