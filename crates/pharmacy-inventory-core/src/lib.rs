//! Pharmacy Inventory Core Library
//!
//! Local-first hospital pharmacy stock engine: batch (lot) tracking, FIFO
//! dispensing, derived stock status and a hash-chained transaction ledger.
//!
//! # Architecture
//!
//! ```text
//!      dispense / restock / adjust / write-off
//!                        │
//!              ┌─────────▼─────────┐
//!              │     Inventory     │  validate → plan → apply
//!              └─────────┬─────────┘
//!                        │  one SQLite transaction
//!        ┌───────────────┼────────────────────┐
//!        ▼               ▼                    ▼
//!   medications   medication_batches   stock_transactions
//!                                      (append-only, hash chained)
//!                        │
//!              ┌─────────▼─────────┐
//!              │  Status Resolver  │  derived on every read
//!              └─────────┬─────────┘
//!                        ▼
//!      snapshots · category summaries · stats
//! ```
//!
//! # Core Principle
//!
//! **Stock only moves through the inventory service.** Every movement is all
//! or nothing and leaves exactly one ledger entry.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage for medications, batches and the ledger
//! - [`models`]: Domain types (Medication, Batch, Transaction, snapshots)
//! - [`status`]: Batch and medication status rules
//! - [`inventory`]: Dispense, restock, adjustment and rollup operations
//! - [`ledger`]: Hash chain over stock transactions
//! - [`config`]: Layered configuration
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod db;
pub mod inventory;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod status;

// Re-export commonly used types
pub use crate::config::{InventoryConfig, InventorySettings};
pub use db::Database;
pub use inventory::{Inventory, InventoryError, RestockRequest};
pub use ledger::{Ledger, LedgerVerification};
pub use models::{
    AdjustmentReason, Batch, BatchAllocation, CategorySummary, InventoryStats, Medication,
    MedicationCategory, MedicationSnapshot, MedicationUpdate, NewMedication, SupplierStatus, Transaction,
    TransactionType,
};
pub use status::{BatchStatus, StatusResolver, StockStatus};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PharmacyError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Stock shortfall: {0}")]
    StockShortfall(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Ledger error: {0}")]
    LedgerError(String),
}

impl From<db::DbError> for PharmacyError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => PharmacyError::NotFound(what),
            other => PharmacyError::DatabaseError(other.to_string()),
        }
    }
}

impl From<InventoryError> for PharmacyError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock { .. } => {
                PharmacyError::InsufficientStock(e.to_string())
            }
            InventoryError::EligibleStockShortfall { .. } => {
                PharmacyError::StockShortfall(e.to_string())
            }
            InventoryError::InvalidInput(msg) => PharmacyError::InvalidInput(msg),
            InventoryError::NotFound(what) => PharmacyError::NotFound(what),
            InventoryError::Database(e) => e.into(),
            InventoryError::Ledger(e) => e.into(),
        }
    }
}

impl From<ledger::LedgerError> for PharmacyError {
    fn from(e: ledger::LedgerError) -> Self {
        PharmacyError::LedgerError(e.to_string())
    }
}

impl From<::config::ConfigError> for PharmacyError {
    fn from(e: ::config::ConfigError) -> Self {
        PharmacyError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PharmacyError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PharmacyError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create an inventory database at the given path.
#[uniffi::export]
pub fn open_inventory(path: String) -> Result<Arc<PharmacyInventoryCore>, PharmacyError> {
    let db = Database::open(&path)?;
    Ok(PharmacyInventoryCore::wrap(db, InventorySettings::default()))
}

/// Create an in-memory inventory (for testing).
#[uniffi::export]
pub fn open_inventory_in_memory() -> Result<Arc<PharmacyInventoryCore>, PharmacyError> {
    let db = Database::open_in_memory()?;
    Ok(PharmacyInventoryCore::wrap(db, InventorySettings::default()))
}

/// Open the inventory described by a config file (or `config/inventory` and
/// `PHARMACY__*` environment variables when no path is given).
#[uniffi::export]
pub fn open_inventory_with_config(
    config_path: Option<String>,
) -> Result<Arc<PharmacyInventoryCore>, PharmacyError> {
    let config = match config_path {
        Some(path) => InventoryConfig::load_from(std::path::Path::new(&path))?,
        None => InventoryConfig::load()?,
    };
    logging::init_tracing(&config.logging.filter);

    let db = Database::open(&config.database.path)?;
    tracing::info!(path = %config.database.path, "Inventory opened");
    Ok(PharmacyInventoryCore::wrap(db, config.inventory))
}

/// Install a stderr tracing subscriber. Returns false if one is already set.
#[uniffi::export]
pub fn init_logging(filter: String) -> bool {
    logging::init_tracing(&filter)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe inventory handle for FFI.
///
/// The mutex makes every call a critical section, so mutations are
/// serialized and reads see a consistent medication/batch state.
#[derive(uniffi::Object)]
pub struct PharmacyInventoryCore {
    db: Arc<Mutex<Database>>,
    settings: InventorySettings,
}

impl PharmacyInventoryCore {
    fn wrap(db: Database, settings: InventorySettings) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            settings,
        })
    }

    fn inventory<'d>(&self, db: &'d Database, performed_by: Option<String>) -> Inventory<'d> {
        let inventory = Inventory::with_settings(db, &self.settings);
        match performed_by {
            Some(operator) if !operator.trim().is_empty() => inventory.with_operator(operator),
            _ => inventory,
        }
    }
}

#[uniffi::export]
impl PharmacyInventoryCore {
    // =========================================================================
    // Medication Operations
    // =========================================================================

    /// Register a medication with zero stock.
    pub fn add_medication(
        &self,
        medication: FfiNewMedication,
    ) -> Result<FfiMedication, PharmacyError> {
        let db = self.db.lock()?;
        let new = NewMedication::try_from(medication)?;
        let snapshot = self.inventory(&db, None).add_medication(new)?;
        Ok(snapshot.into())
    }

    /// Edit descriptive fields and thresholds.
    pub fn update_medication(
        &self,
        medication_id: String,
        update: FfiMedicationUpdate,
    ) -> Result<FfiMedication, PharmacyError> {
        let db = self.db.lock()?;
        let update = MedicationUpdate::try_from(update)?;
        let snapshot = self
            .inventory(&db, None)
            .update_medication(&medication_id, update)?;
        Ok(snapshot.into())
    }

    /// Get a medication with derived status.
    pub fn get_medication(&self, medication_id: String) -> Result<FfiMedication, PharmacyError> {
        let db = self.db.lock()?;
        let snapshot = self.inventory(&db, None).get_medication(&medication_id)?;
        Ok(snapshot.into())
    }

    /// All medications ordered by name.
    pub fn list_medications(&self) -> Result<Vec<FfiMedication>, PharmacyError> {
        let db = self.db.lock()?;
        let snapshots = self.inventory(&db, None).list_medications()?;
        Ok(snapshots.into_iter().map(|s| s.into()).collect())
    }

    /// Batches the next dispense would draw from, in order.
    pub fn fifo_order(&self, medication_id: String) -> Result<Vec<FfiBatch>, PharmacyError> {
        let db = self.db.lock()?;
        let inventory = self.inventory(&db, None);
        let today = inventory.today();
        let resolver = *inventory.resolver();
        let batches = inventory.fifo_order(&medication_id)?;
        Ok(batches
            .into_iter()
            .map(|b| FfiBatch::resolve(b, today, &resolver))
            .collect())
    }

    // =========================================================================
    // Stock Movements
    // =========================================================================

    /// Dispense units FIFO across batches.
    pub fn dispense(
        &self,
        medication_id: String,
        quantity: i64,
        patient_id: Option<String>,
        prescription_id: Option<String>,
        performed_by: Option<String>,
    ) -> Result<FfiTransaction, PharmacyError> {
        let db = self.db.lock()?;
        let tx = self.inventory(&db, performed_by).dispense(
            &medication_id,
            quantity,
            patient_id.as_deref(),
            prescription_id.as_deref(),
        )?;
        Ok(tx.into())
    }

    /// Receive a new batch. `expiry_date` is `YYYY-MM-DD`.
    #[allow(clippy::too_many_arguments)]
    pub fn restock(
        &self,
        medication_id: String,
        pack_size: i64,
        packs_received: i64,
        batch_number: String,
        expiry_date: String,
        supplier: Option<String>,
        performed_by: Option<String>,
    ) -> Result<FfiTransaction, PharmacyError> {
        let mut request =
            RestockRequest::new(pack_size, packs_received, batch_number, parse_date(&expiry_date)?);
        request.supplier = supplier;

        let db = self.db.lock()?;
        let tx = self
            .inventory(&db, performed_by)
            .restock(&medication_id, request)?;
        Ok(tx.into())
    }

    /// Apply a signed, unbatched stock correction.
    pub fn adjust(
        &self,
        medication_id: String,
        signed_quantity: i64,
        reason: String,
        performed_by: Option<String>,
    ) -> Result<FfiTransaction, PharmacyError> {
        let reason = AdjustmentReason::parse(&reason).ok_or_else(|| {
            PharmacyError::InvalidInput(format!("Unknown adjustment reason: {}", reason))
        })?;

        let db = self.db.lock()?;
        let tx = self
            .inventory(&db, performed_by)
            .adjust(&medication_id, signed_quantity, reason)?;
        Ok(tx.into())
    }

    /// Drain expired batches; `None` if nothing had expired.
    pub fn write_off_expired(
        &self,
        medication_id: String,
        performed_by: Option<String>,
    ) -> Result<Option<FfiTransaction>, PharmacyError> {
        let db = self.db.lock()?;
        let tx = self
            .inventory(&db, performed_by)
            .write_off_expired(&medication_id)?;
        Ok(tx.map(|t| t.into()))
    }

    /// `current_stock` minus the batch total.
    pub fn stock_drift(&self, medication_id: String) -> Result<i64, PharmacyError> {
        let db = self.db.lock()?;
        Ok(self.inventory(&db, None).stock_drift(&medication_id)?)
    }

    // =========================================================================
    // Ledger & Reporting
    // =========================================================================

    /// Transactions most-recent-first, optionally for one medication.
    pub fn list_transactions(
        &self,
        medication_id: Option<String>,
    ) -> Result<Vec<FfiTransaction>, PharmacyError> {
        let db = self.db.lock()?;
        let txs = self
            .inventory(&db, None)
            .list_transactions(medication_id.as_deref())?;
        Ok(txs.into_iter().map(|t| t.into()).collect())
    }

    /// Transactions of one type (e.g. "dispensed"), most-recent-first.
    pub fn list_transactions_by_type(
        &self,
        transaction_type: String,
    ) -> Result<Vec<FfiTransaction>, PharmacyError> {
        let kind = TransactionType::parse(&transaction_type).ok_or_else(|| {
            PharmacyError::InvalidInput(format!("Unknown transaction type: {}", transaction_type))
        })?;

        let db = self.db.lock()?;
        let txs = self.inventory(&db, None).list_transactions_by_type(kind)?;
        Ok(txs.into_iter().map(|t| t.into()).collect())
    }

    /// Per-category status counts.
    pub fn category_summaries(&self) -> Result<Vec<FfiCategorySummary>, PharmacyError> {
        let db = self.db.lock()?;
        let summaries = self.inventory(&db, None).category_summaries()?;
        Ok(summaries.into_iter().map(|s| s.into()).collect())
    }

    /// Store-wide dashboard counts.
    pub fn inventory_stats(&self) -> Result<FfiInventoryStats, PharmacyError> {
        let db = self.db.lock()?;
        let stats = self.inventory(&db, None).inventory_stats()?;
        Ok(stats.into())
    }

    /// Recompute the ledger hash chain.
    pub fn verify_ledger(&self) -> Result<FfiLedgerVerification, PharmacyError> {
        let db = self.db.lock()?;
        let verification = self.inventory(&db, None).verify_ledger()?;
        Ok(verification.into())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, PharmacyError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| PharmacyError::InvalidInput(format!("Expected YYYY-MM-DD date, got {:?}", s)))
}

fn parse_category(s: &str) -> Result<MedicationCategory, PharmacyError> {
    MedicationCategory::parse(s)
        .ok_or_else(|| PharmacyError::InvalidInput(format!("Unknown category: {}", s)))
}

fn parse_supplier_status(s: &str) -> Result<SupplierStatus, PharmacyError> {
    SupplierStatus::parse(s)
        .ok_or_else(|| PharmacyError::InvalidInput(format!("Unknown supplier status: {}", s)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medication with derived status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub strength: String,
    pub dosage_form: String,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub supplier_status: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub pack_size: i64,
    pub monthly_usage: i64,
    pub location: String,
    pub barcode: Option<String>,
    pub prescription_required: bool,
    pub is_generic: bool,
    pub notes: Option<String>,
    pub last_restocked: Option<String>,
    pub last_dispensed: Option<String>,
    pub status: String,
    pub unallocated_units: i64,
    pub batches: Vec<FfiBatch>,
}

impl From<MedicationSnapshot> for FfiMedication {
    fn from(snapshot: MedicationSnapshot) -> Self {
        let m = snapshot.medication;
        Self {
            id: m.id,
            name: m.name,
            generic_name: m.generic_name,
            category: m.category.as_str().to_string(),
            strength: m.strength,
            dosage_form: m.dosage_form,
            manufacturer: m.manufacturer,
            supplier: m.supplier,
            supplier_status: m.supplier_status.as_str().to_string(),
            current_stock: m.current_stock,
            minimum_stock: m.minimum_stock,
            maximum_stock: m.maximum_stock,
            pack_size: m.pack_size,
            monthly_usage: m.monthly_usage,
            location: m.location,
            barcode: m.barcode,
            prescription_required: m.prescription_required,
            is_generic: m.is_generic,
            notes: m.notes,
            last_restocked: m.last_restocked,
            last_dispensed: m.last_dispensed,
            status: snapshot.status.as_str().to_string(),
            unallocated_units: snapshot.unallocated_units,
            batches: snapshot
                .batches
                .into_iter()
                .map(|b| FfiBatch::from_parts(b.batch, b.status, b.days_until_expiry, b.dispensable))
                .collect(),
        }
    }
}

/// FFI-safe batch. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatch {
    pub id: String,
    pub batch_number: String,
    pub expiry_date: String,
    pub total_units: i64,
    pub remaining_units: i64,
    pub pack_size: i64,
    pub packs_received: i64,
    pub sealed_packs: i64,
    pub opened_packs: i64,
    pub date_received: String,
    pub supplier: Option<String>,
    pub status: String,
    pub days_until_expiry: i64,
    pub dispensable: bool,
}

impl FfiBatch {
    fn resolve(batch: Batch, today: NaiveDate, resolver: &StatusResolver) -> Self {
        let status = resolver.batch_status(&batch, today);
        let days = status::days_until_expiry(batch.expiry_date, today);
        let dispensable = resolver.is_dispensable(&batch, today);
        Self::from_parts(batch, status, days, dispensable)
    }

    fn from_parts(batch: Batch, status: BatchStatus, days_until_expiry: i64, dispensable: bool) -> Self {
        Self {
            id: batch.id,
            batch_number: batch.batch_number,
            expiry_date: batch.expiry_date.format("%Y-%m-%d").to_string(),
            total_units: batch.total_units,
            remaining_units: batch.remaining_units,
            pack_size: batch.pack_size,
            packs_received: batch.packs_received,
            sealed_packs: batch.sealed_packs,
            opened_packs: batch.opened_packs,
            date_received: batch.date_received.format("%Y-%m-%d").to_string(),
            supplier: batch.supplier,
            status: status.as_str().to_string(),
            days_until_expiry,
            dispensable,
        }
    }
}

/// FFI-safe input for registering a medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedication {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub strength: String,
    pub dosage_form: String,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub supplier_status: Option<String>,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub pack_size: i64,
    pub monthly_usage: i64,
    pub location: String,
    pub barcode: Option<String>,
    pub prescription_required: bool,
    pub is_generic: bool,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewMedication> for NewMedication {
    type Error = PharmacyError;

    fn try_from(m: FfiNewMedication) -> Result<Self, Self::Error> {
        let supplier_status = match m.supplier_status.as_deref() {
            Some(s) => parse_supplier_status(s)?,
            None => SupplierStatus::default(),
        };
        Ok(NewMedication {
            name: m.name,
            generic_name: m.generic_name,
            category: parse_category(&m.category)?,
            strength: m.strength,
            dosage_form: m.dosage_form,
            manufacturer: m.manufacturer,
            supplier: m.supplier,
            supplier_status,
            minimum_stock: m.minimum_stock,
            maximum_stock: m.maximum_stock,
            pack_size: m.pack_size,
            monthly_usage: m.monthly_usage,
            location: m.location,
            barcode: m.barcode,
            prescription_required: m.prescription_required,
            is_generic: m.is_generic,
            notes: m.notes,
        })
    }
}

/// FFI-safe partial medication edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiMedicationUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub supplier_status: Option<String>,
    pub minimum_stock: Option<i64>,
    pub maximum_stock: Option<i64>,
    pub pack_size: Option<i64>,
    pub monthly_usage: Option<i64>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub prescription_required: Option<bool>,
    pub is_generic: Option<bool>,
    pub notes: Option<String>,
}

impl TryFrom<FfiMedicationUpdate> for MedicationUpdate {
    type Error = PharmacyError;

    fn try_from(u: FfiMedicationUpdate) -> Result<Self, Self::Error> {
        Ok(MedicationUpdate {
            name: u.name,
            generic_name: u.generic_name,
            category: u.category.as_deref().map(parse_category).transpose()?,
            strength: u.strength,
            dosage_form: u.dosage_form,
            manufacturer: u.manufacturer,
            supplier: u.supplier,
            supplier_status: u
                .supplier_status
                .as_deref()
                .map(parse_supplier_status)
                .transpose()?,
            minimum_stock: u.minimum_stock,
            maximum_stock: u.maximum_stock,
            pack_size: u.pack_size,
            monthly_usage: u.monthly_usage,
            location: u.location,
            barcode: u.barcode,
            prescription_required: u.prescription_required,
            is_generic: u.is_generic,
            notes: u.notes,
        })
    }
}

/// FFI-safe batch consumption entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatchAllocation {
    pub batch_id: String,
    pub batch_number: String,
    pub quantity: i64,
}

impl From<BatchAllocation> for FfiBatchAllocation {
    fn from(a: BatchAllocation) -> Self {
        Self {
            batch_id: a.batch_id,
            batch_number: a.batch_number,
            quantity: a.quantity,
        }
    }
}

/// FFI-safe ledger transaction.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransaction {
    pub id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub transaction_type: String,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub timestamp: String,
    pub performed_by: String,
    pub patient_id: Option<String>,
    pub prescription_id: Option<String>,
    pub reason: Option<String>,
    pub batch_number: Option<String>,
    pub batches_affected: Vec<FfiBatchAllocation>,
}

impl From<Transaction> for FfiTransaction {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            medication_id: tx.medication_id,
            medication_name: tx.medication_name,
            transaction_type: tx.transaction_type.label().to_string(),
            quantity: tx.quantity,
            previous_stock: tx.previous_stock,
            new_stock: tx.new_stock,
            timestamp: tx.timestamp,
            performed_by: tx.performed_by,
            patient_id: tx.patient_id,
            prescription_id: tx.prescription_id,
            reason: tx.reason,
            batch_number: tx.batch_number,
            batches_affected: tx.batches_affected.into_iter().map(|a| a.into()).collect(),
        }
    }
}

/// FFI-safe category rollup.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategorySummary {
    pub category: String,
    pub total_items: u32,
    pub low_stock_items: u32,
    pub out_of_stock_items: u32,
    pub expired_items: u32,
    pub near_expiry_items: u32,
    pub attention_items: u32,
}

impl From<CategorySummary> for FfiCategorySummary {
    fn from(s: CategorySummary) -> Self {
        Self {
            attention_items: s.attention_items(),
            category: s.category.as_str().to_string(),
            total_items: s.total_items,
            low_stock_items: s.low_stock_items,
            out_of_stock_items: s.out_of_stock_items,
            expired_items: s.expired_items,
            near_expiry_items: s.near_expiry_items,
        }
    }
}

/// FFI-safe store-wide counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInventoryStats {
    pub total_items: u32,
    pub in_stock: u32,
    pub low_stock: u32,
    pub out_of_stock: u32,
    pub near_expiry: u32,
    pub expired: u32,
    pub reorder_needed: u32,
    pub total_batches: u32,
    pub active_batches: u32,
}

impl From<InventoryStats> for FfiInventoryStats {
    fn from(s: InventoryStats) -> Self {
        Self {
            total_items: s.total_items,
            in_stock: s.in_stock,
            low_stock: s.low_stock,
            out_of_stock: s.out_of_stock,
            near_expiry: s.near_expiry,
            expired: s.expired,
            reorder_needed: s.reorder_needed,
            total_batches: s.total_batches,
            active_batches: s.active_batches,
        }
    }
}

/// FFI-safe ledger verification result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLedgerVerification {
    pub entries: u32,
    pub head_hash: Option<String>,
}

impl From<LedgerVerification> for FfiLedgerVerification {
    fn from(v: LedgerVerification) -> Self {
        Self {
            entries: v.entries,
            head_hash: v.head_hash,
        }
    }
}
