//! Restock: every receipt becomes a new batch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{require_text, Inventory, InventoryError, InventoryResult};
use crate::models::{Batch, Transaction, TransactionType};
use crate::status::BatchStatus;

/// A received delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestockRequest {
    pub pack_size: i64,
    pub packs_received: i64,
    /// Lot code printed on the packaging
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

impl RestockRequest {
    pub fn new(
        pack_size: i64,
        packs_received: i64,
        batch_number: impl Into<String>,
        expiry_date: NaiveDate,
    ) -> Self {
        Self {
            pack_size,
            packs_received,
            batch_number: batch_number.into(),
            expiry_date,
            supplier: None,
            notes: None,
        }
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    fn total_units(&self) -> InventoryResult<i64> {
        self.pack_size
            .checked_mul(self.packs_received)
            .ok_or_else(|| InventoryError::InvalidInput("restock quantity overflows".into()))
    }
}

impl<'a> Inventory<'a> {
    /// Receive a new batch and increase stock by its full unit count.
    pub fn restock(
        &self,
        medication_id: &str,
        request: RestockRequest,
    ) -> InventoryResult<Transaction> {
        if request.pack_size <= 0 {
            return Err(InventoryError::InvalidInput("pack size must be positive".into()));
        }
        if request.packs_received <= 0 {
            return Err(InventoryError::InvalidInput(
                "packs received must be positive".into(),
            ));
        }
        require_text("batch number", &request.batch_number)?;
        let total_units = request.total_units()?;

        self.atomically(|| {
            let mut medication = self.load(medication_id)?;
            let previous_stock = medication.current_stock;
            let new_stock = previous_stock.checked_add(total_units).ok_or_else(|| {
                InventoryError::InvalidInput("resulting stock overflows".into())
            })?;

            let batch_number = request.batch_number.trim().to_string();
            if medication.has_batch_number(&batch_number) {
                warn!(
                    medication_id,
                    batch_number = %batch_number,
                    "Batch number already received; recording as a separate lot"
                );
            }

            let today = self.today();
            let mut batch = Batch::receive(
                medication.id.clone(),
                batch_number.clone(),
                request.expiry_date,
                request.pack_size,
                request.packs_received,
                today,
            );
            batch.supplier = request.supplier.clone();
            batch.notes = request.notes.clone();

            if self.resolver.batch_status(&batch, today) == BatchStatus::Expired {
                warn!(
                    medication_id,
                    batch_number = %batch_number,
                    expiry_date = %request.expiry_date,
                    "Received batch is already expired"
                );
            }

            self.db.insert_batch(&batch)?;
            medication.batches.push(batch);
            medication.current_stock = new_stock;
            medication.last_restocked = Some(chrono::Utc::now().to_rfc3339());
            medication.touch();

            let mut transaction = Transaction::new(
                &medication,
                TransactionType::Restocked,
                total_units,
                previous_stock,
                new_stock,
                &self.operator,
            );
            transaction.reason = Some(format!("Added new batch: {}", batch_number));
            transaction.batch_number = Some(batch_number);

            self.record(&medication, &transaction)?;

            info!(
                medication_id,
                quantity = total_units,
                new_stock,
                "Restocked"
            );
            Ok(transaction)
        })
    }
}
