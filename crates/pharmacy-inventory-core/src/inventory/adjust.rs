//! Unbatched adjustments and expired write-offs.

use tracing::{info, warn};

use super::{Inventory, InventoryError, InventoryResult};
use crate::models::{AdjustmentReason, BatchAllocation, Transaction, TransactionType};
use crate::status::BatchStatus;

impl<'a> Inventory<'a> {
    /// Apply a signed correction to aggregate stock, clamped at zero.
    ///
    /// Batches are left untouched, so stock and batch totals may disagree
    /// afterwards; the difference is reported as unallocated units.
    pub fn adjust(
        &self,
        medication_id: &str,
        signed_quantity: i64,
        reason: AdjustmentReason,
    ) -> InventoryResult<Transaction> {
        if signed_quantity == 0 {
            return Err(InventoryError::InvalidInput(
                "adjustment quantity must not be zero".into(),
            ));
        }

        self.atomically(|| {
            let mut medication = self.load(medication_id)?;
            let previous_stock = medication.current_stock;
            let new_stock = previous_stock
                .checked_add(signed_quantity)
                .ok_or_else(|| InventoryError::InvalidInput("resulting stock overflows".into()))?
                .max(0);

            medication.current_stock = new_stock;
            medication.touch();

            let mut transaction = Transaction::new(
                &medication,
                TransactionType::Adjusted,
                signed_quantity,
                previous_stock,
                new_stock,
                &self.operator,
            );
            transaction.reason = Some(reason.as_str().to_string());

            self.record(&medication, &transaction)?;

            let drift = medication.unallocated_units();
            if drift != 0 {
                warn!(
                    medication_id,
                    drift,
                    current_stock = new_stock,
                    batch_units = medication.batch_units(),
                    "Stock no longer matches batch totals after adjustment"
                );
            }
            info!(
                medication_id,
                quantity = signed_quantity,
                reason = reason.as_str(),
                new_stock,
                "Adjusted"
            );
            Ok(transaction)
        })
    }

    /// Drain every expired batch that still holds units.
    ///
    /// Returns `None` when nothing is expired.
    pub fn write_off_expired(&self, medication_id: &str) -> InventoryResult<Option<Transaction>> {
        self.atomically(|| {
            let mut medication = self.load(medication_id)?;
            let today = self.today();
            let resolver = self.resolver;

            let mut written_off = Vec::new();
            for batch in medication.batches.iter_mut().filter(|b| {
                b.remaining_units > 0 && resolver.batch_status(b, today) == BatchStatus::Expired
            }) {
                let quantity = batch.drain();
                self.db.update_batch_units(batch)?;
                written_off.push(BatchAllocation {
                    batch_id: batch.id.clone(),
                    batch_number: batch.batch_number.clone(),
                    quantity,
                });
            }

            if written_off.is_empty() {
                return Ok(None);
            }

            let total: i64 = written_off.iter().map(|a| a.quantity).sum();
            let previous_stock = medication.current_stock;
            medication.current_stock = previous_stock.saturating_sub(total).max(0);
            medication.touch();

            let mut transaction = Transaction::new(
                &medication,
                TransactionType::Expired,
                -total,
                previous_stock,
                medication.current_stock,
                &self.operator,
            );
            transaction.reason = Some(AdjustmentReason::Expired.as_str().to_string());
            transaction.batches_affected = written_off;

            self.record(&medication, &transaction)?;

            info!(
                medication_id,
                quantity = total,
                batches = transaction.batches_affected.len(),
                new_stock = medication.current_stock,
                "Expired stock written off"
            );
            Ok(Some(transaction))
        })
    }
}
