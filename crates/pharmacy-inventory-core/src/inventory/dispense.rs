//! FIFO dispensing.
//!
//! Planning is a pure function over a medication's batches; the service
//! applies the plan only once the whole request is covered.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::{Inventory, InventoryError, InventoryResult};
use crate::models::{Batch, BatchAllocation, Transaction, TransactionType};
use crate::status::StatusResolver;

/// Batches FIFO may draw from, soonest expiry first.
///
/// `batches` must be in insertion order; the stable sort keeps that order
/// for equal expiry dates.
pub fn fifo_candidates<'b>(
    batches: &'b [Batch],
    today: NaiveDate,
    resolver: &StatusResolver,
) -> Vec<&'b Batch> {
    let mut candidates: Vec<&Batch> = batches
        .iter()
        .filter(|b| resolver.is_dispensable(b, today))
        .collect();
    candidates.sort_by_key(|b| b.expiry_date);
    candidates
}

/// Plan which batches cover `quantity` units.
///
/// Returns the eligible total as the error when the dispensable batches
/// cannot cover the request.
pub fn plan_fifo(
    batches: &[Batch],
    quantity: i64,
    today: NaiveDate,
    resolver: &StatusResolver,
) -> Result<Vec<BatchAllocation>, i64> {
    let mut plan = Vec::new();
    let mut remaining = quantity;

    for batch in fifo_candidates(batches, today, resolver) {
        if remaining == 0 {
            break;
        }
        let take = batch.remaining_units.min(remaining);
        plan.push(BatchAllocation {
            batch_id: batch.id.clone(),
            batch_number: batch.batch_number.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    if remaining > 0 {
        let eligible = plan.iter().map(|a| a.quantity).sum();
        return Err(eligible);
    }
    Ok(plan)
}

impl<'a> Inventory<'a> {
    /// Dispense `quantity` units, consuming the soonest-expiring batches first.
    ///
    /// Either the full quantity is dispensed and one `Dispensed` transaction
    /// is recorded, or nothing changes.
    pub fn dispense(
        &self,
        medication_id: &str,
        quantity: i64,
        patient_id: Option<&str>,
        prescription_id: Option<&str>,
    ) -> InventoryResult<Transaction> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidInput(format!(
                "dispense quantity must be positive, got {}",
                quantity
            )));
        }

        self.atomically(|| {
            let mut medication = self.load(medication_id)?;
            let previous_stock = medication.current_stock;

            if quantity > previous_stock {
                warn!(
                    medication_id,
                    requested = quantity,
                    available = previous_stock,
                    "Dispense rejected: insufficient stock"
                );
                return Err(InventoryError::InsufficientStock {
                    requested: quantity,
                    available: previous_stock,
                });
            }

            let today = self.today();
            let plan = plan_fifo(&medication.batches, quantity, today, &self.resolver).map_err(
                |eligible| {
                    warn!(
                        medication_id,
                        requested = quantity,
                        eligible,
                        current_stock = previous_stock,
                        "Dispense rejected: dispensable batches do not cover recorded stock"
                    );
                    InventoryError::EligibleStockShortfall {
                        requested: quantity,
                        eligible,
                        current_stock: previous_stock,
                    }
                },
            )?;

            for allocation in &plan {
                let batch = medication.batch_mut(&allocation.batch_id).ok_or_else(|| {
                    InventoryError::NotFound(format!("batch {}", allocation.batch_id))
                })?;
                batch.take(allocation.quantity);
                self.db.update_batch_units(batch)?;
                debug!(
                    batch_number = %allocation.batch_number,
                    taken = allocation.quantity,
                    left = batch.remaining_units,
                    sealed = batch.sealed_packs,
                    opened = batch.opened_packs,
                    "FIFO allocation"
                );
            }

            medication.current_stock -= quantity;
            let now = chrono::Utc::now().to_rfc3339();
            medication.last_dispensed = Some(now);
            medication.touch();

            let mut transaction = Transaction::new(
                &medication,
                TransactionType::Dispensed,
                -quantity,
                previous_stock,
                medication.current_stock,
                &self.operator,
            );
            transaction.patient_id = patient_id.map(String::from);
            transaction.prescription_id = prescription_id.map(String::from);
            transaction.batches_affected = plan;

            self.record(&medication, &transaction)?;

            info!(
                medication_id,
                quantity,
                new_stock = medication.current_stock,
                batches = transaction.batches_affected.len(),
                "Dispensed"
            );
            Ok(transaction)
        })
    }

    /// Batches the next dispense would draw from, in order.
    pub fn fifo_order(&self, medication_id: &str) -> InventoryResult<Vec<Batch>> {
        let medication = self.load(medication_id)?;
        Ok(fifo_candidates(&medication.batches, self.today(), &self.resolver)
            .into_iter()
            .cloned()
            .collect())
    }
}
