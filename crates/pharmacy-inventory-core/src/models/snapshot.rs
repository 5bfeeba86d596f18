//! Read-side views with derived status populated.

use chrono::NaiveDate;
use serde::Serialize;

use super::{Batch, Medication};
use crate::status::{days_until_expiry, BatchStatus, StatusResolver, StockStatus};

/// A batch with its status resolved for a given day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchSnapshot {
    pub batch: Batch,
    pub status: BatchStatus,
    pub days_until_expiry: i64,
    /// Eligible for FIFO dispensing (non-expired, units left)
    pub dispensable: bool,
}

/// A medication with its status and batch statuses resolved for a given day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MedicationSnapshot {
    pub medication: Medication,
    pub status: StockStatus,
    pub batches: Vec<BatchSnapshot>,
    /// `current_stock` minus the batch total; non-zero only after adjustments
    pub unallocated_units: i64,
}

impl MedicationSnapshot {
    pub fn resolve(medication: Medication, today: NaiveDate, resolver: &StatusResolver) -> Self {
        let status = resolver.medication_status(&medication, today);
        let batches = medication
            .batches
            .iter()
            .map(|batch| BatchSnapshot {
                batch: batch.clone(),
                status: resolver.batch_status(batch, today),
                days_until_expiry: days_until_expiry(batch.expiry_date, today),
                dispensable: resolver.is_dispensable(batch, today),
            })
            .collect();
        let unallocated_units = medication.unallocated_units();

        Self {
            medication,
            status,
            batches,
            unallocated_units,
        }
    }

    /// Units that FIFO dispensing could actually reach.
    pub fn dispensable_units(&self) -> i64 {
        self.batches
            .iter()
            .filter(|b| b.dispensable)
            .map(|b| b.batch.remaining_units)
            .sum()
    }

    pub fn batch_status(&self, batch_id: &str) -> Option<BatchStatus> {
        self.batches
            .iter()
            .find(|b| b.batch.id == batch_id)
            .map(|b| b.status)
    }
}
