//! Stock status resolution.
//!
//! Status is never stored: it is a pure function of a medication's stock,
//! thresholds and batch expiry dates relative to "today".

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Batch, Medication};

/// Days before expiry at which a batch counts as near expiry.
pub const NEAR_EXPIRY_WINDOW_DAYS: i64 = 30;

/// Lifecycle status of a single batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchStatus {
    Active,
    NearExpiry,
    Expired,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "Active",
            BatchStatus::NearExpiry => "Near Expiry",
            BatchStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status of a medication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    Expired,
    NearExpiry,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Expired => "Expired",
            StockStatus::NearExpiry => "Near Expiry",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole days from `today` until `expiry` (negative once past).
pub fn days_until_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

/// Status of a batch using the standard 30-day window.
pub fn batch_status(batch: &Batch, today: NaiveDate) -> BatchStatus {
    StatusResolver::default().batch_status(batch, today)
}

/// Status of a medication using the standard 30-day window.
pub fn medication_status(medication: &Medication, today: NaiveDate) -> StockStatus {
    StatusResolver::default().medication_status(medication, today)
}

/// Derives batch and medication status for a configurable expiry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusResolver {
    near_expiry_days: i64,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(NEAR_EXPIRY_WINDOW_DAYS)
    }
}

impl StatusResolver {
    pub fn new(near_expiry_days: i64) -> Self {
        Self {
            near_expiry_days: near_expiry_days.max(0),
        }
    }

    /// Expired if past expiry, near expiry within the window (inclusive),
    /// active otherwise.
    pub fn batch_status(&self, batch: &Batch, today: NaiveDate) -> BatchStatus {
        let days = days_until_expiry(batch.expiry_date, today);
        if days < 0 {
            BatchStatus::Expired
        } else if days <= self.near_expiry_days {
            BatchStatus::NearExpiry
        } else {
            BatchStatus::Active
        }
    }

    /// Whether FIFO dispensing may draw from this batch.
    pub fn is_dispensable(&self, batch: &Batch, today: NaiveDate) -> bool {
        !batch.is_depleted() && self.batch_status(batch, today) != BatchStatus::Expired
    }

    /// First match wins: expired stock on hand, out of stock, near-expiry
    /// stock on hand, at or below the minimum, otherwise in stock.
    pub fn medication_status(&self, medication: &Medication, today: NaiveDate) -> StockStatus {
        let holds = |status: BatchStatus| {
            medication
                .batches
                .iter()
                .any(|b| b.remaining_units > 0 && self.batch_status(b, today) == status)
        };

        if holds(BatchStatus::Expired) {
            StockStatus::Expired
        } else if medication.current_stock == 0 {
            StockStatus::OutOfStock
        } else if holds(BatchStatus::NearExpiry) {
            StockStatus::NearExpiry
        } else if medication.current_stock <= medication.minimum_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationCategory, NewMedication};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn batch_expiring_in(days: i64, units_per_pack: i64, packs: i64) -> Batch {
        Batch::receive(
            "MED001".into(),
            format!("LOT{}", days),
            today() + Duration::days(days),
            units_per_pack,
            packs,
            today() - Duration::days(90),
        )
    }

    fn medication_with(batches: Vec<Batch>, minimum_stock: i64) -> Medication {
        let mut med = NewMedication::new(
            "Lisinopril",
            MedicationCategory::Cardiovascular,
            "10mg",
            "Tablet",
            "C-01",
        )
        .into_medication();
        med.minimum_stock = minimum_stock;
        med.current_stock = batches.iter().map(|b| b.remaining_units).sum();
        med.batches = batches;
        med
    }

    #[test]
    fn test_batch_status_boundaries() {
        assert_eq!(batch_status(&batch_expiring_in(-1, 1, 1), today()), BatchStatus::Expired);
        assert_eq!(batch_status(&batch_expiring_in(0, 1, 1), today()), BatchStatus::NearExpiry);
        assert_eq!(batch_status(&batch_expiring_in(30, 1, 1), today()), BatchStatus::NearExpiry);
        assert_eq!(batch_status(&batch_expiring_in(31, 1, 1), today()), BatchStatus::Active);
    }

    #[test]
    fn test_custom_window() {
        let resolver = StatusResolver::new(7);
        assert_eq!(
            resolver.batch_status(&batch_expiring_in(10, 1, 1), today()),
            BatchStatus::Active
        );
        assert_eq!(
            resolver.batch_status(&batch_expiring_in(7, 1, 1), today()),
            BatchStatus::NearExpiry
        );
    }

    #[test]
    fn test_low_stock() {
        let med = medication_with(vec![batch_expiring_in(400, 10, 12)], 200);
        assert_eq!(med.current_stock, 120);
        assert_eq!(medication_status(&med, today()), StockStatus::LowStock);
    }

    #[test]
    fn test_in_stock() {
        let med = medication_with(vec![batch_expiring_in(400, 10, 30)], 200);
        assert_eq!(medication_status(&med, today()), StockStatus::InStock);
    }

    #[test]
    fn test_expired_takes_precedence_over_quantity() {
        let med = medication_with(
            vec![batch_expiring_in(-1, 10, 3), batch_expiring_in(400, 100, 10)],
            50,
        );
        assert!(med.current_stock > med.minimum_stock);
        assert_eq!(medication_status(&med, today()), StockStatus::Expired);
    }

    #[test]
    fn test_drained_expired_batch_is_ignored() {
        let mut expired = batch_expiring_in(-5, 10, 1);
        expired.drain();
        let med = medication_with(vec![expired, batch_expiring_in(400, 10, 30)], 10);
        assert_eq!(medication_status(&med, today()), StockStatus::InStock);
    }

    #[test]
    fn test_out_of_stock_before_near_expiry() {
        let mut med = medication_with(vec![batch_expiring_in(10, 10, 1)], 0);
        // Adjustment drift: batches still hold units but stock reads zero
        med.current_stock = 0;
        assert_eq!(medication_status(&med, today()), StockStatus::OutOfStock);
    }

    #[test]
    fn test_near_expiry_before_low_stock() {
        let med = medication_with(vec![batch_expiring_in(10, 10, 1)], 500);
        assert_eq!(medication_status(&med, today()), StockStatus::NearExpiry);
    }

    #[test]
    fn test_no_batches_is_out_of_stock() {
        let med = medication_with(vec![], 10);
        assert_eq!(medication_status(&med, today()), StockStatus::OutOfStock);
    }
}
