//! Stock transaction ledger models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::medication::Medication;

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionType {
    /// FIFO dispense to a patient
    Dispensed,
    /// New batch received
    Restocked,
    /// Unbatched correction
    Adjusted,
    /// Expired batches written off
    Expired,
    /// Stock returned
    Returned,
}

impl TransactionType {
    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Dispensed => "dispensed",
            TransactionType::Restocked => "restocked",
            TransactionType::Adjusted => "adjusted",
            TransactionType::Expired => "expired",
            TransactionType::Returned => "returned",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Dispensed => "Dispensed",
            TransactionType::Restocked => "Restocked",
            TransactionType::Adjusted => "Adjusted",
            TransactionType::Expired => "Expired",
            TransactionType::Returned => "Returned",
        }
    }

    /// Parse either the storage key or the label.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dispensed" => Some(TransactionType::Dispensed),
            "restocked" => Some(TransactionType::Restocked),
            "adjusted" => Some(TransactionType::Adjusted),
            "expired" => Some(TransactionType::Expired),
            "returned" => Some(TransactionType::Returned),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reason taxonomy for manual stock adjustments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdjustmentReason {
    Damaged,
    Expired,
    Lost,
    Returned,
    InventoryCount,
    Transfer,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Damaged => "Damaged",
            AdjustmentReason::Expired => "Expired",
            AdjustmentReason::Lost => "Lost",
            AdjustmentReason::Returned => "Returned",
            AdjustmentReason::InventoryCount => "Inventory Count",
            AdjustmentReason::Transfer => "Transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damaged" => Some(AdjustmentReason::Damaged),
            "expired" => Some(AdjustmentReason::Expired),
            "lost" => Some(AdjustmentReason::Lost),
            "returned" => Some(AdjustmentReason::Returned),
            "inventory count" | "inventory_count" => Some(AdjustmentReason::InventoryCount),
            "transfer" => Some(AdjustmentReason::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units drawn from (or written off) one batch by a single movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchAllocation {
    pub batch_id: String,
    /// Lot code, denormalized for audit display
    pub batch_number: String,
    /// Units taken from the batch (always positive)
    pub quantity: i64,
}

/// Immutable record of one inventory movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: String,
    pub medication_id: String,
    /// Name and strength at the time of the movement
    pub medication_name: String,
    pub transaction_type: TransactionType,
    /// Signed quantity: negative for removals, positive for additions
    pub quantity: i64,
    /// Aggregate stock before the movement
    pub previous_stock: i64,
    /// Aggregate stock after the movement
    pub new_stock: i64,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub performed_by: String,
    pub patient_id: Option<String>,
    pub prescription_id: Option<String>,
    pub reason: Option<String>,
    pub batch_number: Option<String>,
    /// Per-batch breakdown, in consumption order
    pub batches_affected: Vec<BatchAllocation>,
}

impl Transaction {
    /// Start a transaction for a medication, snapshotting its name.
    pub fn new(
        medication: &Medication,
        transaction_type: TransactionType,
        quantity: i64,
        previous_stock: i64,
        new_stock: i64,
        performed_by: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id: medication.id.clone(),
            medication_name: medication.display_name(),
            transaction_type,
            quantity,
            previous_stock,
            new_stock,
            timestamp: chrono::Utc::now().to_rfc3339(),
            performed_by: performed_by.to_string(),
            patient_id: None,
            prescription_id: None,
            reason: None,
            batch_number: None,
            batches_affected: Vec::new(),
        }
    }

    /// Serialize for hashing. Field order is fixed by the struct definition.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Total units named in `batches_affected`.
    pub fn allocated_units(&self) -> i64 {
        self.batches_affected.iter().map(|a| a.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationCategory, NewMedication};

    #[test]
    fn test_transaction_snapshots_name() {
        let med = NewMedication::new(
            "Paracetamol",
            MedicationCategory::Analgesics,
            "500mg",
            "Tablet",
            "B-01",
        )
        .into_medication();

        let tx = Transaction::new(&med, TransactionType::Dispensed, -30, 100, 70, "pharmacist");
        assert_eq!(tx.medication_name, "Paracetamol 500mg");
        assert_eq!(tx.medication_id, med.id);
        assert!(tx.batches_affected.is_empty());
    }

    #[test]
    fn test_type_round_trip() {
        for t in [
            TransactionType::Dispensed,
            TransactionType::Restocked,
            TransactionType::Adjusted,
            TransactionType::Expired,
            TransactionType::Returned,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), Some(t));
            assert_eq!(TransactionType::parse(t.label()), Some(t));
        }
    }

    #[test]
    fn test_adjustment_reason_parse() {
        assert_eq!(
            AdjustmentReason::parse("Inventory Count"),
            Some(AdjustmentReason::InventoryCount)
        );
        assert_eq!(AdjustmentReason::parse("lost"), Some(AdjustmentReason::Lost));
        assert_eq!(AdjustmentReason::parse(""), None);
        assert_eq!(AdjustmentReason::parse("stolen"), None);
    }
}
