//! Medication batch (received lot) model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One received lot of a medication.
///
/// Created only by a restock and never deleted; dispensing drains
/// `remaining_units` towards zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    /// Unique batch ID
    pub id: String,
    /// Owning medication ID
    pub medication_id: String,
    /// Lot code printed on the packaging
    pub batch_number: String,
    /// Expiry date (no time component)
    pub expiry_date: NaiveDate,
    /// Units received (`pack_size * packs_received`)
    pub total_units: i64,
    /// Units still on the shelf
    pub remaining_units: i64,
    /// Units per pack
    pub pack_size: i64,
    /// Packs received in this lot
    pub packs_received: i64,
    /// Packs never broken into
    pub sealed_packs: i64,
    /// Packs broken into (partially or fully consumed)
    pub opened_packs: i64,
    /// Date the lot was received
    pub date_received: NaiveDate,
    /// Supplier of this lot
    pub supplier: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
}

impl Batch {
    /// Create a freshly received lot with every pack sealed.
    pub fn receive(
        medication_id: String,
        batch_number: String,
        expiry_date: NaiveDate,
        pack_size: i64,
        packs_received: i64,
        date_received: NaiveDate,
    ) -> Self {
        let total_units = pack_size * packs_received;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id,
            batch_number,
            expiry_date,
            total_units,
            remaining_units: total_units,
            pack_size,
            packs_received,
            sealed_packs: packs_received,
            opened_packs: 0,
            date_received,
            supplier: None,
            notes: None,
        }
    }

    /// Whether the lot has been drained.
    pub fn is_depleted(&self) -> bool {
        self.remaining_units <= 0
    }

    /// Number of complete packs' worth of units left.
    pub fn full_packs(&self) -> i64 {
        self.remaining_units / self.pack_size
    }

    /// Take up to `wanted` units from the lot, returning how many were taken.
    ///
    /// Sealed packs are opened as the remaining count crosses pack
    /// boundaries downward.
    pub fn take(&mut self, wanted: i64) -> i64 {
        let taken = wanted.clamp(0, self.remaining_units);
        self.remaining_units -= taken;
        self.rebalance_packs();
        taken
    }

    /// Drain everything left in the lot.
    pub fn drain(&mut self) -> i64 {
        self.take(self.remaining_units)
    }

    fn rebalance_packs(&mut self) {
        let sealed = self.sealed_packs.min(self.full_packs());
        self.opened_packs += self.sealed_packs - sealed;
        self.sealed_packs = sealed;
    }
}
