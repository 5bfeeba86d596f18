//! Category rollup model.

use serde::{Deserialize, Serialize};

use super::MedicationCategory;

/// Per-category counts of medications in each status bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: MedicationCategory,
    pub total_items: u32,
    pub low_stock_items: u32,
    pub out_of_stock_items: u32,
    pub expired_items: u32,
    pub near_expiry_items: u32,
}

impl CategorySummary {
    pub fn empty(category: MedicationCategory) -> Self {
        Self {
            category,
            total_items: 0,
            low_stock_items: 0,
            out_of_stock_items: 0,
            expired_items: 0,
            near_expiry_items: 0,
        }
    }

    /// Items needing attention (anything not in stock).
    pub fn attention_items(&self) -> u32 {
        self.low_stock_items + self.out_of_stock_items + self.expired_items + self.near_expiry_items
    }
}

/// Store-wide counts across every medication and batch.
///
/// `reorder_needed` is measured against `minimum_stock` directly, so it also
/// counts items whose status shows as expired or near expiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryStats {
    pub total_items: u32,
    pub in_stock: u32,
    pub low_stock: u32,
    pub out_of_stock: u32,
    pub near_expiry: u32,
    pub expired: u32,
    pub reorder_needed: u32,
    pub total_batches: u32,
    /// Batches with units left and no expiry flag
    pub active_batches: u32,
}
