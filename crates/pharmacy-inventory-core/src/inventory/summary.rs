//! Category and store-wide rollups over derived status.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{Inventory, InventoryResult};
use crate::models::{CategorySummary, InventoryStats, Medication};
use crate::status::{BatchStatus, StatusResolver, StockStatus};

/// Count medications per category and status bucket, sorted by category name.
///
/// Only categories with at least one medication appear.
pub fn summarize_categories(
    medications: &[Medication],
    today: NaiveDate,
    resolver: &StatusResolver,
) -> Vec<CategorySummary> {
    let mut by_name: BTreeMap<&'static str, CategorySummary> = BTreeMap::new();

    for medication in medications {
        let summary = by_name
            .entry(medication.category.as_str())
            .or_insert_with(|| CategorySummary::empty(medication.category));
        summary.total_items += 1;

        match resolver.medication_status(medication, today) {
            StockStatus::LowStock => summary.low_stock_items += 1,
            StockStatus::OutOfStock => summary.out_of_stock_items += 1,
            StockStatus::Expired => summary.expired_items += 1,
            StockStatus::NearExpiry => summary.near_expiry_items += 1,
            StockStatus::InStock => {}
        }
    }

    by_name.into_values().collect()
}

/// Fold every medication and batch into one set of dashboard counts.
pub fn summarize_inventory(
    medications: &[Medication],
    today: NaiveDate,
    resolver: &StatusResolver,
) -> InventoryStats {
    let mut stats = InventoryStats::default();

    for medication in medications {
        stats.total_items += 1;
        match resolver.medication_status(medication, today) {
            StockStatus::InStock => stats.in_stock += 1,
            StockStatus::LowStock => stats.low_stock += 1,
            StockStatus::OutOfStock => stats.out_of_stock += 1,
            StockStatus::NearExpiry => stats.near_expiry += 1,
            StockStatus::Expired => stats.expired += 1,
        }
        if medication.current_stock <= medication.minimum_stock {
            stats.reorder_needed += 1;
        }

        for batch in &medication.batches {
            stats.total_batches += 1;
            if !batch.is_depleted() && resolver.batch_status(batch, today) == BatchStatus::Active {
                stats.active_batches += 1;
            }
        }
    }

    stats
}

impl<'a> Inventory<'a> {
    /// Per-category counts, recomputed from current state on every call.
    pub fn category_summaries(&self) -> InventoryResult<Vec<CategorySummary>> {
        let medications = self.db.list_medications()?;
        Ok(summarize_categories(&medications, self.today(), &self.resolver))
    }

    /// Store-wide counts, recomputed from current state on every call.
    pub fn inventory_stats(&self) -> InventoryResult<InventoryStats> {
        let medications = self.db.list_medications()?;
        Ok(summarize_inventory(&medications, self.today(), &self.resolver))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::{MedicationCategory, NewMedication};

    fn medication(name: &str, category: MedicationCategory, stock: i64, minimum: i64) -> Medication {
        let mut m = NewMedication::new(name, category, "10mg", "Tablet", "A-01").into_medication();
        m.current_stock = stock;
        m.minimum_stock = minimum;
        m
    }

    #[test]
    fn test_summaries_sorted_by_category_name() {
        let meds = vec![
            medication("Salbutamol", MedicationCategory::Respiratory, 100, 10),
            medication("Amoxicillin", MedicationCategory::Antibiotics, 5, 10),
            medication("Ibuprofen", MedicationCategory::Analgesics, 0, 10),
            medication("Cefalexin", MedicationCategory::Antibiotics, 100, 10),
        ];

        let summaries = summarize_categories(&meds, today(), &StatusResolver::default());
        let names: Vec<&str> = summaries.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["Analgesics", "Antibiotics", "Respiratory"]);

        let antibiotics = &summaries[1];
        assert_eq!(antibiotics.total_items, 2);
        assert_eq!(antibiotics.low_stock_items, 1);
        assert_eq!(antibiotics.attention_items(), 1);

        assert_eq!(summaries[0].out_of_stock_items, 1);
        assert_eq!(summaries[2].attention_items(), 0);
    }

    #[test]
    fn test_summaries_follow_current_state() {
        let db = setup_db();
        let inv = inventory(&db);
        let id = add_amoxicillin(&inv, 10);

        let summaries = inv.category_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].out_of_stock_items, 1);

        restock(&inv, &id, "SOON", 5, 7);
        let summaries = inv.category_summaries().unwrap();
        assert_eq!(summaries[0].out_of_stock_items, 0);
        assert_eq!(summaries[0].near_expiry_items, 1);

        restock(&inv, &id, "OLD", 1, -3);
        let summaries = inv.category_summaries().unwrap();
        assert_eq!(summaries[0].expired_items, 1);
        assert_eq!(summaries[0].near_expiry_items, 0);
    }

    #[test]
    fn test_empty_inventory() {
        assert!(summarize_categories(&[], today(), &StatusResolver::default()).is_empty());
        assert_eq!(
            summarize_inventory(&[], today(), &StatusResolver::default()),
            InventoryStats::default()
        );
    }

    #[test]
    fn test_near_expiry_status_hides_reorder() {
        let db = setup_db();
        let inv = inventory(&db);

        // 50 units against a minimum of 100, all expiring within the window
        let id = add_amoxicillin(&inv, 100);
        restock(&inv, &id, "SOON", 5, 10);
        assert_eq!(inv.get_medication(&id).unwrap().status, StockStatus::NearExpiry);

        let stats = inv.inventory_stats().unwrap();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.near_expiry, 1);
        assert_eq!(stats.low_stock, 0);
        assert_eq!(stats.reorder_needed, 1);
        assert_eq!(stats.total_batches, 1);
        assert_eq!(stats.active_batches, 0);
    }

    #[test]
    fn test_inventory_stats_counts_batches() {
        let db = setup_db();
        let inv = inventory(&db);

        let amox = add_amoxicillin(&inv, 10);
        restock(&inv, &amox, "GOOD", 5, 365);
        restock(&inv, &amox, "SMALL", 1, 200);
        restock(&inv, &amox, "OLD", 1, -3);
        inv.dispense(&amox, 10, None, None).unwrap();

        let mut new = NewMedication::new(
            "Ibuprofen",
            MedicationCategory::Analgesics,
            "200mg",
            "Tablet",
            "B-01",
        );
        new.minimum_stock = 20;
        new.maximum_stock = 200;
        inv.add_medication(new).unwrap();

        let stats = inv.inventory_stats().unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.in_stock, 0);
        assert_eq!(stats.reorder_needed, 1);
        // The dispense drained SMALL, leaving GOOD as the only active lot
        assert_eq!(stats.total_batches, 3);
        assert_eq!(stats.active_batches, 1);
    }
}
