//! Property tests for the inventory engine.
//!
//! Random restock/dispense sequences against an in-memory store:
//! - stock always equals the sum of batch remainders
//! - FIFO never skips an earlier-expiring batch
//! - pack bookkeeping only ever opens packs

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use pharmacy_inventory_core::db::Database;
use pharmacy_inventory_core::inventory::{Inventory, InventoryError, RestockRequest};
use pharmacy_inventory_core::models::{Medication, MedicationCategory, NewMedication};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Restock {
        pack_size: i64,
        packs: i64,
        expiry_in_days: i64,
    },
    Dispense(i64),
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=12, 1i64..=6, 0i64..=120).prop_map(|(pack_size, packs, expiry_in_days)| {
            Op::Restock {
                pack_size,
                packs,
                expiry_in_days,
            }
        }),
        (1i64..=80).prop_map(Op::Dispense),
    ]
}

fn setup(db: &Database) -> (Inventory<'_>, String) {
    let inv = Inventory::new(db).as_of(today());
    let id = inv
        .add_medication(NewMedication::new(
            "Amoxicillin",
            MedicationCategory::Antibiotics,
            "250mg",
            "Capsule",
            "A-01",
        ))
        .unwrap()
        .medication
        .id;
    (inv, id)
}

fn load(inv: &Inventory<'_>, id: &str) -> Medication {
    inv.get_medication(id).unwrap().medication
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Stock equals the sum of batch remainders after every restock/dispense.
    #[test]
    fn prop_stock_matches_batches(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let db = Database::open_in_memory().unwrap();
        let (inv, id) = setup(&db);

        for (n, op) in ops.iter().enumerate() {
            match op {
                Op::Restock { pack_size, packs, expiry_in_days } => {
                    let request = RestockRequest::new(
                        *pack_size,
                        *packs,
                        format!("LOT-{}", n),
                        today() + Duration::days(*expiry_in_days),
                    );
                    inv.restock(&id, request).unwrap();
                }
                Op::Dispense(quantity) => {
                    let before = load(&inv, &id);
                    match inv.dispense(&id, *quantity, None, None) {
                        Ok(tx) => prop_assert_eq!(tx.allocated_units(), *quantity),
                        Err(InventoryError::InsufficientStock { requested, available }) => {
                            prop_assert_eq!(requested, *quantity);
                            prop_assert!(available < *quantity);
                            prop_assert_eq!(&load(&inv, &id), &before);
                        }
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
            }

            let medication = load(&inv, &id);
            prop_assert_eq!(medication.current_stock, medication.batch_units());
            prop_assert!(medication.current_stock >= 0);
        }
    }

    /// A consumed batch never has an earlier-expiring batch left with stock.
    #[test]
    fn prop_fifo_order(
        lots in prop::collection::vec((1i64..=5, 0i64..=60), 1..8),
        quantities in prop::collection::vec(1i64..=40, 1..10),
    ) {
        let db = Database::open_in_memory().unwrap();
        let (inv, id) = setup(&db);

        for (n, (packs, expiry_in_days)) in lots.iter().enumerate() {
            let request = RestockRequest::new(
                10,
                *packs,
                format!("LOT-{}", n),
                today() + Duration::days(*expiry_in_days),
            );
            inv.restock(&id, request).unwrap();
        }

        for quantity in quantities {
            let Ok(tx) = inv.dispense(&id, quantity, None, None) else {
                continue;
            };
            let after = load(&inv, &id);

            for allocation in &tx.batches_affected {
                let consumed = after.batch(&allocation.batch_id).unwrap();
                for other in &after.batches {
                    if other.expiry_date < consumed.expiry_date {
                        prop_assert_eq!(
                            other.remaining_units,
                            0,
                            "batch {} consumed while earlier batch {} still held stock",
                            consumed.batch_number,
                            other.batch_number
                        );
                    }
                }
            }
        }
    }

    /// Sealed packs never exceed the remainder and never increase.
    #[test]
    fn prop_pack_bookkeeping(
        pack_size in 1i64..=24,
        packs in 1i64..=10,
        quantities in prop::collection::vec(1i64..=30, 1..15),
    ) {
        let db = Database::open_in_memory().unwrap();
        let (inv, id) = setup(&db);
        inv.restock(&id, RestockRequest::new(pack_size, packs, "LOT", today() + Duration::days(365)))
            .unwrap();

        let mut sealed_before: HashMap<String, i64> = load(&inv, &id)
            .batches
            .iter()
            .map(|b| (b.id.clone(), b.sealed_packs))
            .collect();

        for quantity in quantities {
            let _ = inv.dispense(&id, quantity, None, None);

            for batch in &load(&inv, &id).batches {
                prop_assert!(batch.sealed_packs * batch.pack_size <= batch.remaining_units);
                prop_assert_eq!(batch.sealed_packs + batch.opened_packs, batch.packs_received);
                prop_assert!(batch.sealed_packs <= sealed_before[&batch.id]);
                sealed_before.insert(batch.id.clone(), batch.sealed_packs);
            }
        }
    }
}
