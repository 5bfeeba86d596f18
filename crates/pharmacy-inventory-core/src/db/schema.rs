//! SQLite schema definition.

/// Complete database schema for the pharmacy inventory store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Medications
-- ============================================================================

CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    generic_name TEXT,
    category TEXT NOT NULL,
    strength TEXT NOT NULL,
    dosage_form TEXT NOT NULL,
    manufacturer TEXT,
    supplier TEXT,
    supplier_status TEXT NOT NULL DEFAULT 'Active',
    current_stock INTEGER NOT NULL DEFAULT 0,
    minimum_stock INTEGER NOT NULL DEFAULT 0,
    maximum_stock INTEGER NOT NULL DEFAULT 0,
    pack_size INTEGER NOT NULL DEFAULT 1,
    monthly_usage INTEGER NOT NULL DEFAULT 0,
    location TEXT NOT NULL,
    barcode TEXT,
    prescription_required INTEGER NOT NULL DEFAULT 0,
    is_generic INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    last_restocked TEXT,
    last_dispensed TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (current_stock >= 0),
    CHECK (pack_size > 0)
);

CREATE INDEX IF NOT EXISTS idx_medications_category ON medications(category);
CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name);

-- ============================================================================
-- Batches (Append-Only - drained, never deleted)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medication_batches (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,      -- receipt order, FIFO tie-break
    id TEXT NOT NULL UNIQUE,
    medication_id TEXT NOT NULL REFERENCES medications(id),
    batch_number TEXT NOT NULL,
    expiry_date TEXT NOT NULL,                   -- YYYY-MM-DD
    total_units INTEGER NOT NULL,
    remaining_units INTEGER NOT NULL,
    pack_size INTEGER NOT NULL,
    packs_received INTEGER NOT NULL,
    sealed_packs INTEGER NOT NULL,
    opened_packs INTEGER NOT NULL,
    date_received TEXT NOT NULL,                 -- YYYY-MM-DD
    supplier TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (pack_size > 0),
    CHECK (packs_received > 0),
    CHECK (total_units = pack_size * packs_received),
    CHECK (remaining_units >= 0 AND remaining_units <= total_units),
    CHECK (sealed_packs >= 0 AND opened_packs >= 0),
    CHECK (sealed_packs + opened_packs = packs_received),
    CHECK (sealed_packs * pack_size <= remaining_units)
);

CREATE INDEX IF NOT EXISTS idx_batches_medication ON medication_batches(medication_id, seq);
CREATE INDEX IF NOT EXISTS idx_batches_expiry ON medication_batches(expiry_date);

CREATE TRIGGER IF NOT EXISTS medication_batches_no_delete BEFORE DELETE ON medication_batches
BEGIN
    SELECT RAISE(ABORT, 'Batches are append-only');
END;

CREATE TRIGGER IF NOT EXISTS medication_batches_no_refill BEFORE UPDATE OF remaining_units ON medication_batches
WHEN new.remaining_units > old.remaining_units
BEGIN
    SELECT RAISE(ABORT, 'Batch remaining units cannot increase');
END;

-- ============================================================================
-- Stock Transactions (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS stock_transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,      -- ledger order
    id TEXT NOT NULL UNIQUE,
    medication_id TEXT NOT NULL REFERENCES medications(id),
    medication_name TEXT NOT NULL,
    transaction_type TEXT NOT NULL CHECK (
        transaction_type IN ('dispensed', 'restocked', 'adjusted', 'expired', 'returned')
    ),
    quantity INTEGER NOT NULL,
    previous_stock INTEGER NOT NULL,
    new_stock INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    performed_by TEXT NOT NULL,
    patient_id TEXT,
    prescription_id TEXT,
    reason TEXT,
    batch_number TEXT,
    batches_affected TEXT NOT NULL DEFAULT '[]', -- JSON array of BatchAllocation
    prev_hash TEXT NOT NULL,                     -- '' for the first entry
    entry_hash TEXT NOT NULL UNIQUE              -- SHA-256 of prev_hash || payload
);

CREATE INDEX IF NOT EXISTS idx_transactions_medication ON stock_transactions(medication_id, seq);
CREATE INDEX IF NOT EXISTS idx_transactions_type ON stock_transactions(transaction_type);

CREATE TRIGGER IF NOT EXISTS stock_transactions_no_update BEFORE UPDATE ON stock_transactions
BEGIN
    SELECT RAISE(ABORT, 'Stock transactions are immutable');
END;

CREATE TRIGGER IF NOT EXISTS stock_transactions_no_delete BEFORE DELETE ON stock_transactions
BEGIN
    SELECT RAISE(ABORT, 'Stock transactions are immutable');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO medications (id, name, category, strength, dosage_form, location)
             VALUES ('MED001', 'Amoxicillin', 'Antibiotics', '500mg', 'Capsule', 'A-01')",
            [],
        )
        .unwrap();
        conn
    }

    fn insert_batch(conn: &Connection, id: &str, remaining: i64, sealed: i64, opened: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO medication_batches (
                id, medication_id, batch_number, expiry_date, total_units, remaining_units,
                pack_size, packs_received, sealed_packs, opened_packs, date_received
            ) VALUES (?1, 'MED001', 'LOT1', '2030-01-01', 100, ?2, 10, 10, ?3, ?4, '2025-01-01')",
            rusqlite::params![id, remaining, sealed, opened],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_batch_pack_constraints() {
        let conn = setup();

        // Sealed + opened must equal packs received
        assert!(insert_batch(&conn, "B1", 100, 9, 0).is_err());

        // Sealed packs cannot exceed remaining units
        assert!(insert_batch(&conn, "B2", 50, 10, 0).is_err());

        // Valid fresh batch
        assert!(insert_batch(&conn, "B3", 100, 10, 0).is_ok());
    }

    #[test]
    fn test_batches_cannot_be_deleted_or_refilled() {
        let conn = setup();
        insert_batch(&conn, "B1", 95, 9, 1).unwrap();

        let result = conn.execute("DELETE FROM medication_batches WHERE id = 'B1'", []);
        assert!(result.is_err());

        let result = conn.execute(
            "UPDATE medication_batches SET remaining_units = 100, sealed_packs = 10, opened_packs = 0 WHERE id = 'B1'",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "UPDATE medication_batches SET remaining_units = 80, sealed_packs = 8, opened_packs = 2 WHERE id = 'B1'",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_transactions_are_immutable() {
        let conn = setup();
        conn.execute(
            "INSERT INTO stock_transactions (
                id, medication_id, medication_name, transaction_type, quantity,
                previous_stock, new_stock, timestamp, performed_by, prev_hash, entry_hash
            ) VALUES ('TX1', 'MED001', 'Amoxicillin 500mg', 'adjusted', -5, 10, 5,
                      '2025-01-01T00:00:00Z', 'tester', '', 'abc')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE stock_transactions SET quantity = 0 WHERE id = 'TX1'", [])
            .is_err());
        assert!(conn
            .execute("DELETE FROM stock_transactions WHERE id = 'TX1'", [])
            .is_err());
    }

    #[test]
    fn test_unknown_transaction_type_rejected() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO stock_transactions (
                id, medication_id, medication_name, transaction_type, quantity,
                previous_stock, new_stock, timestamp, performed_by, prev_hash, entry_hash
            ) VALUES ('TX1', 'MED001', 'Amoxicillin 500mg', 'stolen', -5, 10, 5,
                      '2025-01-01T00:00:00Z', 'tester', '', 'abc')",
            [],
        );
        assert!(result.is_err());
    }
}
