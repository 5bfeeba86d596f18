//! Hash-chained audit trail over the stock transaction ledger.
//!
//! Each entry stores the previous entry's hash and
//! `entry_hash = sha256(prev_hash || canonical_json(transaction))`, so any
//! edit to a stored movement (or a removed/reordered row) breaks the chain.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{Database, DbError, LedgerEntry};
use crate::models::Transaction;

/// Ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger entry {seq} links to {found:?}, expected {expected:?}")]
    BrokenLink {
        seq: i64,
        expected: String,
        found: String,
    },

    #[error("Ledger entry {seq} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        seq: i64,
        stored: String,
        computed: String,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Outcome of a successful chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerVerification {
    /// Number of entries checked
    pub entries: u32,
    /// Hash of the newest entry (`None` for an empty ledger)
    pub head_hash: Option<String>,
}

/// Append-only ledger manager.
pub struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a transaction, chaining it to the current head.
    pub fn append(&self, transaction: &Transaction) -> LedgerResult<LedgerEntry> {
        let prev_hash = self
            .db
            .ledger_head()?
            .map(|head| head.entry_hash)
            .unwrap_or_default();
        let entry_hash = chain_hash(&prev_hash, transaction)?;
        let seq = self
            .db
            .append_transaction(transaction, &prev_hash, &entry_hash)?;

        Ok(LedgerEntry {
            seq,
            transaction: transaction.clone(),
            prev_hash,
            entry_hash,
        })
    }

    /// Recompute the whole chain and report the first inconsistency.
    pub fn verify(&self) -> LedgerResult<LedgerVerification> {
        let entries = self.db.list_ledger_entries()?;
        let mut expected_prev = String::new();

        for entry in &entries {
            if entry.prev_hash != expected_prev {
                return Err(LedgerError::BrokenLink {
                    seq: entry.seq,
                    expected: expected_prev,
                    found: entry.prev_hash.clone(),
                });
            }

            let computed = chain_hash(&entry.prev_hash, &entry.transaction)?;
            if computed != entry.entry_hash {
                return Err(LedgerError::HashMismatch {
                    seq: entry.seq,
                    stored: entry.entry_hash.clone(),
                    computed,
                });
            }

            expected_prev = entry.entry_hash.clone();
        }

        Ok(LedgerVerification {
            entries: entries.len() as u32,
            head_hash: entries.last().map(|e| e.entry_hash.clone()),
        })
    }
}

/// Hash of a transaction chained onto `prev_hash`.
pub fn chain_hash(prev_hash: &str, transaction: &Transaction) -> Result<String, serde_json::Error> {
    let payload = transaction.to_canonical_json()?;
    let mut data = Vec::with_capacity(prev_hash.len() + payload.len());
    data.extend_from_slice(prev_hash.as_bytes());
    data.extend_from_slice(payload.as_bytes());
    Ok(hash_data(&data))
}

/// SHA-256 hash as lowercase hex.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationCategory, NewMedication, TransactionType};

    fn setup() -> (Database, crate::models::Medication) {
        let db = Database::open_in_memory().unwrap();
        let med = NewMedication::new(
            "Metformin",
            MedicationCategory::Diabetes,
            "500mg",
            "Tablet",
            "D-01",
        )
        .into_medication();
        db.insert_medication(&med).unwrap();
        (db, med)
    }

    #[test]
    fn test_hash_data_is_hex_sha256() {
        let hash = hash_data(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_append_chains_entries() {
        let (db, med) = setup();
        let ledger = Ledger::new(&db);

        let first = ledger
            .append(&Transaction::new(&med, TransactionType::Restocked, 100, 0, 100, "a"))
            .unwrap();
        let second = ledger
            .append(&Transaction::new(&med, TransactionType::Dispensed, -10, 100, 90, "a"))
            .unwrap();

        assert_eq!(first.prev_hash, "");
        assert_eq!(second.prev_hash, first.entry_hash);
        assert_ne!(first.entry_hash, second.entry_hash);
    }

    #[test]
    fn test_verify_empty_ledger() {
        let (db, _) = setup();
        let verification = Ledger::new(&db).verify().unwrap();
        assert_eq!(verification.entries, 0);
        assert!(verification.head_hash.is_none());
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (db, med) = setup();
        let ledger = Ledger::new(&db);
        ledger
            .append(&Transaction::new(&med, TransactionType::Restocked, 100, 0, 100, "a"))
            .unwrap();
        let last = ledger
            .append(&Transaction::new(&med, TransactionType::Dispensed, -10, 100, 90, "a"))
            .unwrap();

        let verification = ledger.verify().unwrap();
        assert_eq!(verification.entries, 2);
        assert_eq!(verification.head_hash, Some(last.entry_hash));

        // Bypass the immutability trigger to simulate an out-of-band edit
        db.conn()
            .execute_batch(
                "DROP TRIGGER stock_transactions_no_update;
                 UPDATE stock_transactions SET quantity = -1 WHERE seq = 2;",
            )
            .unwrap();

        assert!(matches!(
            ledger.verify(),
            Err(LedgerError::HashMismatch { seq: 2, .. })
        ));
    }
}
