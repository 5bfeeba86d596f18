//! Stock transaction ledger database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{BatchAllocation, Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str = r#"
    seq, id, medication_id, medication_name, transaction_type, quantity,
    previous_stock, new_stock, timestamp, performed_by, patient_id,
    prescription_id, reason, batch_number, batches_affected, prev_hash, entry_hash
"#;

/// A stored transaction with its ledger position and chain hashes.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub seq: i64,
    pub transaction: Transaction,
    pub prev_hash: String,
    pub entry_hash: String,
}

/// Latest entry of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerHead {
    pub seq: i64,
    pub entry_hash: String,
}

impl Database {
    /// Append a transaction to the ledger, returning its sequence number.
    pub fn append_transaction(
        &self,
        transaction: &Transaction,
        prev_hash: &str,
        entry_hash: &str,
    ) -> DbResult<i64> {
        let batches_json = serde_json::to_string(&transaction.batches_affected)?;

        self.conn.execute(
            r#"
            INSERT INTO stock_transactions (
                id, medication_id, medication_name, transaction_type, quantity,
                previous_stock, new_stock, timestamp, performed_by, patient_id,
                prescription_id, reason, batch_number, batches_affected, prev_hash, entry_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                transaction.id,
                transaction.medication_id,
                transaction.medication_name,
                transaction.transaction_type.as_str(),
                transaction.quantity,
                transaction.previous_stock,
                transaction.new_stock,
                transaction.timestamp,
                transaction.performed_by,
                transaction.patient_id,
                transaction.prescription_id,
                transaction.reason,
                transaction.batch_number,
                batches_json,
                prev_hash,
                entry_hash,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get the most recent ledger entry's position and hash.
    pub fn ledger_head(&self) -> DbResult<Option<LedgerHead>> {
        self.conn
            .query_row(
                "SELECT seq, entry_hash FROM stock_transactions ORDER BY seq DESC LIMIT 1",
                [],
                |row| {
                    Ok(LedgerHead {
                        seq: row.get(0)?,
                        entry_hash: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List transactions most-recent-first, optionally for one medication.
    pub fn list_transactions(&self, medication_id: Option<&str>) -> DbResult<Vec<Transaction>> {
        let entries = match medication_id {
            Some(id) => self.query_entries(
                &format!(
                    "SELECT {} FROM stock_transactions WHERE medication_id = ? ORDER BY seq DESC",
                    TRANSACTION_COLUMNS
                ),
                params![id],
            )?,
            None => self.query_entries(
                &format!(
                    "SELECT {} FROM stock_transactions ORDER BY seq DESC",
                    TRANSACTION_COLUMNS
                ),
                params![],
            )?,
        };
        Ok(entries.into_iter().map(|e| e.transaction).collect())
    }

    /// List transactions of one type, most-recent-first.
    pub fn list_transactions_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> DbResult<Vec<Transaction>> {
        let entries = self.query_entries(
            &format!(
                "SELECT {} FROM stock_transactions WHERE transaction_type = ? ORDER BY seq DESC",
                TRANSACTION_COLUMNS
            ),
            params![transaction_type.as_str()],
        )?;
        Ok(entries.into_iter().map(|e| e.transaction).collect())
    }

    /// All ledger entries in append order (for chain verification).
    pub fn list_ledger_entries(&self) -> DbResult<Vec<LedgerEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM stock_transactions ORDER BY seq ASC",
                TRANSACTION_COLUMNS
            ),
            params![],
        )
    }

    fn query_entries(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, TransactionRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

/// Intermediate row struct for database mapping.
struct TransactionRow {
    seq: i64,
    id: String,
    medication_id: String,
    medication_name: String,
    transaction_type: String,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    timestamp: String,
    performed_by: String,
    patient_id: Option<String>,
    prescription_id: Option<String>,
    reason: Option<String>,
    batch_number: Option<String>,
    batches_affected: String,
    prev_hash: String,
    entry_hash: String,
}

impl TransactionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            medication_id: row.get(2)?,
            medication_name: row.get(3)?,
            transaction_type: row.get(4)?,
            quantity: row.get(5)?,
            previous_stock: row.get(6)?,
            new_stock: row.get(7)?,
            timestamp: row.get(8)?,
            performed_by: row.get(9)?,
            patient_id: row.get(10)?,
            prescription_id: row.get(11)?,
            reason: row.get(12)?,
            batch_number: row.get(13)?,
            batches_affected: row.get(14)?,
            prev_hash: row.get(15)?,
            entry_hash: row.get(16)?,
        })
    }

    fn into_entry(self) -> DbResult<LedgerEntry> {
        let transaction_type = TransactionType::parse(&self.transaction_type).ok_or_else(|| {
            DbError::Constraint(format!("Unknown transaction type: {}", self.transaction_type))
        })?;
        let batches_affected: Vec<BatchAllocation> = serde_json::from_str(&self.batches_affected)?;

        Ok(LedgerEntry {
            seq: self.seq,
            transaction: Transaction {
                id: self.id,
                medication_id: self.medication_id,
                medication_name: self.medication_name,
                transaction_type,
                quantity: self.quantity,
                previous_stock: self.previous_stock,
                new_stock: self.new_stock,
                timestamp: self.timestamp,
                performed_by: self.performed_by,
                patient_id: self.patient_id,
                prescription_id: self.prescription_id,
                reason: self.reason,
                batch_number: self.batch_number,
                batches_affected,
            },
            prev_hash: self.prev_hash,
            entry_hash: self.entry_hash,
        })
    }
}
