//! Batch database operations.

use rusqlite::{params, Row};

use super::{date_from_sql, date_to_sql, Database, DbError, DbResult};
use crate::models::Batch;

const BATCH_COLUMNS: &str = r#"
    id, medication_id, batch_number, expiry_date, total_units, remaining_units,
    pack_size, packs_received, sealed_packs, opened_packs, date_received,
    supplier, notes
"#;

impl Database {
    /// Append a newly received batch.
    pub fn insert_batch(&self, batch: &Batch) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medication_batches (
                id, medication_id, batch_number, expiry_date, total_units, remaining_units,
                pack_size, packs_received, sealed_packs, opened_packs, date_received,
                supplier, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                batch.id,
                batch.medication_id,
                batch.batch_number,
                date_to_sql(batch.expiry_date),
                batch.total_units,
                batch.remaining_units,
                batch.pack_size,
                batch.packs_received,
                batch.sealed_packs,
                batch.opened_packs,
                date_to_sql(batch.date_received),
                batch.supplier,
                batch.notes,
            ],
        )?;
        Ok(())
    }

    /// Persist a batch's remaining units and pack counts after consumption.
    pub fn update_batch_units(&self, batch: &Batch) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medication_batches SET
                remaining_units = ?2,
                sealed_packs = ?3,
                opened_packs = ?4
            WHERE id = ?1
            "#,
            params![
                batch.id,
                batch.remaining_units,
                batch.sealed_packs,
                batch.opened_packs,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("batch {}", batch.id)));
        }
        Ok(())
    }

    /// List a medication's batches in receipt order.
    pub fn list_batches(&self, medication_id: &str) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {} FROM medication_batches WHERE medication_id = ? ORDER BY seq",
            BATCH_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([medication_id], BatchRow::from_row)?;

        let mut batches = Vec::new();
        for row in rows {
            batches.push(row?.try_into()?);
        }
        Ok(batches)
    }
}

/// Intermediate row struct for database mapping.
struct BatchRow {
    id: String,
    medication_id: String,
    batch_number: String,
    expiry_date: String,
    total_units: i64,
    remaining_units: i64,
    pack_size: i64,
    packs_received: i64,
    sealed_packs: i64,
    opened_packs: i64,
    date_received: String,
    supplier: Option<String>,
    notes: Option<String>,
}

impl BatchRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            batch_number: row.get(2)?,
            expiry_date: row.get(3)?,
            total_units: row.get(4)?,
            remaining_units: row.get(5)?,
            pack_size: row.get(6)?,
            packs_received: row.get(7)?,
            sealed_packs: row.get(8)?,
            opened_packs: row.get(9)?,
            date_received: row.get(10)?,
            supplier: row.get(11)?,
            notes: row.get(12)?,
        })
    }
}

impl TryFrom<BatchRow> for Batch {
    type Error = DbError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(Batch {
            id: row.id,
            medication_id: row.medication_id,
            batch_number: row.batch_number,
            expiry_date: date_from_sql(&row.expiry_date)?,
            total_units: row.total_units,
            remaining_units: row.remaining_units,
            pack_size: row.pack_size,
            packs_received: row.packs_received,
            sealed_packs: row.sealed_packs,
            opened_packs: row.opened_packs,
            date_received: date_from_sql(&row.date_received)?,
            supplier: row.supplier,
            notes: row.notes,
        })
    }
}
