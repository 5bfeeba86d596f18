//! Medication database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Medication, MedicationCategory, SupplierStatus};

const MEDICATION_COLUMNS: &str = r#"
    id, name, generic_name, category, strength, dosage_form, manufacturer,
    supplier, supplier_status, current_stock, minimum_stock, maximum_stock,
    pack_size, monthly_usage, location, barcode, prescription_required,
    is_generic, notes, last_restocked, last_dispensed, created_at, updated_at
"#;

impl Database {
    /// Insert a new medication (batches are inserted separately).
    pub fn insert_medication(&self, medication: &Medication) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medications (
                id, name, generic_name, category, strength, dosage_form, manufacturer,
                supplier, supplier_status, current_stock, minimum_stock, maximum_stock,
                pack_size, monthly_usage, location, barcode, prescription_required,
                is_generic, notes, last_restocked, last_dispensed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
            "#,
            params![
                medication.id,
                medication.name,
                medication.generic_name,
                medication.category.as_str(),
                medication.strength,
                medication.dosage_form,
                medication.manufacturer,
                medication.supplier,
                medication.supplier_status.as_str(),
                medication.current_stock,
                medication.minimum_stock,
                medication.maximum_stock,
                medication.pack_size,
                medication.monthly_usage,
                medication.location,
                medication.barcode,
                medication.prescription_required,
                medication.is_generic,
                medication.notes,
                medication.last_restocked,
                medication.last_dispensed,
                medication.created_at,
                medication.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Write back every mutable column of a medication.
    pub fn update_medication(&self, medication: &Medication) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medications SET
                name = ?2,
                generic_name = ?3,
                category = ?4,
                strength = ?5,
                dosage_form = ?6,
                manufacturer = ?7,
                supplier = ?8,
                supplier_status = ?9,
                current_stock = ?10,
                minimum_stock = ?11,
                maximum_stock = ?12,
                pack_size = ?13,
                monthly_usage = ?14,
                location = ?15,
                barcode = ?16,
                prescription_required = ?17,
                is_generic = ?18,
                notes = ?19,
                last_restocked = ?20,
                last_dispensed = ?21,
                updated_at = ?22
            WHERE id = ?1
            "#,
            params![
                medication.id,
                medication.name,
                medication.generic_name,
                medication.category.as_str(),
                medication.strength,
                medication.dosage_form,
                medication.manufacturer,
                medication.supplier,
                medication.supplier_status.as_str(),
                medication.current_stock,
                medication.minimum_stock,
                medication.maximum_stock,
                medication.pack_size,
                medication.monthly_usage,
                medication.location,
                medication.barcode,
                medication.prescription_required,
                medication.is_generic,
                medication.notes,
                medication.last_restocked,
                medication.last_dispensed,
                medication.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a medication by ID, with its batches in receipt order.
    pub fn get_medication(&self, id: &str) -> DbResult<Option<Medication>> {
        let sql = format!("SELECT {} FROM medications WHERE id = ?", MEDICATION_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], MedicationRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let mut medication: Medication = row.try_into()?;
                medication.batches = self.list_batches(&medication.id)?;
                Ok(Some(medication))
            }
            None => Ok(None),
        }
    }

    /// List all medications ordered by name, each with its batches.
    pub fn list_medications(&self) -> DbResult<Vec<Medication>> {
        let sql = format!("SELECT {} FROM medications ORDER BY name, strength, id", MEDICATION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], MedicationRow::from_row)?;

        let mut medications = Vec::new();
        for row in rows {
            let mut medication: Medication = row?.try_into()?;
            medication.batches = self.list_batches(&medication.id)?;
            medications.push(medication);
        }
        Ok(medications)
    }

    /// Check if a medication exists.
    pub fn medication_exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM medications WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Intermediate row struct for database mapping.
struct MedicationRow {
    id: String,
    name: String,
    generic_name: Option<String>,
    category: String,
    strength: String,
    dosage_form: String,
    manufacturer: Option<String>,
    supplier: Option<String>,
    supplier_status: String,
    current_stock: i64,
    minimum_stock: i64,
    maximum_stock: i64,
    pack_size: i64,
    monthly_usage: i64,
    location: String,
    barcode: Option<String>,
    prescription_required: bool,
    is_generic: bool,
    notes: Option<String>,
    last_restocked: Option<String>,
    last_dispensed: Option<String>,
    created_at: String,
    updated_at: String,
}

impl MedicationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            generic_name: row.get(2)?,
            category: row.get(3)?,
            strength: row.get(4)?,
            dosage_form: row.get(5)?,
            manufacturer: row.get(6)?,
            supplier: row.get(7)?,
            supplier_status: row.get(8)?,
            current_stock: row.get(9)?,
            minimum_stock: row.get(10)?,
            maximum_stock: row.get(11)?,
            pack_size: row.get(12)?,
            monthly_usage: row.get(13)?,
            location: row.get(14)?,
            barcode: row.get(15)?,
            prescription_required: row.get(16)?,
            is_generic: row.get(17)?,
            notes: row.get(18)?,
            last_restocked: row.get(19)?,
            last_dispensed: row.get(20)?,
            created_at: row.get(21)?,
            updated_at: row.get(22)?,
        })
    }
}

impl TryFrom<MedicationRow> for Medication {
    type Error = DbError;

    fn try_from(row: MedicationRow) -> Result<Self, Self::Error> {
        let category = MedicationCategory::parse(&row.category)
            .ok_or_else(|| DbError::Constraint(format!("Unknown category: {}", row.category)))?;
        let supplier_status = SupplierStatus::parse(&row.supplier_status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown supplier status: {}", row.supplier_status))
        })?;

        Ok(Medication {
            id: row.id,
            name: row.name,
            generic_name: row.generic_name,
            category,
            strength: row.strength,
            dosage_form: row.dosage_form,
            manufacturer: row.manufacturer,
            supplier: row.supplier,
            supplier_status,
            current_stock: row.current_stock,
            minimum_stock: row.minimum_stock,
            maximum_stock: row.maximum_stock,
            pack_size: row.pack_size,
            monthly_usage: row.monthly_usage,
            location: row.location,
            barcode: row.barcode,
            prescription_required: row.prescription_required,
            is_generic: row.is_generic,
            notes: row.notes,
            last_restocked: row.last_restocked,
            last_dispensed: row.last_dispensed,
            batches: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
