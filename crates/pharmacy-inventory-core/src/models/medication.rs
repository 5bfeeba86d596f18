//! Medication models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::batch::Batch;

/// Therapeutic category used for grouping and rollups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MedicationCategory {
    Antibiotics,
    Analgesics,
    Cardiovascular,
    Diabetes,
    Respiratory,
    Vitamins,
    Gastrointestinal,
    Dermatology,
    Neurology,
    Other,
}

impl MedicationCategory {
    pub const ALL: [MedicationCategory; 10] = [
        MedicationCategory::Antibiotics,
        MedicationCategory::Analgesics,
        MedicationCategory::Cardiovascular,
        MedicationCategory::Diabetes,
        MedicationCategory::Respiratory,
        MedicationCategory::Vitamins,
        MedicationCategory::Gastrointestinal,
        MedicationCategory::Dermatology,
        MedicationCategory::Neurology,
        MedicationCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationCategory::Antibiotics => "Antibiotics",
            MedicationCategory::Analgesics => "Analgesics",
            MedicationCategory::Cardiovascular => "Cardiovascular",
            MedicationCategory::Diabetes => "Diabetes",
            MedicationCategory::Respiratory => "Respiratory",
            MedicationCategory::Vitamins => "Vitamins",
            MedicationCategory::Gastrointestinal => "Gastrointestinal",
            MedicationCategory::Dermatology => "Dermatology",
            MedicationCategory::Neurology => "Neurology",
            MedicationCategory::Other => "Other",
        }
    }

    /// Parse a category label (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for MedicationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standing of the medication's usual supplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
    Pending,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::Active => "Active",
            SupplierStatus::Inactive => "Inactive",
            SupplierStatus::Pending => "Pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(SupplierStatus::Active),
            "inactive" => Some(SupplierStatus::Inactive),
            "pending" => Some(SupplierStatus::Pending),
            _ => None,
        }
    }
}

/// A drug/strength/form combination tracked as inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Unique medication ID
    pub id: String,
    /// Brand or display name
    pub name: String,
    /// Generic (INN) name
    pub generic_name: Option<String>,
    pub category: MedicationCategory,
    /// Strength (e.g., "500mg")
    pub strength: String,
    /// Dosage form (e.g., "Capsule")
    pub dosage_form: String,
    pub manufacturer: Option<String>,
    /// Usual supplier
    pub supplier: Option<String>,
    pub supplier_status: SupplierStatus,
    /// Units on hand; equals the sum of batch remainders unless adjusted
    pub current_stock: i64,
    /// Reorder threshold
    pub minimum_stock: i64,
    /// Shelf capacity
    pub maximum_stock: i64,
    /// Standard units per pack
    pub pack_size: i64,
    /// Informational monthly consumption
    pub monthly_usage: i64,
    /// Storage location (shelf/bin)
    pub location: String,
    pub barcode: Option<String>,
    pub prescription_required: bool,
    pub is_generic: bool,
    pub notes: Option<String>,
    /// Timestamp of the last restock
    pub last_restocked: Option<String>,
    /// Timestamp of the last dispense
    pub last_dispensed: Option<String>,
    /// Owned batches in receipt order
    pub batches: Vec<Batch>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Medication {
    /// Create a medication with no stock and no batches.
    pub fn new(
        name: String,
        category: MedicationCategory,
        strength: String,
        dosage_form: String,
        location: String,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            generic_name: None,
            category,
            strength,
            dosage_form,
            manufacturer: None,
            supplier: None,
            supplier_status: SupplierStatus::Active,
            current_stock: 0,
            minimum_stock: 0,
            maximum_stock: 0,
            pack_size: 1,
            monthly_usage: 0,
            location,
            barcode: None,
            prescription_required: false,
            is_generic: false,
            notes: None,
            last_restocked: None,
            last_dispensed: None,
            batches: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Name snapshot recorded on transactions (e.g., "Amoxicillin 500mg").
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.strength)
    }

    /// Sum of remaining units across all batches.
    pub fn batch_units(&self) -> i64 {
        self.batches.iter().map(|b| b.remaining_units.max(0)).sum()
    }

    /// Units of aggregate stock not backed by any batch.
    ///
    /// Zero unless an adjustment moved `current_stock` away from the batches;
    /// negative when batches hold more than the recorded stock.
    pub fn unallocated_units(&self) -> i64 {
        self.current_stock - self.batch_units()
    }

    pub fn batch(&self, batch_id: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == batch_id)
    }

    pub fn batch_mut(&mut self, batch_id: &str) -> Option<&mut Batch> {
        self.batches.iter_mut().find(|b| b.id == batch_id)
    }

    /// Whether any batch already uses this lot code.
    pub fn has_batch_number(&self, batch_number: &str) -> bool {
        self.batches.iter().any(|b| b.batch_number == batch_number)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for registering a new medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: MedicationCategory,
    pub strength: String,
    pub dosage_form: String,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub supplier_status: SupplierStatus,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub pack_size: i64,
    pub monthly_usage: i64,
    pub location: String,
    pub barcode: Option<String>,
    pub prescription_required: bool,
    pub is_generic: bool,
    pub notes: Option<String>,
}

impl NewMedication {
    /// Create a registration request with required fields and neutral defaults.
    pub fn new(
        name: impl Into<String>,
        category: MedicationCategory,
        strength: impl Into<String>,
        dosage_form: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            generic_name: None,
            category,
            strength: strength.into(),
            dosage_form: dosage_form.into(),
            manufacturer: None,
            supplier: None,
            supplier_status: SupplierStatus::Active,
            minimum_stock: 0,
            maximum_stock: 0,
            pack_size: 1,
            monthly_usage: 0,
            location: location.into(),
            barcode: None,
            prescription_required: false,
            is_generic: false,
            notes: None,
        }
    }

    /// Build the medication record this request describes.
    pub fn into_medication(self) -> Medication {
        let mut medication = Medication::new(
            self.name,
            self.category,
            self.strength,
            self.dosage_form,
            self.location,
        );
        medication.generic_name = self.generic_name;
        medication.manufacturer = self.manufacturer;
        medication.supplier = self.supplier;
        medication.supplier_status = self.supplier_status;
        medication.minimum_stock = self.minimum_stock;
        medication.maximum_stock = self.maximum_stock;
        medication.pack_size = self.pack_size;
        medication.monthly_usage = self.monthly_usage;
        medication.barcode = self.barcode;
        medication.prescription_required = self.prescription_required;
        medication.is_generic = self.is_generic;
        medication.notes = self.notes;
        medication
    }
}

/// Partial edit of a medication's descriptive fields and thresholds.
///
/// Stock and batches are deliberately absent: they only move through
/// dispense, restock, adjustment and write-off.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicationUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub category: Option<MedicationCategory>,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub supplier_status: Option<SupplierStatus>,
    pub minimum_stock: Option<i64>,
    pub maximum_stock: Option<i64>,
    pub pack_size: Option<i64>,
    pub monthly_usage: Option<i64>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub prescription_required: Option<bool>,
    pub is_generic: Option<bool>,
    pub notes: Option<String>,
}

impl MedicationUpdate {
    /// Apply the present fields onto a medication.
    pub fn apply_to(self, medication: &mut Medication) {
        if let Some(name) = self.name {
            medication.name = name;
        }
        if let Some(generic_name) = self.generic_name {
            medication.generic_name = Some(generic_name);
        }
        if let Some(category) = self.category {
            medication.category = category;
        }
        if let Some(strength) = self.strength {
            medication.strength = strength;
        }
        if let Some(dosage_form) = self.dosage_form {
            medication.dosage_form = dosage_form;
        }
        if let Some(manufacturer) = self.manufacturer {
            medication.manufacturer = Some(manufacturer);
        }
        if let Some(supplier) = self.supplier {
            medication.supplier = Some(supplier);
        }
        if let Some(supplier_status) = self.supplier_status {
            medication.supplier_status = supplier_status;
        }
        if let Some(minimum_stock) = self.minimum_stock {
            medication.minimum_stock = minimum_stock;
        }
        if let Some(maximum_stock) = self.maximum_stock {
            medication.maximum_stock = maximum_stock;
        }
        if let Some(pack_size) = self.pack_size {
            medication.pack_size = pack_size;
        }
        if let Some(monthly_usage) = self.monthly_usage {
            medication.monthly_usage = monthly_usage;
        }
        if let Some(location) = self.location {
            medication.location = location;
        }
        if let Some(barcode) = self.barcode {
            medication.barcode = Some(barcode);
        }
        if let Some(prescription_required) = self.prescription_required {
            medication.prescription_required = prescription_required;
        }
        if let Some(is_generic) = self.is_generic {
            medication.is_generic = is_generic;
        }
        if let Some(notes) = self.notes {
            medication.notes = Some(notes);
        }
    }
}
