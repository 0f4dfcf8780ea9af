use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Column titles of the backing file, in storage order
pub const COLUMNS: [&str; 7] = [
    "barcode",
    "part_code",
    "name",
    "color",
    "size",
    "created_at",
    "updated_at",
];

/// Timestamp layout used for `created_at` and `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One product row of the barcode table
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Record {
    pub barcode: String,
    pub part_code: String,
    pub name: String,
    pub color: String,
    pub size: String,
    pub created_at: String,
    pub updated_at: String,
}

/// User-supplied product fields for issue and edit forms
///
/// On edit an empty field means "keep the current value".
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RecordFields {
    pub part_code: String,
    pub name: String,
    pub color: String,
    pub size: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("barcode {0} is already issued")]
    DuplicateBarcode(String),
    #[error("barcode {0} does not exist")]
    NotFound(String),
}

impl Record {
    pub fn create(barcode: String, fields: RecordFields, timestamp: &str) -> Self {
        Record {
            barcode,
            part_code: fields.part_code,
            name: fields.name,
            color: fields.color,
            size: fields.size,
            created_at: timestamp.to_string(),
            updated_at: timestamp.to_string(),
        }
    }

    /// Overwrite every field whose replacement is non-empty and stamp the update
    pub fn apply(&mut self, changes: RecordFields, timestamp: &str) {
        fn keep_or_replace(current: &mut String, replacement: String) {
            if !replacement.is_empty() {
                *current = replacement;
            }
        }

        keep_or_replace(&mut self.part_code, changes.part_code);
        keep_or_replace(&mut self.name, changes.name);
        keep_or_replace(&mut self.color, changes.color);
        keep_or_replace(&mut self.size, changes.size);
        self.updated_at = timestamp.to_string();
    }

    /// Field values in [`COLUMNS`] order
    pub fn to_row(&self) -> [&str; 7] {
        [
            &self.barcode,
            &self.part_code,
            &self.name,
            &self.color,
            &self.size,
            &self.created_at,
            &self.updated_at,
        ]
    }

    /// Build a record from cells in [`COLUMNS`] order; missing trailing cells are empty
    pub fn from_row(cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();

        Record {
            barcode: next(),
            part_code: next(),
            name: next(),
            color: next(),
            size: next(),
            created_at: next(),
            updated_at: next(),
        }
    }
}

/// The whole barcode table held in memory for a session
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Table { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, barcode: &str) -> bool {
        self.records.iter().any(|r| r.barcode == barcode)
    }

    pub fn get(&self, barcode: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.barcode == barcode)
    }

    pub fn barcodes(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.barcode.as_str()).collect()
    }

    /// Append a new record; the barcode must not already be in the table
    pub fn issue(
        &mut self,
        barcode: String,
        fields: RecordFields,
        timestamp: &str,
    ) -> Result<&Record, TableError> {
        if self.contains(&barcode) {
            return Err(TableError::DuplicateBarcode(barcode));
        }

        self.records.push(Record::create(barcode, fields, timestamp));
        Ok(&self.records[self.records.len() - 1])
    }

    /// Update the first record carrying `barcode`
    pub fn edit(
        &mut self,
        barcode: &str,
        changes: RecordFields,
        timestamp: &str,
    ) -> Result<&Record, TableError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.barcode == barcode)
            .ok_or_else(|| TableError::NotFound(barcode.to_string()))?;

        record.apply(changes, timestamp);
        Ok(record)
    }

    /// Remove every record carrying `barcode`, returning how many went
    pub fn delete(&mut self, barcode: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.barcode != barcode);
        before - self.records.len()
    }
}
