use calamine::{Data, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::barcode;
use crate::notice::Notices;
use crate::record::{COLUMNS, Record, Table};

/// Worksheet that holds the records
pub const SHEET_NAME: &str = "records";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Read(#[from] calamine::XlsxError),
    #[error("{0}")]
    Write(#[from] XlsxError),
    #[error("no worksheet found in {0}")]
    NoWorksheet(PathBuf),
}

impl From<tempfile::PersistError> for StoreError {
    fn from(e: tempfile::PersistError) -> Self {
        StoreError::Io(e.error)
    }
}

/// The spreadsheet file that backs the barcode table
///
/// Every call reads or rewrites the whole table.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the table, creating and persisting an empty one when the file
    /// is missing or unreadable
    ///
    /// # Arguments
    /// * `notices` - Receives the load outcome and any save outcome
    ///
    /// # Returns
    /// * `Table` - The loaded table, or a fresh empty table
    pub fn load(&self, notices: &mut Notices) -> Table {
        if self.exists() {
            match self.read() {
                Ok(table) => {
                    log::info!(
                        "loaded {} records from {}",
                        table.len(),
                        self.path.display()
                    );
                    notices.success("Barcode database loaded.");
                    return table;
                }
                Err(e) => {
                    log::error!("failed to read {}: {}", self.path.display(), e);
                    notices.error(format!("Failed to load the barcode database: {}", e));
                }
            }
        }

        log::info!("creating new barcode database at {}", self.path.display());
        notices.info("Barcode database not found or unreadable. Creating a new one.");
        let table = Table::new();
        self.save(&table, notices);
        table
    }

    /// Persist the table, reporting the outcome
    ///
    /// A failed save leaves the in-memory table untouched.
    pub fn save(&self, table: &Table, notices: &mut Notices) -> bool {
        match self.write(table) {
            Ok(()) => {
                log::info!("saved {} records to {}", table.len(), self.path.display());
                notices.success("Barcode database saved.");
                true
            }
            Err(e) => {
                log::error!("failed to write {}: {}", self.path.display(), e);
                notices.error(format!("Failed to save the barcode database: {}", e));
                false
            }
        }
    }

    /// Read every record from the first worksheet
    pub fn read(&self) -> Result<Table, StoreError> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| StoreError::NoWorksheet(self.path.clone()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut records = Vec::new();
        // First row is the header; columns are positional
        for row in range.rows().skip(1) {
            let cells: Vec<String> = (0..COLUMNS.len())
                .map(|c| row.get(c).map(cell_to_string).unwrap_or_default())
                .collect();

            if cells[0].is_empty() {
                continue;
            }

            let record = Record::from_row(cells);
            if !barcode::is_well_formed(&record.barcode) {
                log::warn!(
                    "record with unexpected barcode {:?} in {}",
                    record.barcode,
                    self.path.display()
                );
            }
            records.push(record);
        }

        Ok(Table::from_records(records))
    }

    /// Replace the backing file with the full table
    ///
    /// The workbook is written next to the target and renamed over it.
    pub fn write(&self, table: &Table) -> Result<(), StoreError> {
        let buffer = to_xlsx(table)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&buffer)?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;

        Ok(())
    }
}

/// Encode the table as an XLSX workbook in memory
///
/// Every cell is a string; the barcode column also carries the text number
/// format so spreadsheet programs never turn it into a number.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let text = Format::new().set_num_format("@");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_column_width(0, 16)?;
    worksheet.set_column_width(5, 20)?;
    worksheet.set_column_width(6, 20)?;

    for (c, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *title, &header)?;
    }

    for (r, record) in table.records().iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, value) in record.to_row().iter().enumerate() {
            if c == 0 {
                worksheet.write_string_with_format(row, 0, *value, &text)?;
            } else {
                worksheet.write_string(row, c as u16, *value)?;
            }
        }
    }

    workbook.save_to_buffer()
}

/// Render a cell as text, keeping numeric barcodes free of exponent or `.0`
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
