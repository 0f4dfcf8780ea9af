use std::error::Error;

use crate::record::{COLUMNS, Table};

/// Convert the barcode table to CSV format
///
/// The first line carries the column titles; quoting of commas, quotes and
/// newlines is left to the `csv` writer.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - CSV content as bytes or an error
///
/// # Examples
/// ```
/// use barcode_desk::downloader::to_csv;
/// use barcode_desk::record::Table;
///
/// let csv = to_csv(&Table::new()).unwrap();
/// assert!(csv.starts_with(b"barcode,part_code"));
/// ```
pub fn to_csv(table: &Table) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for record in table.records() {
        writer.write_record(record.to_row())?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// Convert the barcode table to XLSX format
///
/// Produces the same workbook layout as the backing file.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, Box<dyn Error>> {
    Ok(crate::store::to_xlsx(table)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordFields};

    #[test]
    fn csv_quotes_awkward_values() {
        let fields = RecordFields {
            part_code: "P-1".to_string(),
            name: "Shirt, long".to_string(),
            color: "\"Navy\"".to_string(),
            size: "XL".to_string(),
        };
        let table = Table::from_records(vec![Record::create(
            "8806198700042".to_string(),
            fields,
            "2024-01-01 12:00:00",
        )]);

        let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("barcode,part_code,name,color,size,created_at,updated_at")
        );
        assert_eq!(
            lines.next(),
            Some(
                "8806198700042,P-1,\"Shirt, long\",\"\"\"Navy\"\"\",XL,2024-01-01 12:00:00,2024-01-01 12:00:00"
            )
        );
        assert_eq!(lines.next(), None);
    }
}
