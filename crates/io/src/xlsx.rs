// Spreadsheet table loading (xlsx, xlsm, xls, xlsb, ods)
//
// One-way: the first (or named) worksheet becomes a string-or-null table.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use stockback_recon::{Table, TableKind};

/// Read one worksheet into a table, skipping `skip_rows` leading rows.
pub fn read_table(
    path: &Path,
    kind: TableKind,
    sheet: Option<&str>,
    skip_rows: usize,
) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open spreadsheet {}: {}", path.display(), e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| format!("{}: no sheet named '{name}'", path.display()))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| format!("{}: spreadsheet contains no sheets", path.display()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut records: Vec<Vec<Option<String>>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut record = vec![None; start_col as usize];
        record.extend(row.iter().map(cell_text));
        records.push(record);
    }

    log::debug!(
        "{}: read {} rows from sheet '{}'",
        kind,
        records.len(),
        sheet_name
    );
    Ok(Table::from_records(kind, records, skip_rows))
}

/// Cell as table text. Integral floats lose their `.0`; dates become `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Float(n) => Some(if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", *n as i64)
        } else {
            format!("{}", n)
        }),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            Some(match serial_to_date(serial) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => format!("{}", serial),
            })
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Excel 1900-system serial to a calendar date; the time fraction is dropped.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serial 60 is the phantom 1900-02-29; counting from 1899-12-30 is exact
    // for every serial after it.
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}
