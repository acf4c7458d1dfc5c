//! Decoded tabular dataset handed to the engine by its collaborators.
//!
//! Cells are string-or-null and column order is preserved. This is the only
//! place in the crate that deals with untyped column bags; every stage after
//! ingestion works on named-field records.

use crate::error::{ReconError, TableKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub kind: TableKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(kind: TableKind, headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { kind, headers, rows }
    }

    /// A table with neither headers nor rows.
    pub fn empty(kind: TableKind) -> Self {
        Self::new(kind, Vec::new(), Vec::new())
    }

    /// Parse already-decoded CSV text.
    ///
    /// `skip_rows` physical lines (blank ones included) are discarded before
    /// the header record.
    /// Empty fields become null; short rows are padded with nulls.
    pub fn from_csv_str(kind: TableKind, text: &str, skip_rows: usize) -> Result<Self, ReconError> {
        Self::from_delimited_str(kind, text, b',', skip_rows)
    }

    /// [`Table::from_csv_str`] with an explicit field delimiter.
    pub fn from_delimited_str(
        kind: TableKind,
        text: &str,
        delimiter: u8,
        skip_rows: usize,
    ) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(skip_lines(text, skip_rows).as_bytes());

        let mut records = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| ReconError::TableParse { table: kind, detail: e.to_string() })?;
            records.push(
                record
                    .iter()
                    .map(|f| if f.is_empty() { None } else { Some(f.to_string()) })
                    .collect(),
            );
        }
        Ok(Self::from_records(kind, records, 0))
    }

    /// Build a table from raw records (rows of cells, `None` for empty).
    ///
    /// The first `skip_rows` records are discarded; the first non-blank record
    /// after them is the header. Blank records carry no data and are dropped.
    pub fn from_records<I>(kind: TableKind, records: I, skip_rows: usize) -> Self
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        let is_blank = |r: &Vec<Option<String>>| r.iter().all(|c| c.as_deref().map_or(true, str::is_empty));
        let mut records = records.into_iter().skip(skip_rows).filter(|r| !is_blank(r));

        let headers: Vec<String> = match records.next() {
            Some(record) => record
                .into_iter()
                .map(|h| h.unwrap_or_default().trim().to_string())
                .collect(),
            None => return Self::empty(kind),
        };

        let rows = records
            .map(|mut row| {
                row.resize(headers.len().max(row.len()), None);
                row
            })
            .collect();

        Self { kind, headers, rows }
    }

    /// Index of the first header equal to `name` (both sides trimmed).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_deref())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Text after the first `n` physical lines. The csv reader drops empty
/// lines, so the preamble is cut here where blank lines still count.
pub fn skip_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((idx, _)) => &text[idx + 1..],
        None => "",
    }
}
