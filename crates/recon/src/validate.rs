//! Row validation and normalization.
//!
//! Inventory rows pass through three filtering steps, each a pure function
//! from one row type to the next with its own [`StepReport`]:
//!
//! 1. [`drop_blank_drug_names`]: drug name present after trimming
//! 2. [`coerce_quantities`]: quantity numeric and ≥ 1 once stored as an integer
//! 3. [`coerce_expiry_dates`]: expiry date parses to a calendar date
//!
//! [`normalize_table`] is the fourth rule: null cells of the other input
//! tables become empty strings before they are ingested.
//!
//! Dropping a row is never an error. Only a missing required column fails.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::InventoryColumns;
use crate::error::{ReconError, Stage};
use crate::model::InventoryRow;
use crate::schema::ResolvedColumns;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStep {
    DrugName,
    Quantity,
    ExpiryDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    BlankDrugName,
    MissingQuantity,
    NonNumericQuantity { value: String },
    NonPositiveQuantity { value: String },
    MissingExpiryDate,
    InvalidExpiryDate { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub source_row: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: ValidationStep,
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped: Vec<DroppedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub steps: Vec<StepReport>,
}

impl ValidationReport {
    pub fn total_dropped(&self) -> usize {
        self.steps.iter().map(|s| s.dropped.len()).sum()
    }

    pub fn step(&self, step: ValidationStep) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Rows kept by one step plus what the step removed.
#[derive(Debug, Clone)]
pub struct StepOutcome<T> {
    pub kept: Vec<T>,
    pub report: StepReport,
}

// ---------------------------------------------------------------------------
// Row types between steps
// ---------------------------------------------------------------------------

/// Inventory row as read from the table, before any rule is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInventoryRow {
    pub source_row: usize,
    pub drug_name: Option<String>,
    pub quantity: Option<String>,
    pub expiry_date: Option<String>,
    pub lot_number: Option<String>,
}

/// After step 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRow {
    pub source_row: usize,
    pub drug_name: String,
    pub quantity: Option<String>,
    pub expiry_date: Option<String>,
    pub lot_number: String,
}

/// After step 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedRow {
    pub source_row: usize,
    pub drug_name: String,
    pub quantity: i64,
    pub expiry_date: Option<String>,
    pub lot_number: String,
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

/// Read inventory rows from the table. Fails only when a required column is
/// absent from the header.
pub fn ingest_inventory(
    table: &Table,
    columns: &InventoryColumns,
) -> Result<Vec<RawInventoryRow>, ReconError> {
    let cols = ResolvedColumns::resolve(table, &columns.specs(), Stage::Validate)?;
    let owned = |row: usize, field: &str| cols.get(table, row, field).map(str::to_string);

    Ok((0..table.row_count())
        .map(|row| RawInventoryRow {
            source_row: row,
            drug_name: owned(row, "drug_name"),
            quantity: owned(row, "quantity"),
            expiry_date: owned(row, "expiry_date"),
            lot_number: owned(row, "lot_number"),
        })
        .collect())
}

/// Ingest and run all three inventory steps in order.
pub fn validate_inventory(
    table: &Table,
    columns: &InventoryColumns,
) -> Result<(Vec<InventoryRow>, ValidationReport), ReconError> {
    let raw = ingest_inventory(table, columns)?;

    let named = drop_blank_drug_names(&raw);
    let counted = coerce_quantities(&named.kept);
    let dated = coerce_expiry_dates(&counted.kept);

    let report = ValidationReport {
        steps: vec![named.report, counted.report, dated.report],
    };
    for step in &report.steps {
        log::debug!(
            "validate {:?}: {} -> {} rows ({} dropped)",
            step.step,
            step.rows_in,
            step.rows_out,
            step.dropped.len()
        );
    }

    Ok((dated.kept, report))
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Step 1: drop rows whose drug name is null, empty, or whitespace.
pub fn drop_blank_drug_names(rows: &[RawInventoryRow]) -> StepOutcome<NamedRow> {
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for row in rows {
        let name = row.drug_name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            dropped.push(DroppedRow { source_row: row.source_row, reason: DropReason::BlankDrugName });
            continue;
        }
        kept.push(NamedRow {
            source_row: row.source_row,
            drug_name: name.to_string(),
            quantity: row.quantity.clone(),
            expiry_date: row.expiry_date.clone(),
            lot_number: row.lot_number.as_deref().map(str::trim).unwrap_or("").to_string(),
        });
    }

    finish(ValidationStep::DrugName, rows.len(), kept, dropped)
}

/// Step 2: drop rows whose quantity is missing, non-numeric, or < 1 as an integer.
pub fn coerce_quantities(rows: &[NamedRow]) -> StepOutcome<CountedRow> {
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for row in rows {
        match parse_quantity(row.quantity.as_deref()) {
            Ok(quantity) => kept.push(CountedRow {
                source_row: row.source_row,
                drug_name: row.drug_name.clone(),
                quantity,
                expiry_date: row.expiry_date.clone(),
                lot_number: row.lot_number.clone(),
            }),
            Err(reason) => dropped.push(DroppedRow { source_row: row.source_row, reason }),
        }
    }

    finish(ValidationStep::Quantity, rows.len(), kept, dropped)
}

/// Step 3: drop rows whose expiry date is missing or not a calendar date.
pub fn coerce_expiry_dates(rows: &[CountedRow]) -> StepOutcome<InventoryRow> {
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for row in rows {
        let raw = row.expiry_date.as_deref().map(str::trim).unwrap_or("");
        if raw.is_empty() {
            dropped.push(DroppedRow { source_row: row.source_row, reason: DropReason::MissingExpiryDate });
            continue;
        }
        match parse_expiry_date(raw) {
            Some(expiry_date) => kept.push(InventoryRow {
                source_row: row.source_row,
                drug_name: row.drug_name.clone(),
                quantity: row.quantity,
                expiry_date,
                lot_number: row.lot_number.clone(),
                code: None,
                unit: None,
            }),
            None => dropped.push(DroppedRow {
                source_row: row.source_row,
                reason: DropReason::InvalidExpiryDate { value: raw.to_string() },
            }),
        }
    }

    finish(ValidationStep::ExpiryDate, rows.len(), kept, dropped)
}

fn finish<T>(step: ValidationStep, rows_in: usize, kept: Vec<T>, dropped: Vec<DroppedRow>) -> StepOutcome<T> {
    let report = StepReport { step, rows_in, rows_out: kept.len(), dropped };
    StepOutcome { kept, report }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Copy of `table` with every cell trimmed and nulls replaced by `""`.
pub fn normalize_table(table: &Table) -> Table {
    let width = table.headers.len();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut out: Vec<Option<String>> = row
                .iter()
                .map(|cell| Some(cell.as_deref().map(str::trim).unwrap_or("").to_string()))
                .collect();
            if out.len() < width {
                out.resize(width, Some(String::new()));
            }
            out
        })
        .collect();
    Table::new(table.kind, table.headers.clone(), rows)
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Map full-width digits and punctuation used in Japanese exports to ASCII.
fn to_ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '－' | '−' => '-',
            '．' => '.',
            '，' => ',',
            '／' => '/',
            _ => c,
        })
        .collect()
}

/// `2025年4月1日` → `2025/4/1`, `2026年9月` → `2026/9`.
fn kanji_date_to_slashes(s: &str) -> String {
    let mapped: String = s
        .chars()
        .filter(|c| *c != '日')
        .map(|c| if c == '年' || c == '月' { '/' } else { c })
        .collect();
    mapped.trim_end_matches('/').to_string()
}

/// Coerce a quantity cell. Fractions are truncated toward zero and the result
/// must be at least 1.
pub fn parse_quantity(raw: Option<&str>) -> Result<i64, DropReason> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(DropReason::MissingQuantity);
    }

    let cleaned: String = to_ascii_digits(raw).chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| DropReason::NonNumericQuantity { value: raw.to_string() })?;

    let truncated = value.trunc();
    if truncated > i64::MAX as f64 {
        return Err(DropReason::NonNumericQuantity { value: raw.to_string() });
    }
    if truncated < 1.0 {
        return Err(DropReason::NonPositiveQuantity { value: raw.to_string() });
    }
    Ok(truncated as i64)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const MONTH_FORMATS: &[&str] = &["%Y-%m", "%Y/%m", "%Y.%m"];

/// Coerce an expiry-date cell to a calendar date.
///
/// Accepts ISO, slash, dot, compact `YYYYMMDD` and `YYYY年M月D日` dates, with
/// an optional trailing time, plus year-month values which resolve to the
/// first of the month.
pub fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    let ascii = kanji_date_to_slashes(&to_ascii_digits(raw.trim()));
    // Drop a trailing time component ("2025-01-01 00:00:00", "2025-01-01T00:00")
    let date_part = ascii.split(|c: char| c.is_whitespace() || c == 'T').next()?;
    if date_part.is_empty() {
        return None;
    }

    if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
        let y = date_part[0..4].parse().ok()?;
        let m = date_part[4..6].parse().ok()?;
        let d = date_part[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(date);
        }
    }

    for fmt in MONTH_FORMATS {
        let with_day = format!("{date_part}|1");
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, &format!("{fmt}|%d")) {
            return Some(date);
        }
    }

    None
}
