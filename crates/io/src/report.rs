// XLSX rendering of the structured per-organization report.
//
// One worksheet per planned sheet, built in memory and saved to a buffer. A
// sheet that fails to build is skipped; the rest of the report still renders.

use std::collections::HashMap;
use std::fmt;

use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use stockback_recon::config::{CollisionPolicy, ReportConfig};
use stockback_recon::partition::{CellValue, ReportSheet, DATA_HEADER_ROW, MAX_SHEET_NAME_LEN};
use stockback_recon::Report;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub on_sheet_name_collision: CollisionPolicy,
}

impl From<&ReportConfig> for RenderOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            on_sheet_name_collision: config.on_sheet_name_collision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderSkip {
    /// A later group with the same sheet name replaced this one.
    Overwritten { by: String },
    /// The XLSX writer rejected the sheet.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    Rendered { key: String, sheet_name: String, rows: usize },
    Skipped { key: String, sheet_name: String, reason: RenderSkip },
}

impl SheetOutcome {
    pub fn key(&self) -> &str {
        match self {
            Self::Rendered { key, .. } | Self::Skipped { key, .. } => key,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Per-sheet outcomes, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub outcomes: Vec<SheetOutcome>,
    pub sheets_rendered: usize,
    pub sheets_skipped: usize,
    /// The report had no sheets and a single empty worksheet was written.
    pub empty_placeholder: bool,
}

impl RenderSummary {
    /// One line per sheet, for terminal output.
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|o| match o {
                SheetOutcome::Rendered { key, sheet_name, rows } => {
                    format!("  sheet '{sheet_name}' ({key}): {rows} rows")
                }
                SheetOutcome::Skipped { key, sheet_name, reason: RenderSkip::Overwritten { by } } => {
                    format!("  sheet '{sheet_name}' ({key}): skipped, replaced by {by}")
                }
                SheetOutcome::Skipped { key, sheet_name, reason: RenderSkip::Failed { message } } => {
                    format!("  sheet '{sheet_name}' ({key}): skipped, {message}")
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// XLSX file contents.
    pub bytes: Vec<u8>,
    pub summary: RenderSummary,
}

#[derive(Debug)]
pub enum RenderError {
    /// Sheets were planned but every one of them failed.
    NoSheetRendered { failures: Vec<String> },
    /// The workbook could not be serialized.
    Save(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSheetRendered { failures } => {
                write!(f, "render: no sheet could be rendered ({})", failures.join("; "))
            }
            Self::Save(msg) => write!(f, "render: failed to save XLSX: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Render `report` to XLSX bytes.
pub fn render_report(report: &Report, options: &RenderOptions) -> Result<RenderedReport, RenderError> {
    let policy = options.on_sheet_name_collision;
    let mut outcomes: Vec<Option<SheetOutcome>> = vec![None; report.sheets.len()];
    let mut slots: Vec<Slot> = Vec::new();
    // Excel compares sheet names case-insensitively.
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut failures = Vec::new();

    for (idx, sheet) in report.sheets.iter().enumerate() {
        let existing = taken.get(&sheet.sheet_name.to_lowercase()).copied();
        let name = match (existing, policy) {
            (Some(_), CollisionPolicy::Suffix) => free_suffixed_name(&sheet.sheet_name, &taken),
            _ => sheet.sheet_name.clone(),
        };

        let worksheet = match build_worksheet(sheet, &name) {
            Ok(worksheet) => worksheet,
            Err(e) => {
                log::warn!("render: sheet '{name}' of '{}' skipped: {e}", sheet.key);
                failures.push(format!("{name}: {e}"));
                outcomes[idx] = Some(SheetOutcome::Skipped {
                    key: sheet.key.clone(),
                    sheet_name: name,
                    reason: RenderSkip::Failed { message: e.to_string() },
                });
                continue;
            }
        };

        outcomes[idx] = Some(SheetOutcome::Rendered {
            key: sheet.key.clone(),
            sheet_name: name.clone(),
            rows: sheet.rows.len(),
        });
        let slot = Slot { sheet: idx, name, worksheet };

        match (existing, policy) {
            // The earlier sheet is only given up once its replacement exists.
            (Some(pos), CollisionPolicy::Overwrite) => {
                let replaced = std::mem::replace(&mut slots[pos], slot);
                let earlier = &report.sheets[replaced.sheet];
                log::warn!(
                    "render: sheet '{}' of '{}' replaced by '{}'",
                    replaced.name,
                    earlier.key,
                    sheet.key
                );
                outcomes[replaced.sheet] = Some(SheetOutcome::Skipped {
                    key: earlier.key.clone(),
                    sheet_name: replaced.name,
                    reason: RenderSkip::Overwritten { by: sheet.key.clone() },
                });
            }
            _ => {
                taken.insert(slot.name.to_lowercase(), slots.len());
                slots.push(slot);
            }
        }
    }

    let mut summary = RenderSummary {
        outcomes: outcomes.into_iter().flatten().collect(),
        ..RenderSummary::default()
    };
    summary.sheets_rendered = summary.outcomes.iter().filter(|o| o.is_rendered()).count();
    summary.sheets_skipped = summary.outcomes.len() - summary.sheets_rendered;

    let mut workbook = Workbook::new();
    if slots.is_empty() {
        if !report.sheets.is_empty() {
            return Err(RenderError::NoSheetRendered { failures });
        }
        // An XLSX file needs at least one worksheet to open.
        workbook.add_worksheet();
        summary.empty_placeholder = true;
    }
    for slot in slots {
        workbook.push_worksheet(slot.worksheet);
    }

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| RenderError::Save(e.to_string()))?;

    log::info!(
        "render: {} sheets written, {} skipped, {} bytes",
        summary.sheets_rendered,
        summary.sheets_skipped,
        bytes.len()
    );
    Ok(RenderedReport { bytes, summary })
}

// ---------------------------------------------------------------------------
// Sheet names
// ---------------------------------------------------------------------------

/// A built worksheet and the report sheet it came from, in workbook order.
struct Slot {
    sheet: usize,
    name: String,
    worksheet: Worksheet,
}

fn free_suffixed_name(name: &str, taken: &HashMap<String, usize>) -> String {
    (2..)
        .map(|n| suffixed(name, n))
        .find(|candidate| !taken.contains_key(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}

/// `name~n`, with `name` shortened so the result stays within 31 characters.
fn suffixed(name: &str, n: usize) -> String {
    let suffix = format!("~{n}");
    let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
    let base: String = name.chars().take(keep).collect();
    format!("{}{suffix}", base.trim_end())
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

fn build_worksheet(sheet: &ReportSheet, name: &str) -> Result<Worksheet, XlsxError> {
    let layout = &sheet.layout;
    let mut worksheet = Worksheet::new();
    worksheet.set_name(name)?;

    let base = Format::new().set_font_size(layout.base_font_size);
    let title = Format::new().set_font_size(layout.title_font_size);
    let addressee = Format::new().set_font_size(layout.addressee_font_size).set_bold();
    let bordered = base.clone().set_border(FormatBorder::Thin);

    // Header block: title, addressee line (A3 names, C3 honorific), request.
    worksheet.write_string_with_format(0, 0, &sheet.header.title, &title)?;
    worksheet.write_string_with_format(2, 0, &sheet.header.addressee, &addressee)?;
    worksheet.write_blank(2, 1, &addressee)?;
    worksheet.write_string_with_format(2, 2, &sheet.header.honorific, &addressee)?;
    worksheet.write_string_with_format(4, 0, &sheet.header.request_sentence, &base)?;

    // Data block
    let header_row = DATA_HEADER_ROW as u32;
    for (col, caption) in sheet.captions.iter().enumerate() {
        worksheet.write_string_with_format(header_row, col as u16, caption, &bordered)?;
    }
    for (i, row) in sheet.rows.iter().enumerate() {
        let r = header_row + 1 + i as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Text(s) => worksheet.write_string_with_format(r, col, s, &bordered)?,
                CellValue::Integer(n) => worksheet.write_number_with_format(r, col, *n as f64, &bordered)?,
                CellValue::Blank => worksheet.write_blank(r, col, &bordered)?,
            };
        }
    }

    // Layout
    for (col, width) in layout.column_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    let last_row = header_row + sheet.rows.len() as u32;
    for r in 0..=last_row {
        worksheet.set_row_height(r, layout.row_height)?;
    }
    if layout.landscape {
        worksheet.set_landscape();
    }
    if layout.fit_to_page_width {
        worksheet.set_print_fit_to_pages(1, 0);
    }
    if layout.print_title_rows > 0 {
        worksheet.set_repeat_rows(0, layout.print_title_rows as u32 - 1)?;
    }

    Ok(worksheet)
}
