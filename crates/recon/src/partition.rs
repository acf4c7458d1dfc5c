//! Partition finalized rows into one report sheet per receiving organization.
//!
//! The output is a structured [`Report`]: named sheets with a header block, a
//! data block and layout metadata. Turning it into a file is the renderer's
//! job (`stockback-io`).

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{ReportConfig, DATA_BLOCK_COLUMNS};
use crate::model::MergedRow;

/// Longest sheet name the XLSX format accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters the XLSX format rejects in sheet names.
pub const ILLEGAL_SHEET_CHARS: [char; 7] = ['/', '\\', '?', '*', ':', '[', ']'];

/// Used when both the derived name and the configured placeholder are empty.
pub const FALLBACK_SHEET_NAME: &str = "Unknown";

/// Lines in the header block above the data block.
pub const HEADER_LINES: usize = 6;

/// 0-based row of the data-block caption row; data follows directly.
pub const DATA_HEADER_ROW: usize = HEADER_LINES;

/// Derive a sheet name from an organization name.
///
/// Illegal characters become `_`, the result is cut to 31 characters and
/// trimmed. An empty result falls back to `placeholder`. Idempotent.
pub fn sheet_identifier(name: &str, placeholder: &str) -> String {
    let derived = sanitize(name);
    if !derived.is_empty() {
        return derived;
    }
    let placeholder = sanitize(placeholder);
    if placeholder.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        placeholder
    }
}

fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if ILLEGAL_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    replaced.trim().to_string()
}

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

/// The six header lines above the data block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderBlock {
    pub title: String,
    /// `"{corporate} {organization}"`, blank parts left out.
    pub addressee: String,
    pub honorific: String,
    pub request_sentence: String,
}

impl HeaderBlock {
    pub fn new(config: &ReportConfig, corporate_name: &str, organization_name: &str) -> Self {
        Self {
            title: config.title.clone(),
            addressee: addressee(corporate_name, organization_name),
            honorific: config.honorific.clone(),
            request_sentence: config.request_sentence.clone(),
        }
    }

    /// Line 3 as it reads on the sheet, e.g. `Corp ClinicA 御中`.
    pub fn addressee_line(&self) -> String {
        join_non_blank(&[&self.addressee, &self.honorific])
    }

    /// Header lines in sheet order; blank lines are empty strings.
    pub fn lines(&self) -> [String; HEADER_LINES] {
        [
            self.title.clone(),
            String::new(),
            self.addressee_line(),
            String::new(),
            self.request_sentence.clone(),
            String::new(),
        ]
    }
}

fn addressee(corporate_name: &str, organization_name: &str) -> String {
    join_non_blank(&[corporate_name, organization_name])
}

fn join_non_blank(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A value in the data block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Blank,
}

/// One data-block row. The pickup-quantity column is always blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub new_drug_code: String,
    pub expiry_date: NaiveDate,
    pub lot_number: String,
}

impl ReportRow {
    pub fn from_merged(row: &MergedRow) -> Self {
        Self {
            item_name: row.item_name.clone(),
            quantity: row.quantity,
            unit: row.unit.clone(),
            new_drug_code: row.new_drug_code.clone(),
            expiry_date: row.expiry_date,
            lot_number: row.lot_number.clone(),
        }
    }

    /// Cells in data-block order, pickup quantity last.
    pub fn cells(&self) -> [CellValue; DATA_BLOCK_COLUMNS] {
        [
            CellValue::Text(self.item_name.clone()),
            CellValue::Integer(self.quantity),
            CellValue::Text(self.unit.clone()),
            CellValue::Text(self.new_drug_code.clone()),
            CellValue::Text(self.expiry_date.format("%Y-%m-%d").to_string()),
            CellValue::Text(self.lot_number.clone()),
            CellValue::Blank,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetLayout {
    pub column_widths: [f64; DATA_BLOCK_COLUMNS],
    pub row_height: f64,
    pub base_font_size: f64,
    pub title_font_size: f64,
    pub addressee_font_size: f64,
    pub landscape: bool,
    pub fit_to_page_width: bool,
    /// Rows `0..print_title_rows` repeat on every printed page.
    pub print_title_rows: usize,
}

impl SheetLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        let mut column_widths = [0.0; DATA_BLOCK_COLUMNS];
        for (slot, width) in column_widths.iter_mut().zip(&config.column_widths) {
            *slot = *width;
        }
        Self {
            column_widths,
            row_height: config.row_height,
            base_font_size: config.base_font_size,
            title_font_size: config.title_font_size,
            addressee_font_size: config.addressee_font_size,
            landscape: true,
            fit_to_page_width: true,
            print_title_rows: DATA_HEADER_ROW + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    /// Trimmed organization name the sheet was grouped by.
    pub key: String,
    pub sheet_name: String,
    pub corporate_name: String,
    pub header: HeaderBlock,
    pub captions: [String; DATA_BLOCK_COLUMNS],
    pub rows: Vec<ReportRow>,
    pub layout: SheetLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Every row of the group lacked an item name/spec.
    EmptyDataBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGroup {
    pub key: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Planned sheets in first-encounter order of their organization.
    pub sheets: Vec<ReportSheet>,
    pub skipped: Vec<SkippedGroup>,
    /// Finalized rows with a blank organization name; they appear on no sheet.
    pub unassigned_rows: usize,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Sheet names derived by more than one group, with the group keys.
    pub fn name_collisions(&self) -> Vec<(String, Vec<String>)> {
        let mut order: Vec<String> = Vec::new();
        let mut by_name: HashMap<&str, Vec<String>> = HashMap::new();
        for sheet in &self.sheets {
            let keys = by_name.entry(sheet.sheet_name.as_str()).or_default();
            if keys.is_empty() {
                order.push(sheet.sheet_name.clone());
            }
            keys.push(sheet.key.clone());
        }
        order
            .into_iter()
            .filter_map(|name| {
                let keys = by_name.remove(name.as_str())?;
                (keys.len() > 1).then_some((name, keys))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Group `rows` by trimmed organization name, in first-encounter order.
///
/// Blank organization names are skipped. Rows without an item name/spec do
/// not enter a data block, and a group left with none is reported in
/// `Report::skipped`. Sheet-name collisions are kept as they are; resolving
/// them is a rendering policy.
pub fn partition(rows: &[MergedRow], config: &ReportConfig) -> Report {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&MergedRow>> = HashMap::new();
    let mut report = Report::default();

    for row in rows {
        let key = row.organization_name.trim();
        if key.is_empty() {
            report.unassigned_rows += 1;
            continue;
        }
        let members = groups.entry(key.to_string()).or_default();
        if members.is_empty() {
            order.push(key.to_string());
        }
        members.push(row);
    }

    let layout = SheetLayout::from_config(config);
    let captions = config.columns.in_order();

    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        let data: Vec<ReportRow> = members
            .iter()
            .filter(|r| !r.item_name.trim().is_empty())
            .map(|r| ReportRow::from_merged(r))
            .collect();
        if data.is_empty() {
            log::warn!("partition: group '{key}' has no data rows, skipped");
            report.skipped.push(SkippedGroup {
                key,
                reason: SkipReason::EmptyDataBlock,
            });
            continue;
        }

        let corporate_name = members
            .first()
            .map(|r| r.corporate_name.trim().to_string())
            .unwrap_or_default();

        report.sheets.push(ReportSheet {
            sheet_name: sheet_identifier(&key, &config.placeholder_sheet_name),
            header: HeaderBlock::new(config, &corporate_name, &key),
            corporate_name,
            captions: captions.clone(),
            rows: data,
            layout: layout.clone(),
            key,
        });
    }

    for (name, keys) in report.name_collisions() {
        log::warn!(
            "partition: {} groups share sheet name '{name}': {}",
            keys.len(),
            keys.join(", ")
        );
    }
    log::debug!(
        "partition: {} sheets planned, {} rows without organization",
        report.sheets.len(),
        report.unassigned_rows
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(corp: &str, org: &str, item: &str) -> MergedRow {
        MergedRow {
            item_name: item.into(),
            quantity: 2,
            unit: "錠".into(),
            new_drug_code: "N".into(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            lot_number: "L".into(),
            corporate_name: corp.into(),
            organization_name: org.into(),
        }
    }

    #[test]
    fn sheet_identifier_replaces_illegal_chars() {
        assert_eq!(sheet_identifier("A/B\\C?D*E:F[G]", "Unknown"), "A_B_C_D_E_F_G_");
    }

    #[test]
    fn sheet_identifier_truncates_then_trims() {
        let name = format!("{} tail", "x".repeat(30));
        // 30 x's plus the space make 31 chars; the trailing space is trimmed.
        assert_eq!(sheet_identifier(&name, "Unknown"), "x".repeat(30));
        assert_eq!(sheet_identifier("  padded  ", "Unknown"), "padded");
    }

    #[test]
    fn sheet_identifier_counts_characters_not_bytes() {
        let name = "病".repeat(40);
        assert_eq!(sheet_identifier(&name, "Unknown").chars().count(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn sheet_identifier_placeholder() {
        assert_eq!(sheet_identifier("   ", "Unknown"), "Unknown");
        assert_eq!(sheet_identifier("", "不明"), "不明");
        assert_eq!(sheet_identifier("", "  "), FALLBACK_SHEET_NAME);
    }

    #[test]
    fn addressee_line_degrades() {
        let config = ReportConfig::default();
        assert_eq!(HeaderBlock::new(&config, "Corp", "ClinicA").addressee_line(), "Corp ClinicA 御中");
        assert_eq!(HeaderBlock::new(&config, "  ", "ClinicA").addressee_line(), "ClinicA 御中");
        assert_eq!(HeaderBlock::new(&config, " Corp ", "").addressee, "Corp");
    }

    #[test]
    fn header_lines_layout() {
        let config = ReportConfig::default();
        let lines = HeaderBlock::new(&config, "Corp", "ClinicA").lines();
        assert_eq!(lines[0], "不良在庫引き取り依頼");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Corp ClinicA 御中");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], config.request_sentence);
        assert_eq!(lines[5], "");
    }

    #[test]
    fn data_block_has_blank_pickup_column() {
        let cells = ReportRow::from_merged(&row("C", "O", "Item")).cells();
        assert_eq!(cells[0], CellValue::Text("Item".into()));
        assert_eq!(cells[1], CellValue::Integer(2));
        assert_eq!(cells[4], CellValue::Text("2025-01-01".into()));
        assert_eq!(cells[5], CellValue::Text("L".into()));
        assert_eq!(cells[6], CellValue::Blank);
    }

    #[test]
    fn groups_in_first_encounter_order() {
        let rows = vec![
            row("Corp", "ClinicB", "1"),
            row("Corp", "ClinicA", "2"),
            row("Corp", " ClinicB ", "3"),
        ];
        let report = partition(&rows, &ReportConfig::default());
        let keys: Vec<&str> = report.sheets.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["ClinicB", "ClinicA"]);
        assert_eq!(report.sheets[0].rows.len(), 2);
        assert_eq!(report.sheets[0].rows[1].item_name, "3");
    }

    #[test]
    fn organization_names_are_case_sensitive() {
        let rows = vec![row("Corp", "clinic", "1"), row("Corp", "Clinic", "2")];
        let report = partition(&rows, &ReportConfig::default());
        assert_eq!(report.sheets.len(), 2);
    }

    #[test]
    fn blank_organizations_are_unassigned() {
        let rows = vec![row("Corp", "", "1"), row("Corp", "   ", "2"), row("Corp", "X", "3")];
        let report = partition(&rows, &ReportConfig::default());
        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.unassigned_rows, 2);
    }

    #[test]
    fn group_without_item_names_is_skipped() {
        let rows = vec![
            row("Corp", "ClinicA", ""),
            row("Corp", "ClinicB", "Aspirin"),
            row("Corp", "ClinicB", "  "),
        ];
        let report = partition(&rows, &ReportConfig::default());
        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.sheets[0].key, "ClinicB");
        assert_eq!(report.sheets[0].rows.len(), 1);
        assert_eq!(
            report.skipped,
            vec![SkippedGroup { key: "ClinicA".into(), reason: SkipReason::EmptyDataBlock }]
        );
    }

    #[test]
    fn no_rows_no_sheets() {
        let report = partition(&[], &ReportConfig::default());
        assert!(report.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn layout_follows_config() {
        let report = partition(&[row("C", "O", "1")], &ReportConfig::default());
        let layout = &report.sheets[0].layout;
        assert_eq!(layout.column_widths, [35.0, 15.0, 10.0, 15.0, 15.0, 15.0, 20.0]);
        assert_eq!(layout.row_height, 30.0);
        assert_eq!(layout.print_title_rows, 7);
        assert!(layout.landscape && layout.fit_to_page_width);
    }

    #[test]
    fn truncation_collisions_are_kept() {
        let prefix = "Regional Medical Center Hospita";
        assert_eq!(prefix.chars().count(), 31);
        let rows = vec![
            row("Corp", &format!("{prefix}l East"), "1"),
            row("Corp", &format!("{prefix}l West"), "2"),
        ];
        let report = partition(&rows, &ReportConfig::default());
        assert_eq!(report.sheets.len(), 2);
        assert_eq!(report.sheets[0].sheet_name, prefix);
        assert_eq!(report.sheets[1].sheet_name, prefix);
        let collisions = report.name_collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].1.len(), 2);
    }
}
