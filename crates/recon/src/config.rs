use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::schema::{ColumnSpec, Requirement};

/// Number of columns in a rendered data block (six projected fields plus the
/// blank pickup-quantity column).
pub const DATA_BLOCK_COLUMNS: usize = 7;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default, so an empty TOML document
/// describes the standard pharmacy export layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub inventory: InventoryColumns,
    pub code_mapping: CodeMappingColumns,
    pub purchase_history: PurchaseHistoryColumns,
    pub finalize: FinalizeConfig,
    pub report: ReportConfig,
}

// ---------------------------------------------------------------------------
// Input column names
// ---------------------------------------------------------------------------

/// Dead-stock inventory export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryColumns {
    pub drug_name: String,
    pub quantity: String,
    pub expiry_date: String,
    pub lot_number: String,
    /// Preamble lines before the header record in the CSV export.
    pub skip_rows: usize,
}

impl Default for InventoryColumns {
    fn default() -> Self {
        Self {
            drug_name: "薬品名".into(),
            quantity: "在庫量".into(),
            expiry_date: "使用期限".into(),
            lot_number: "ロット番号".into(),
            skip_rows: 7,
        }
    }
}

impl InventoryColumns {
    pub fn specs(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("drug_name", &self.drug_name, Requirement::Required),
            ColumnSpec::new("quantity", &self.quantity, Requirement::Required),
            ColumnSpec::new("expiry_date", &self.expiry_date, Requirement::Required),
            ColumnSpec::new("lot_number", &self.lot_number, Requirement::Optional),
        ]
    }
}

/// Stock-value export used as the drug name → (code, unit) mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeMappingColumns {
    pub drug_name: String,
    pub code: String,
    pub unit: String,
}

impl Default for CodeMappingColumns {
    fn default() -> Self {
        Self {
            drug_name: "薬品名".into(),
            code: "ＹＪコード".into(),
            unit: "単位".into(),
        }
    }
}

impl CodeMappingColumns {
    pub fn specs(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("drug_name", &self.drug_name, Requirement::Required),
            ColumnSpec::new("code", &self.code, Requirement::Required),
            ColumnSpec::new("unit", &self.unit, Requirement::Optional),
        ]
    }
}

/// Purchase / distribution history of the other organizations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PurchaseHistoryColumns {
    pub code: String,
    pub corporate_name: String,
    pub organization_name: String,
    pub item_name: String,
    pub new_drug_code: String,
}

impl Default for PurchaseHistoryColumns {
    fn default() -> Self {
        Self {
            code: "厚労省CD".into(),
            corporate_name: "法人名".into(),
            organization_name: "院所名".into(),
            item_name: "品名・規格".into(),
            new_drug_code: "新薬品ｺｰﾄﾞ".into(),
        }
    }
}

impl PurchaseHistoryColumns {
    /// Every purchase-history column degrades to an empty string when absent.
    pub fn specs(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("code", &self.code, Requirement::Optional),
            ColumnSpec::new("corporate_name", &self.corporate_name, Requirement::Optional),
            ColumnSpec::new("organization_name", &self.organization_name, Requirement::Optional),
            ColumnSpec::new("item_name", &self.item_name, Requirement::Optional),
            ColumnSpec::new("new_drug_code", &self.new_drug_code, Requirement::Optional),
        ]
    }
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinalizeConfig {
    /// Use the inventory drug name when the join supplied no item name/spec,
    /// instead of dropping the row.
    pub item_name_fallback: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What to do when two groups derive the same sheet name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The later group replaces the earlier sheet.
    #[default]
    Overwrite,
    /// The later group gets a `~N` suffix.
    Suffix,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataColumnCaptions {
    pub item_name: String,
    pub quantity: String,
    pub unit: String,
    pub new_drug_code: String,
    pub expiry_date: String,
    pub lot_number: String,
    pub pickup_quantity: String,
}

impl Default for DataColumnCaptions {
    fn default() -> Self {
        Self {
            item_name: "品名・規格".into(),
            quantity: "在庫量".into(),
            unit: "単位".into(),
            new_drug_code: "新薬品ｺｰﾄﾞ".into(),
            expiry_date: "使用期限".into(),
            lot_number: "ロット番号".into(),
            pickup_quantity: "引取り可能数".into(),
        }
    }
}

impl DataColumnCaptions {
    /// Captions in data-block order.
    pub fn in_order(&self) -> [String; DATA_BLOCK_COLUMNS] {
        [
            self.item_name.clone(),
            self.quantity.clone(),
            self.unit.clone(),
            self.new_drug_code.clone(),
            self.expiry_date.clone(),
            self.lot_number.clone(),
            self.pickup_quantity.clone(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    pub honorific: String,
    pub request_sentence: String,
    pub placeholder_sheet_name: String,
    pub columns: DataColumnCaptions,
    /// Excel character-width units, one per data-block column.
    pub column_widths: Vec<f64>,
    /// Points, applied to every row of the sheet.
    pub row_height: f64,
    pub base_font_size: f64,
    pub title_font_size: f64,
    pub addressee_font_size: f64,
    pub on_sheet_name_collision: CollisionPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "不良在庫引き取り依頼".into(),
            honorific: "御中".into(),
            request_sentence: "下記の不良在庫につきまして、引き取りのご検討を賜れますと幸いです。どうぞよろしくお願いいたします。".into(),
            placeholder_sheet_name: "Unknown".into(),
            columns: DataColumnCaptions::default(),
            column_widths: vec![35.0, 15.0, 10.0, 15.0, 15.0, 15.0, 20.0],
            row_height: 30.0,
            base_font_size: 14.0,
            title_font_size: 16.0,
            addressee_font_size: 14.0,
            on_sheet_name_collision: CollisionPolicy::Overwrite,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        check_columns("inventory", &self.inventory.specs())?;
        check_columns("code_mapping", &self.code_mapping.specs())?;
        check_columns("purchase_history", &self.purchase_history.specs())?;

        let report = &self.report;
        if report.column_widths.len() != DATA_BLOCK_COLUMNS {
            return Err(ReconError::ConfigValidation(format!(
                "report.column_widths must have {DATA_BLOCK_COLUMNS} entries, found {}",
                report.column_widths.len()
            )));
        }
        if let Some(w) = report.column_widths.iter().find(|w| !(**w > 0.0)) {
            return Err(ReconError::ConfigValidation(format!(
                "report.column_widths must be positive, found {w}"
            )));
        }
        for (name, value) in [
            ("row_height", report.row_height),
            ("base_font_size", report.base_font_size),
            ("title_font_size", report.title_font_size),
            ("addressee_font_size", report.addressee_font_size),
        ] {
            if !(value > 0.0) {
                return Err(ReconError::ConfigValidation(format!(
                    "report.{name} must be positive, found {value}"
                )));
            }
        }
        if report.placeholder_sheet_name.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "report.placeholder_sheet_name must not be blank".into(),
            ));
        }

        Ok(())
    }
}

fn check_columns(section: &str, specs: &[ColumnSpec]) -> Result<(), ReconError> {
    let mut seen = HashSet::new();
    for spec in specs {
        let column = spec.column.trim();
        if column.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "{section}.{} must name a column",
                spec.field
            )));
        }
        if !seen.insert(column.to_string()) {
            return Err(ReconError::ConfigValidation(format!(
                "{section}: column '{column}' is mapped to more than one field"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
