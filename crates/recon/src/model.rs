use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The three decoded input tables for one run.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub inventory: crate::table::Table,
    pub purchase_history: crate::table::Table,
    pub code_mapping: crate::table::Table,
}

/// One unit of dead stock that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    /// 0-based data row in the inventory table.
    pub source_row: usize,
    pub drug_name: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub lot_number: String,
    /// Canonical (YJ) code, set by the resolver.
    pub code: Option<String>,
    /// Dispensing unit, set by the resolver.
    pub unit: Option<String>,
}

/// One purchase/distribution record of another organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseHistoryRow {
    pub source_row: usize,
    pub code: String,
    pub corporate_name: String,
    pub organization_name: String,
    pub item_name: String,
    pub new_drug_code: String,
}

/// Drug name → (canonical code, unit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMappingEntry {
    pub drug_name: String,
    pub code: String,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Inventory row with the purchase-history row it joined to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub inventory: InventoryRow,
    pub history: Option<PurchaseHistoryRow>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Finalized result row, in the fixed result-schema field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRow {
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub new_drug_code: String,
    pub expiry_date: NaiveDate,
    pub lot_number: String,
    pub corporate_name: String,
    pub organization_name: String,
}

impl MergedRow {
    /// Result-schema column names, in field order.
    pub const FIELDS: [&'static str; 8] = [
        "item_name",
        "quantity",
        "unit",
        "new_drug_code",
        "expiry_date",
        "lot_number",
        "corporate_name",
        "organization_name",
    ];

    /// Row as strings in `FIELDS` order; dates are ISO-8601.
    pub fn to_record(&self) -> [String; 8] {
        [
            self.item_name.clone(),
            self.quantity.to_string(),
            self.unit.clone(),
            self.new_drug_code.clone(),
            self.expiry_date.format("%Y-%m-%d").to_string(),
            self.lot_number.clone(),
            self.corporate_name.clone(),
            self.organization_name.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_follows_field_order() {
        let row = MergedRow {
            item_name: "Aspirin 100mg".into(),
            quantity: 10,
            unit: "mg".into(),
            new_drug_code: "N1".into(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            lot_number: "L9".into(),
            corporate_name: "Corp".into(),
            organization_name: "ClinicA".into(),
        };
        assert_eq!(
            row.to_record(),
            ["Aspirin 100mg", "10", "mg", "N1", "2025-01-01", "L9", "Corp", "ClinicA"].map(String::from)
        );
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["expiry_date"], "2025-01-01");
        assert_eq!(json["quantity"], 10);
    }
}
