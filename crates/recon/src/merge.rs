use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::config::PurchaseHistoryColumns;
use crate::error::{ReconError, Stage};
use crate::model::{InventoryRow, JoinedRow, PurchaseHistoryRow};
use crate::resolver::CodeMapping;
use crate::schema::ResolvedColumns;
use crate::table::Table;

/// Purchase-history rows plus the columns that had to be synthesized.
#[derive(Debug, Clone, Default)]
pub struct PurchaseHistory {
    pub rows: Vec<PurchaseHistoryRow>,
    pub synthesized_columns: Vec<String>,
}

/// Read purchase-history rows. Absent columns become empty strings.
pub fn ingest_purchase_history(
    table: &Table,
    columns: &PurchaseHistoryColumns,
) -> Result<PurchaseHistory, ReconError> {
    let cols = ResolvedColumns::resolve(table, &columns.specs(), Stage::Merge)?;

    let rows = (0..table.row_count())
        .map(|row| PurchaseHistoryRow {
            source_row: row,
            code: cols.text(table, row, "code").trim().to_string(),
            corporate_name: cols.text(table, row, "corporate_name"),
            organization_name: cols.text(table, row, "organization_name"),
            item_name: cols.text(table, row, "item_name"),
            new_drug_code: cols.text(table, row, "new_drug_code"),
        })
        .collect();

    Ok(PurchaseHistory {
        rows,
        synthesized_columns: cols.synthesized().to_vec(),
    })
}

/// Copy of `rows` with each row's canonical code and unit resolved.
pub fn attach_codes(rows: &[InventoryRow], mapping: &CodeMapping) -> Vec<InventoryRow> {
    rows.iter()
        .map(|row| {
            let resolution = mapping.resolve(&row.drug_name);
            InventoryRow {
                code: resolution.code,
                unit: resolution.unit,
                ..row.clone()
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStats {
    pub inventory_rows: usize,
    pub merged_rows: usize,
    /// Inventory rows with no resolved code.
    pub unresolved: usize,
    /// Inventory rows that matched no purchase-history row.
    pub unmatched: usize,
    /// Rows added because a code matched more than one purchase-history row.
    pub fanout_rows: usize,
    /// Codes that matched more than one purchase-history row.
    pub ambiguous_codes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub rows: Vec<JoinedRow>,
    pub stats: MergeStats,
}

/// Left outer join on exact canonical code.
///
/// Every inventory row yields at least one joined row. A code present on
/// several purchase-history rows yields one joined row per match, in
/// purchase-history order. Rows without a code never match.
pub fn left_join(inventory: &[InventoryRow], history: &[PurchaseHistoryRow]) -> MergeOutput {
    let mut index: HashMap<&str, Vec<&PurchaseHistoryRow>> = HashMap::new();
    for row in history {
        if !row.code.is_empty() {
            index.entry(row.code.as_str()).or_default().push(row);
        }
    }

    let mut rows = Vec::with_capacity(inventory.len());
    let mut stats = MergeStats {
        inventory_rows: inventory.len(),
        ..MergeStats::default()
    };
    let mut ambiguous = BTreeSet::new();

    for inv in inventory {
        let matches = inv
            .code
            .as_deref()
            .and_then(|code| index.get(code))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if inv.code.is_none() {
            stats.unresolved += 1;
        }

        if matches.is_empty() {
            stats.unmatched += 1;
            rows.push(JoinedRow {
                inventory: inv.clone(),
                history: None,
            });
            continue;
        }

        if matches.len() > 1 {
            stats.fanout_rows += matches.len() - 1;
            if let Some(code) = &inv.code {
                ambiguous.insert(code.clone());
            }
        }
        for hist in matches {
            rows.push(JoinedRow {
                inventory: inv.clone(),
                history: Some((*hist).clone()),
            });
        }
    }

    stats.merged_rows = rows.len();
    stats.ambiguous_codes = ambiguous.into_iter().collect();
    MergeOutput { rows, stats }
}

/// Resolve codes, then left-join against purchase history.
pub fn merge(
    inventory: &[InventoryRow],
    mapping: &CodeMapping,
    history: &[PurchaseHistoryRow],
) -> MergeOutput {
    let resolved = attach_codes(inventory, mapping);
    let output = left_join(&resolved, history);

    if !output.stats.ambiguous_codes.is_empty() {
        log::warn!(
            "merge: {} code(s) matched several purchase-history rows, {} extra row(s): {}",
            output.stats.ambiguous_codes.len(),
            output.stats.fanout_rows,
            output.stats.ambiguous_codes.join(", ")
        );
    }
    log::debug!(
        "merge: {} inventory rows -> {} merged rows ({} unresolved, {} unmatched)",
        output.stats.inventory_rows,
        output.stats.merged_rows,
        output.stats.unresolved,
        output.stats.unmatched
    );
    output
}
