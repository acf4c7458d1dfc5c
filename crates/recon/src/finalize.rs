use crate::config::FinalizeConfig;
use crate::model::{JoinedRow, MergedRow};

#[derive(Debug, Clone, Default)]
pub struct FinalizeOutput {
    pub rows: Vec<MergedRow>,
    /// Joined rows dropped because no item name/spec was available.
    pub dropped_blank_item: usize,
    /// Rows kept by substituting the inventory drug name for the item name.
    pub item_name_fallbacks: usize,
}

/// Project one joined row into the result schema. Absent values read as `""`.
pub fn project(row: &JoinedRow) -> MergedRow {
    let inv = &row.inventory;
    let (item_name, new_drug_code, corporate_name, organization_name) = match &row.history {
        Some(h) => (
            h.item_name.clone(),
            h.new_drug_code.clone(),
            h.corporate_name.clone(),
            h.organization_name.clone(),
        ),
        None => Default::default(),
    };

    MergedRow {
        item_name,
        quantity: inv.quantity,
        unit: inv.unit.clone().unwrap_or_default(),
        new_drug_code,
        expiry_date: inv.expiry_date,
        lot_number: inv.lot_number.clone(),
        corporate_name,
        organization_name,
    }
}

/// Project, drop rows without an item name/spec, then stable-sort by
/// (corporate name, organization name) in ordinal order.
pub fn finalize(joined: &[JoinedRow], config: &FinalizeConfig) -> FinalizeOutput {
    let mut out = FinalizeOutput::default();

    for row in joined {
        let mut merged = project(row);
        if merged.item_name.trim().is_empty() {
            if config.item_name_fallback {
                merged.item_name = row.inventory.drug_name.clone();
                out.item_name_fallbacks += 1;
            } else {
                out.dropped_blank_item += 1;
                continue;
            }
        }
        out.rows.push(merged);
    }

    // Vec::sort_by is stable: ties keep merge order.
    out.rows.sort_by(|a, b| {
        (a.corporate_name.as_str(), a.organization_name.as_str())
            .cmp(&(b.corporate_name.as_str(), b.organization_name.as_str()))
    });

    if out.dropped_blank_item > 0 {
        log::debug!(
            "finalize: dropped {} rows with blank item name/spec",
            out.dropped_blank_item
        );
    }
    out
}
