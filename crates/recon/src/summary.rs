use serde::Serialize;

use crate::finalize::FinalizeOutput;
use crate::merge::MergeStats;
use crate::partition::Report;
use crate::validate::{ValidationReport, ValidationStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Row counts for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub meta: RunMeta,
    pub inventory_rows: usize,
    pub dropped_blank_drug_name: usize,
    pub dropped_quantity: usize,
    pub dropped_expiry_date: usize,
    pub validated_rows: usize,
    pub code_mapping_entries: usize,
    pub purchase_history_rows: usize,
    pub synthesized_columns: Vec<String>,
    pub unresolved_rows: usize,
    pub unmatched_rows: usize,
    pub fanout_rows: usize,
    pub ambiguous_codes: Vec<String>,
    pub merged_rows: usize,
    pub dropped_blank_item: usize,
    pub item_name_fallbacks: usize,
    pub finalized_rows: usize,
    pub sheets_planned: usize,
    pub groups_skipped: usize,
    pub unassigned_rows: usize,
    pub sheet_name_collisions: usize,
}

/// Counts gathered from each stage's output.
pub struct StageCounts<'a> {
    pub inventory_rows: usize,
    pub validation: &'a ValidationReport,
    pub code_mapping_entries: usize,
    pub purchase_history_rows: usize,
    pub synthesized_columns: &'a [String],
    pub merge: &'a MergeStats,
    pub finalize: &'a FinalizeOutput,
    pub report: &'a Report,
}

pub fn compute_summary(meta: RunMeta, counts: StageCounts<'_>) -> RunSummary {
    let dropped = |step| {
        counts
            .validation
            .step(step)
            .map(|s| s.dropped.len())
            .unwrap_or(0)
    };

    RunSummary {
        meta,
        inventory_rows: counts.inventory_rows,
        dropped_blank_drug_name: dropped(ValidationStep::DrugName),
        dropped_quantity: dropped(ValidationStep::Quantity),
        dropped_expiry_date: dropped(ValidationStep::ExpiryDate),
        validated_rows: counts.merge.inventory_rows,
        code_mapping_entries: counts.code_mapping_entries,
        purchase_history_rows: counts.purchase_history_rows,
        synthesized_columns: counts.synthesized_columns.to_vec(),
        unresolved_rows: counts.merge.unresolved,
        unmatched_rows: counts.merge.unmatched,
        fanout_rows: counts.merge.fanout_rows,
        ambiguous_codes: counts.merge.ambiguous_codes.clone(),
        merged_rows: counts.merge.merged_rows,
        dropped_blank_item: counts.finalize.dropped_blank_item,
        item_name_fallbacks: counts.finalize.item_name_fallbacks,
        finalized_rows: counts.finalize.rows.len(),
        sheets_planned: counts.report.sheets.len(),
        groups_skipped: counts.report.skipped.len(),
        unassigned_rows: counts.report.unassigned_rows,
        sheet_name_collisions: counts.report.name_collisions().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{DropReason, DroppedRow, StepReport};

    #[test]
    fn summary_counts() {
        let validation = ValidationReport {
            steps: vec![
                StepReport {
                    step: ValidationStep::DrugName,
                    rows_in: 5,
                    rows_out: 4,
                    dropped: vec![DroppedRow { source_row: 2, reason: DropReason::BlankDrugName }],
                },
                StepReport {
                    step: ValidationStep::Quantity,
                    rows_in: 4,
                    rows_out: 2,
                    dropped: vec![
                        DroppedRow { source_row: 0, reason: DropReason::MissingQuantity },
                        DroppedRow {
                            source_row: 3,
                            reason: DropReason::NonPositiveQuantity { value: "0".into() },
                        },
                    ],
                },
            ],
        };
        let merge = MergeStats {
            inventory_rows: 2,
            merged_rows: 3,
            unresolved: 0,
            unmatched: 0,
            fanout_rows: 1,
            ambiguous_codes: vec!["YJ001".into()],
        };
        let finalize = FinalizeOutput::default();
        let report = Report::default();
        let summary = compute_summary(
            RunMeta { engine_version: "0.0.0".into(), run_at: "now".into() },
            StageCounts {
                inventory_rows: 5,
                validation: &validation,
                code_mapping_entries: 1,
                purchase_history_rows: 2,
                synthesized_columns: &[],
                merge: &merge,
                finalize: &finalize,
                report: &report,
            },
        );
        assert_eq!(summary.dropped_blank_drug_name, 1);
        assert_eq!(summary.dropped_quantity, 2);
        assert_eq!(summary.dropped_expiry_date, 0);
        assert_eq!(summary.validated_rows, 2);
        assert_eq!(summary.merged_rows, 3);
        assert_eq!(summary.fanout_rows, 1);
        assert_eq!(summary.sheets_planned, 0);
    }
}
