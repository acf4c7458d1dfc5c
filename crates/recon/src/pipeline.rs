use crate::config::ReconConfig;
use crate::error::{ReconError, TableKind};
use crate::finalize::finalize;
use crate::merge::{ingest_purchase_history, merge};
use crate::model::{MergedRow, PipelineInput};
use crate::partition::{partition, Report};
use crate::resolver::CodeMapping;
use crate::summary::{compute_summary, RunMeta, RunSummary, StageCounts};
use crate::table::Table;
use crate::validate::{normalize_table, validate_inventory, ValidationReport};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Finalized rows, sorted by (corporate name, organization name).
    pub rows: Vec<MergedRow>,
    pub report: Report,
    pub validation: ValidationReport,
    pub summary: RunSummary,
}

/// Run the full pipeline: normalize, resolve, validate, merge, finalize, partition.
///
/// Row-level problems are filtered and counted. Only structural problems
/// (a required column missing, a table handed in the wrong slot) fail the run.
pub fn run(config: &ReconConfig, input: &PipelineInput) -> Result<PipelineOutput, ReconError> {
    check_kind(&input.inventory, TableKind::Inventory)?;
    check_kind(&input.purchase_history, TableKind::PurchaseHistory)?;
    check_kind(&input.code_mapping, TableKind::CodeMapping)?;

    let code_table = normalize_table(&input.code_mapping);
    let history_table = normalize_table(&input.purchase_history);

    let mapping = CodeMapping::build(&code_table, &config.code_mapping)?;
    log::info!("resolve: {} drug names in code mapping", mapping.len());

    let (inventory, validation) = validate_inventory(&input.inventory, &config.inventory)?;
    log::info!(
        "validate: {} of {} inventory rows kept",
        inventory.len(),
        input.inventory.row_count()
    );

    let history = ingest_purchase_history(&history_table, &config.purchase_history)?;
    let merged = merge(&inventory, &mapping, &history.rows);
    log::info!(
        "merge: {} rows ({} unmatched, {} from duplicate codes)",
        merged.stats.merged_rows,
        merged.stats.unmatched,
        merged.stats.fanout_rows
    );

    let finalized = finalize(&merged.rows, &config.finalize);
    log::info!(
        "finalize: {} rows ({} without item name/spec dropped)",
        finalized.rows.len(),
        finalized.dropped_blank_item
    );

    let report = partition(&finalized.rows, &config.report);
    log::info!(
        "partition: {} sheets, {} groups skipped",
        report.sheets.len(),
        report.skipped.len()
    );

    let summary = compute_summary(
        RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        StageCounts {
            inventory_rows: input.inventory.row_count(),
            validation: &validation,
            code_mapping_entries: mapping.len(),
            purchase_history_rows: history.rows.len(),
            synthesized_columns: &history.synthesized_columns,
            merge: &merged.stats,
            finalize: &finalized,
            report: &report,
        },
    );

    Ok(PipelineOutput {
        rows: finalized.rows,
        report,
        validation,
        summary,
    })
}

fn check_kind(table: &Table, expected: TableKind) -> Result<(), ReconError> {
    if table.kind == expected {
        Ok(())
    } else {
        Err(ReconError::TableParse {
            table: expected,
            detail: format!("expected the {expected} table, got {}", table.kind),
        })
    }
}
