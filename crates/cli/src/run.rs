//! `stockback run` / `stockback check-config`: load the three exports, run the
//! pipeline, write the pickup-request workbook and any requested extras.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use stockback_io::report::RenderSummary;
use stockback_io::{load_table, render_report, CsvResultSink, JsonResultSink, RenderOptions};
use stockback_recon::{PipelineInput, ReconConfig, ResultSink, RunSummary, TableKind};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_INPUT_LOAD, EXIT_INVALID_CONFIG, EXIT_RENDER, EXIT_SINK,
};
use crate::CliError;

pub const DEFAULT_REPORT_PATH: &str = "processed_inventory.xlsx";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dead-stock inventory export (CSV or spreadsheet)
    #[arg(long, value_name = "FILE")]
    pub inventory: PathBuf,

    /// Purchase history of the other organizations (spreadsheet or CSV)
    #[arg(long, value_name = "FILE")]
    pub purchase_history: PathBuf,

    /// Stock-value export mapping drug names to codes and units
    #[arg(long, value_name = "FILE")]
    pub code_map: PathBuf,

    /// Column names and report layout (TOML); defaults apply when omitted
    #[arg(long, env = "STOCKBACK_CONFIG", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Where to write the XLSX report
    #[arg(long, value_name = "XLSX", default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,

    /// Also write the finalized rows as CSV
    #[arg(long, value_name = "PATH")]
    pub result_csv: Option<PathBuf>,

    /// Also write the finalized rows as JSON
    #[arg(long, value_name = "PATH")]
    pub result_json: Option<PathBuf>,

    /// Write the run summary as JSON to a file
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// Print the run summary as JSON to stdout instead of the human summary
    #[arg(long)]
    pub json: bool,
}

/// What `--json` and `--summary` emit.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub render: RenderSummary,
    pub report_path: String,
}

fn err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

pub fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        log::debug!("no config file given, using defaults");
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| err(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display())))?;
    ReconConfig::from_toml(&text).map_err(|e| err(recon_exit_code(&e), e.to_string()))
}

fn load(path: &Path, kind: TableKind, skip_rows: usize) -> Result<stockback_recon::Table, CliError> {
    load_table(path, kind, skip_rows).map_err(|e| {
        err(EXIT_INPUT_LOAD, format!("{kind}: {e}"))
            .with_hint(format!("check that {} is a CSV or spreadsheet export", path.display()))
    })
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let input = PipelineInput {
        inventory: load(&args.inventory, TableKind::Inventory, config.inventory.skip_rows)?,
        purchase_history: load(&args.purchase_history, TableKind::PurchaseHistory, 0)?,
        code_mapping: load(&args.code_map, TableKind::CodeMapping, 0)?,
    };

    let output = stockback_recon::run(&config, &input).map_err(|e| {
        let code = recon_exit_code(&e);
        let cli = err(code, e.to_string());
        match e {
            stockback_recon::ReconError::MissingColumn { .. } => {
                cli.with_hint("column names can be changed in the config file")
            }
            _ => cli,
        }
    })?;

    let rendered = render_report(&output.report, &RenderOptions::from(&config.report))
        .map_err(|e| err(EXIT_RENDER, e.to_string()))?;
    std::fs::write(&args.report, &rendered.bytes).map_err(|e| {
        err(EXIT_RENDER, format!("cannot write report {}: {e}", args.report.display()))
    })?;
    eprintln!("wrote {}", args.report.display());

    if let Some(path) = &args.result_csv {
        save(&mut CsvResultSink::new(path), &output.rows, path)?;
    }
    if let Some(path) = &args.result_json {
        save(&mut JsonResultSink::new(path), &output.rows, path)?;
    }

    let run_output = RunOutput {
        summary: output.summary,
        render: rendered.summary,
        report_path: args.report.display().to_string(),
    };
    let json_str = summary_json(&run_output)?;

    if let Some(path) = &args.summary {
        std::fs::write(path, &json_str)
            .map_err(|e| err(EXIT_SINK, format!("cannot write summary {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    } else {
        for line in summary_lines(&run_output) {
            eprintln!("{line}");
        }
    }

    Ok(())
}

fn save(sink: &mut dyn ResultSink, rows: &[stockback_recon::MergedRow], path: &Path) -> Result<(), CliError> {
    let written = sink.save(rows).map_err(|e| err(recon_exit_code(&e), e.to_string()))?;
    eprintln!("wrote {} ({written} rows)", path.display());
    Ok(())
}

/// Pretty JSON for `--json` / `--summary`. Failure here is internal, not an I/O problem.
pub fn summary_json(output: &RunOutput) -> Result<String, CliError> {
    serde_json::to_string_pretty(output)
        .map_err(|e| err(EXIT_ERROR, format!("JSON serialization error: {e}")))
}

/// Human summary for stderr.
pub fn summary_lines(output: &RunOutput) -> Vec<String> {
    let s = &output.summary;
    let mut lines = vec![
        format!(
            "inventory: {} rows, {} kept ({} blank name, {} bad quantity, {} bad expiry)",
            s.inventory_rows,
            s.validated_rows,
            s.dropped_blank_drug_name,
            s.dropped_quantity,
            s.dropped_expiry_date,
        ),
        format!(
            "merge: {} rows, {} unmatched, {} unresolved, {} from duplicate codes",
            s.merged_rows, s.unmatched_rows, s.unresolved_rows, s.fanout_rows,
        ),
        format!(
            "result: {} rows ({} without item name dropped)",
            s.finalized_rows, s.dropped_blank_item,
        ),
        format!(
            "report: {} sheet(s) written, {} skipped",
            output.render.sheets_rendered,
            output.render.sheets_skipped + s.groups_skipped,
        ),
    ];
    if !s.synthesized_columns.is_empty() {
        lines.push(format!(
            "note: purchase history lacked {}; filled with blanks",
            s.synthesized_columns.join(", ")
        ));
    }
    if s.unassigned_rows > 0 {
        lines.push(format!("note: {} row(s) without an organization name", s.unassigned_rows));
    }
    lines.extend(output.render.lines());
    lines
}

pub fn cmd_check_config(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;
    eprintln!(
        "valid: inventory skips {} line(s); sheet names collide by '{}'",
        config.inventory.skip_rows,
        match config.report.on_sheet_name_collision {
            stockback_recon::config::CollisionPolicy::Overwrite => "overwrite",
            stockback_recon::config::CollisionPolicy::Suffix => "suffix",
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockback_recon::config::ReportConfig;
    use stockback_recon::partition::partition;

    fn run_output() -> RunOutput {
        let config = ReconConfig::default();
        let input = PipelineInput {
            inventory: stockback_recon::Table::empty(TableKind::Inventory),
            purchase_history: stockback_recon::Table::empty(TableKind::PurchaseHistory),
            code_mapping: stockback_recon::Table::empty(TableKind::CodeMapping),
        };
        let inventory = stockback_recon::Table::new(
            TableKind::Inventory,
            vec!["薬品名".into(), "在庫量".into(), "使用期限".into()],
            vec![],
        );
        let output = stockback_recon::run(&config, &PipelineInput { inventory, ..input }).unwrap();
        let report = partition(&[], &ReportConfig::default());
        let rendered = render_report(&report, &RenderOptions::default()).unwrap();
        RunOutput {
            summary: output.summary,
            render: rendered.summary,
            report_path: "out.xlsx".into(),
        }
    }

    #[test]
    fn summary_json_flattens_run_summary() {
        let json = summary_json(&run_output()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["inventory_rows"], 0);
        assert_eq!(value["render"]["empty_placeholder"], true);
        assert_eq!(value["report_path"], "out.xlsx");
    }

    #[test]
    fn summary_lines_mention_empty_report() {
        let lines = summary_lines(&run_output());
        assert!(lines.iter().any(|l| l == "report: 0 sheet(s) written, 0 skipped"), "{lines:?}");
    }
}
