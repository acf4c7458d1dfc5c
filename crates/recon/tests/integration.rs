use std::path::PathBuf;

use stockback_recon::config::ReconConfig;
use stockback_recon::model::PipelineInput;
use stockback_recon::sink::{MemorySink, ResultSink};
use stockback_recon::validate::{DropReason, ValidationStep};
use stockback_recon::{run, PipelineOutput, Table, TableKind};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(kind: TableKind, file: &str, skip_rows: usize) -> Table {
    let path = fixtures_dir().join(file);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    Table::from_csv_str(kind, &text, skip_rows).unwrap()
}

fn fixture_input() -> PipelineInput {
    PipelineInput {
        inventory: load(TableKind::Inventory, "inventory.csv", 7),
        purchase_history: load(TableKind::PurchaseHistory, "purchase_history.csv", 0),
        code_mapping: load(TableKind::CodeMapping, "code_map.csv", 0),
    }
}

fn run_fixtures(config: &ReconConfig) -> PipelineOutput {
    run(config, &fixture_input()).unwrap()
}

// -------------------------------------------------------------------------
// Validation
// -------------------------------------------------------------------------

#[test]
fn preamble_is_skipped() {
    let input = fixture_input();
    assert_eq!(input.inventory.headers, vec!["薬品名", "在庫量", "使用期限", "ロット番号"]);
    assert_eq!(input.inventory.row_count(), 8);
}

#[test]
fn blank_line_in_preamble_counts_as_a_line() {
    let input = PipelineInput {
        inventory: load(TableKind::Inventory, "inventory_blank_preamble.csv", 7),
        ..fixture_input()
    };
    assert_eq!(input.inventory.headers, vec!["薬品名", "在庫量", "使用期限", "ロット番号"]);
    assert_eq!(input.inventory.row_count(), 2);

    let out = run(&ReconConfig::default(), &input).unwrap();
    assert_eq!(out.summary.validated_rows, 2);
    assert_eq!(out.rows.len(), 3);
}

#[test]
fn invalid_rows_are_dropped_per_step() {
    let out = run_fixtures(&ReconConfig::default());

    let name = out.validation.step(ValidationStep::DrugName).unwrap();
    let qty = out.validation.step(ValidationStep::Quantity).unwrap();
    let date = out.validation.step(ValidationStep::ExpiryDate).unwrap();

    assert_eq!((name.rows_in, name.rows_out), (8, 7));
    assert_eq!((qty.rows_in, qty.rows_out), (7, 4));
    assert_eq!((date.rows_in, date.rows_out), (4, 3));

    assert_eq!(name.dropped[0].source_row, 5);
    let qty_reasons: Vec<&DropReason> = qty.dropped.iter().map(|d| &d.reason).collect();
    assert_eq!(
        qty_reasons,
        vec![
            &DropReason::NonPositiveQuantity { value: "0".into() },
            &DropReason::NonPositiveQuantity { value: "-5".into() },
            &DropReason::NonNumericQuantity { value: "abc".into() },
        ]
    );
    assert_eq!(date.dropped[0].source_row, 6);

    assert_eq!(out.summary.validated_rows, 3);
    assert_eq!(out.validation.total_dropped(), 5);
}

// -------------------------------------------------------------------------
// Merge / finalize
// -------------------------------------------------------------------------

#[test]
fn duplicate_code_fans_out_and_result_is_sorted() {
    let out = run_fixtures(&ReconConfig::default());

    // Aspirin (1) + Loxonin fanned out to two organizations (2) + unmatched (1)
    assert_eq!(out.summary.merged_rows, 4);
    assert_eq!(out.summary.fanout_rows, 1);
    assert_eq!(out.summary.ambiguous_codes, vec!["YJ002".to_string()]);
    assert_eq!(out.summary.unmatched_rows, 1);
    assert!(out.summary.merged_rows >= out.summary.validated_rows);

    // The unmatched row has no item name and is dropped.
    assert_eq!(out.summary.dropped_blank_item, 1);
    let keys: Vec<(&str, &str, &str)> = out
        .rows
        .iter()
        .map(|r| (r.corporate_name.as_str(), r.organization_name.as_str(), r.item_name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Beta Health", "ClinicB", "Loxonin 60mg"),
            ("Corp", "ClinicA", "Aspirin 100mg"),
            ("Corp", "ClinicA", "Loxonin 60mg"),
        ]
    );
    assert_eq!(out.rows[1].unit, "mg");
    assert_eq!(out.rows[2].unit, "錠");
}

#[test]
fn empty_mapping_with_fallback_keeps_rows() {
    let mut input = fixture_input();
    input.code_mapping = Table::empty(TableKind::CodeMapping);

    let mut config = ReconConfig::default();
    config.finalize.item_name_fallback = true;
    let out = run(&config, &input).unwrap();

    assert_eq!(out.summary.code_mapping_entries, 0);
    assert_eq!(out.summary.unresolved_rows, 3);
    assert_eq!(out.rows.len(), 3);
    for row in &out.rows {
        assert_eq!(row.unit, "");
        assert_eq!(row.new_drug_code, "");
        assert_eq!(row.organization_name, "");
    }
    let names: Vec<&str> = out.rows.iter().map(|r| r.item_name.as_str()).collect();
    assert_eq!(names, vec!["Aspirin", "Loxonin", "Unknown Drug"]);
    // No organization, so no sheet.
    assert!(out.report.is_empty());
    assert_eq!(out.report.unassigned_rows, 3);
}

#[test]
fn empty_mapping_without_fallback_yields_empty_result() {
    let mut input = fixture_input();
    input.code_mapping = Table::empty(TableKind::CodeMapping);
    let out = run(&ReconConfig::default(), &input).unwrap();
    assert!(out.rows.is_empty());
    assert!(out.report.is_empty());
}

#[test]
fn purchase_history_without_optional_columns() {
    let mut input = fixture_input();
    input.purchase_history = Table::from_csv_str(
        TableKind::PurchaseHistory,
        "厚労省CD,院所名,品名・規格\nYJ001,ClinicA,Aspirin 100mg\n",
        0,
    )
    .unwrap();
    let out = run(&ReconConfig::default(), &input).unwrap();

    assert_eq!(out.summary.synthesized_columns, vec!["法人名".to_string(), "新薬品ｺｰﾄﾞ".to_string()]);
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rows[0].corporate_name, "");
    assert_eq!(out.report.sheets[0].header.addressee_line(), "ClinicA 御中");
}

// -------------------------------------------------------------------------
// Partition
// -------------------------------------------------------------------------

#[test]
fn one_sheet_per_organization() {
    let out = run_fixtures(&ReconConfig::default());
    let names: Vec<&str> = out.report.sheets.iter().map(|s| s.sheet_name.as_str()).collect();
    assert_eq!(names, vec!["ClinicB", "ClinicA"]);

    let clinic_a = &out.report.sheets[1];
    assert_eq!(clinic_a.header.addressee_line(), "Corp ClinicA 御中");
    assert_eq!(clinic_a.rows.len(), 2);
    assert_eq!(clinic_a.captions[6], "引取り可能数");

    // Every finalized row with an organization lands on exactly one sheet.
    let rendered: usize = out.report.sheets.iter().map(|s| s.rows.len()).sum();
    assert_eq!(rendered, out.rows.len());
}

#[test]
fn truncated_names_collide() {
    let long = "Municipal General Hospital of the Northern District";
    let history = format!(
        "厚労省CD,法人名,院所名,品名・規格,新薬品ｺｰﾄﾞ\n\
         YJ001,Corp,{long} East,Aspirin 100mg,N001\n\
         YJ001,Corp,{long} West,Aspirin 100mg,N001\n"
    );
    let mut input = fixture_input();
    input.purchase_history = Table::from_csv_str(TableKind::PurchaseHistory, &history, 0).unwrap();

    let out = run(&ReconConfig::default(), &input).unwrap();
    assert_eq!(out.report.sheets.len(), 2);
    assert_eq!(out.report.sheets[0].sheet_name, out.report.sheets[1].sheet_name);
    assert_eq!(out.report.sheets[0].sheet_name.chars().count(), 31);
    assert_ne!(out.report.sheets[0].key, out.report.sheets[1].key);
    assert_eq!(out.summary.sheet_name_collisions, 1);
}

// -------------------------------------------------------------------------
// Sink
// -------------------------------------------------------------------------

#[test]
fn finalized_rows_reach_the_sink_in_order() {
    let out = run_fixtures(&ReconConfig::default());
    let mut sink = MemorySink::default();
    assert_eq!(sink.save(&out.rows).unwrap(), 3);
    assert_eq!(sink.rows, out.rows);
}

#[test]
fn summary_serializes() {
    let out = run_fixtures(&ReconConfig::default());
    let json = serde_json::to_value(&out.summary).unwrap();
    assert_eq!(json["finalized_rows"], 3);
    assert_eq!(json["sheets_planned"], 2);
    assert!(json["meta"]["run_at"].is_string());
}
