use std::path::PathBuf;

use sdo_recon::aggregate::aggregate_by_mode;
use sdo_recon::config::{JoinMode, KeyMode, ReconConfig};
use sdo_recon::engine::run;
use sdo_recon::model::{RawBatch, ReconInput, ReconStatus, Report, SourceKind};
use sdo_recon::normalize::Normalizer;
use sdo_recon::source::{load_csv_batch, load_input};
use sdo_recon::Amount;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_and_run(config_file: &str) -> Report {
    let dir = fixtures_dir();
    let toml = std::fs::read_to_string(dir.join(config_file)).unwrap();
    let config = ReconConfig::from_toml(&toml).unwrap();
    let input = load_input(&config, &dir).unwrap();
    run(&config, &input).unwrap()
}

fn rupees(value: &str) -> Amount {
    Amount::parse(value, 100).unwrap()
}

fn status_of(report: &Report, key: &str) -> ReconStatus {
    report
        .rows
        .iter()
        .find(|r| r.key.as_str() == key)
        .unwrap_or_else(|| panic!("no row for {key}"))
        .status
}

fn batch(name: &str, headers: &[&str], rows: &[&[&str]]) -> RawBatch {
    RawBatch {
        name: name.into(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

const INLINE_CONFIG: &str = r#"
name = "Inline"

[sources.collection.columns]
identifier = "Consumer No"
amount = "Amount"

[sources.settlement.columns]
identifier = "Consumer No"
amount = "Amount"

[sources.bank.columns]
description = "Narration"
amount = "Credit"
"#;

fn inline_run(collection: &[&[&str]], settlement: &[&[&str]]) -> Report {
    let config = ReconConfig::from_toml(INLINE_CONFIG).unwrap();
    let headers = &["Consumer No", "Amount"];
    let input = ReconInput {
        collection: vec![batch("sdo.csv", headers, collection)],
        settlement: vec![batch("billdesk.csv", headers, settlement)],
        bank: Vec::new(),
    };
    run(&config, &input).unwrap()
}

// -------------------------------------------------------------------------
// Identifier + bill, two-way
// -------------------------------------------------------------------------

#[test]
fn headwise_two_way() {
    let report = load_and_run("headwise.recon.toml");

    assert_eq!(report.meta.key_mode, KeyMode::IdentifierBill);
    assert_eq!(report.meta.join_mode, JoinMode::TwoWay);

    let s = &report.summary;
    assert_eq!(s.total_rows, 8);
    assert_eq!(s.collection_records, 8);
    assert_eq!(s.settlement_records, 7);
    assert_eq!(s.collection_total, rupees("3730"));
    assert_eq!(s.settlement_total, rupees("3255"));
    assert_eq!(s.net_difference, rupees("475"));
    assert_eq!(s.absolute_difference, rupees("625"));
    assert!(!s.totals_match);
    assert_eq!(s.bank_credit_total, Some(rupees("2790")));
    assert_eq!(s.bank_rows_excluded, 2);

    assert_eq!(s.status_counts[&ReconStatus::Matched], 5);
    assert_eq!(s.status_counts[&ReconStatus::MissingInSettlement], 1);
    assert_eq!(s.status_counts[&ReconStatus::AmountMismatch], 1);
    assert_eq!(s.status_counts[&ReconStatus::MissingInCollection], 1);

    assert_eq!(status_of(&report, "110|1101000001|K1"), ReconStatus::Matched);
    assert_eq!(status_of(&report, "110|1101000002|K2"), ReconStatus::MissingInSettlement);
    assert_eq!(status_of(&report, "111|1111000003|K3"), ReconStatus::AmountMismatch);
    assert_eq!(status_of(&report, "220|2201000004|K4"), ReconStatus::Matched);
    assert_eq!(status_of(&report, "990|9901000009|K9"), ReconStatus::MissingInCollection);

    // first-appearance order: both SDO files, then settlement-only keys
    let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys.first(), Some(&"110|1101000001|K1"));
    assert_eq!(keys.last(), Some(&"990|9901000009|K9"));
}

#[test]
fn headwise_breakdowns() {
    let report = load_and_run("headwise.recon.toml");

    let codes: Vec<(&str, Amount, usize)> = report
        .short_code_summary
        .iter()
        .map(|t| (t.short_code.as_str(), t.amount, t.records))
        .collect();
    assert_eq!(
        codes,
        vec![
            ("110", rupees("1580"), 3),
            ("111", rupees("300"), 1),
            ("220", rupees("1850"), 4),
        ]
    );

    let groups: Vec<&str> = report.breakdown.iter().map(|g| g.group.as_str()).collect();
    assert_eq!(groups, vec!["110", "111", "220", "990"]);
    let south = &report.breakdown[2];
    assert_eq!(south.collection_amount, rupees("1850"));
    assert_eq!(south.settlement_amount, rupees("1850"));
    assert_eq!(south.discrepancies, 0);
}

// -------------------------------------------------------------------------
// Date, three-way
// -------------------------------------------------------------------------

#[test]
fn daily_three_way() {
    let report = load_and_run("daily.recon.toml");
    let s = &report.summary;

    assert_eq!(s.total_rows, 5);
    assert_eq!(s.collection_total, rupees("3730"));
    assert_eq!(s.settlement_total, rupees("3255"));
    assert_eq!(s.bank_credit_total, Some(rupees("2790")));

    let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["2026-03-01", "2026-03-02", "2026-03-05", "2026-03-04", "2026-03-03"]
    );

    let row = |key: &str| report.rows.iter().find(|r| r.key.as_str() == key).unwrap();

    assert_eq!(row("2026-03-01").status, ReconStatus::AmountMismatch);
    assert_eq!(row("2026-03-01").difference, rupees("500"));

    let mar2 = row("2026-03-02");
    assert_eq!(mar2.status, ReconStatus::AmountMismatch);
    assert_eq!(mar2.collection_amount, Some(rupees("1750")));
    assert_eq!(mar2.settlement_amount, Some(rupees("1775")));
    assert_eq!(mar2.bank_amount, Some(rupees("1700")));
    assert_eq!(mar2.difference, rupees("-25"));

    assert_eq!(row("2026-03-05").status, ReconStatus::Matched);
    assert_eq!(row("2026-03-04").status, ReconStatus::MissingInBank);

    let mar3 = row("2026-03-03");
    assert_eq!(mar3.status, ReconStatus::MissingInCollection);
    assert_eq!(mar3.difference, Amount::ZERO);

    assert_eq!(report.breakdown.len(), 5);
    assert_eq!(report.breakdown[0].bank_amount, Some(rupees("1000")));
}

#[test]
fn modes_agree_on_collection_settlement_gaps() {
    let dir = fixtures_dir();
    let toml = std::fs::read_to_string(dir.join("daily.recon.toml")).unwrap();
    let three = ReconConfig::from_toml(&toml).unwrap();
    let two = ReconConfig::from_toml(&toml.replace("three_way", "two_way")).unwrap();
    let input = load_input(&three, &dir).unwrap();

    let r3 = run(&three, &input).unwrap();
    let r2 = run(&two, &input).unwrap();

    for row in &r2.rows {
        if matches!(row.status, ReconStatus::MissingInCollection | ReconStatus::MissingInSettlement) {
            assert_eq!(status_of(&r3, row.key.as_str()), row.status);
        }
    }
    assert_eq!(r2.summary.total_rows, 4);
    assert_eq!(status_of(&r2, "2026-03-04"), ReconStatus::Matched);
}

#[test]
fn three_way_without_bank_batches() {
    let dir = fixtures_dir();
    let toml = std::fs::read_to_string(dir.join("daily.recon.toml")).unwrap();
    let config = ReconConfig::from_toml(&toml).unwrap();
    let mut input = load_input(&config, &dir).unwrap();
    input.bank.clear();
    let err = run(&config, &input).unwrap_err();
    assert_eq!(err.kind(), "config_error");
}

#[test]
fn repeated_runs_identical_rows() {
    let a = load_and_run("headwise.recon.toml");
    let b = load_and_run("headwise.recon.toml");
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.summary, b.summary);
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn scenario_a_matched() {
    let report = inline_run(&[&["K1", "1000"]], &[&["K1", "1000"]]);
    let row = &report.rows[0];
    assert_eq!(row.status, ReconStatus::Matched);
    assert_eq!(row.difference, Amount::ZERO);
}

#[test]
fn scenario_b_missing_in_settlement() {
    let report = inline_run(&[&["K2", "500"]], &[]);
    let row = &report.rows[0];
    assert_eq!(row.status, ReconStatus::MissingInSettlement);
    assert_eq!(row.settlement_amount, None);
    assert_eq!(row.difference, rupees("500"));
}

#[test]
fn scenario_c_amount_mismatch() {
    let report = inline_run(&[&["K3", "300"]], &[&["K3", "250"]]);
    let row = &report.rows[0];
    assert_eq!(row.status, ReconStatus::AmountMismatch);
    assert_eq!(row.difference, rupees("50"));
}

#[test]
fn scenario_d_duplicates_summed_before_reconciliation() {
    let config = ReconConfig::from_toml(INLINE_CONFIG).unwrap();
    let b = batch("sdo.csv", &["Consumer No", "Amount"], &[&["K4", "100"], &["K4", "150"]]);
    let records = Normalizer::new(&config).collection(&[b]).unwrap();
    let rows = aggregate_by_mode(SourceKind::Collection, &records, KeyMode::IdentifierBill).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].summed_amount, rupees("250"));

    let report = inline_run(&[&["K4", "100"], &["K4", "150"]], &[&["K4", "250"]]);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].status, ReconStatus::Matched);
}

#[test]
fn scenario_e_bank_filter() {
    let config = ReconConfig::from_toml(INLINE_CONFIG).unwrap();
    let headers = &["Consumer No", "Amount"];
    let input = ReconInput {
        collection: vec![batch("sdo.csv", headers, &[&["K1", "1000"]])],
        settlement: vec![batch("billdesk.csv", headers, &[&["K1", "1000"]])],
        bank: vec![batch(
            "bank.csv",
            &["Narration", "Credit"],
            &[&["ACH TRANSFER XYZ", "400"], &["PAYMENT VIA INDIAIDEAS.COM", "1000"]],
        )],
    };
    let report = run(&config, &input).unwrap();
    assert_eq!(report.summary.bank_credit_total, Some(rupees("1000")));
    assert_eq!(report.summary.bank_records, 1);
    assert_eq!(report.summary.bank_rows_excluded, 1);
}

#[test]
fn report_serializes_minor_units() {
    let report = inline_run(&[&["K2", "500.25"]], &[]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["rows"][0]["collection_amount"], 50025);
    assert!(json["rows"][0]["settlement_amount"].is_null());
    assert_eq!(json["rows"][0]["status"], "missing_in_settlement");
    assert_eq!(json["summary"]["status_counts"]["missing_in_settlement"], 1);
    assert_eq!(json["meta"]["amount_unit_scale"], 100);
}

#[test]
fn error_row_counts_blank_lines() {
    let config = ReconConfig::from_toml(INLINE_CONFIG).unwrap();
    let collection = load_csv_batch("sdo.csv", "Consumer No,Amount\n1101,5\n,\n1102,abc\n", true).unwrap();
    let settlement = load_csv_batch("billdesk.csv", "Consumer No,Amount\n1101,5\n", true).unwrap();
    let input = ReconInput {
        collection: vec![collection],
        settlement: vec![settlement],
        bank: Vec::new(),
    };
    let err = run(&config, &input).unwrap_err();
    assert_eq!(err.kind(), "schema_error");
    assert_eq!(
        err.to_string(),
        "collection 'sdo.csv' row 3: cannot parse amount 'abc' in field 'amount'"
    );
}

#[test]
fn overflowing_collection_total_is_schema_error() {
    let config = ReconConfig::from_toml(INLINE_CONFIG).unwrap();
    let headers = &["Consumer No", "Amount"];
    let input = ReconInput {
        collection: vec![batch(
            "sdo.csv",
            headers,
            &[&["K1", "90000000000000000"], &["K2", "90000000000000000"]],
        )],
        settlement: vec![batch("billdesk.csv", headers, &[])],
        bank: Vec::new(),
    };
    let err = run(&config, &input).unwrap_err();
    assert_eq!(err.kind(), "schema_error");
    assert!(err.to_string().contains("amount overflow"), "{err}");
}
