// End-to-end tests for the sdorecon binary against the recon crate's fixtures.

use std::path::PathBuf;
use std::process::Command;

fn sdorecon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sdorecon"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn validate_ok() {
    let output = sdorecon()
        .args(["validate", &fixture("headwise.recon.toml")])
        .output()
        .expect("sdorecon validate");
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SDO Headwise: ok"), "stderr: {stderr}");
}

#[test]
fn run_with_discrepancies_exits_1() {
    let output = sdorecon()
        .args(["run", &fixture("headwise.recon.toml")])
        .output()
        .expect("sdorecon run");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "stdout without --json should be empty");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("collection total"), "stderr: {stderr}");
    assert!(stderr.contains("short-code summary"), "stderr: {stderr}");
    assert!(!stderr.contains("error:"), "discrepancies are not an error: {stderr}");
}

#[test]
fn run_json_is_single_value() {
    let output = sdorecon()
        .args(["run", &fixture("daily.recon.toml"), "--json"])
        .output()
        .expect("sdorecon run --json");
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{stdout}"));
    assert_eq!(val["meta"]["key_mode"], "date");
    assert_eq!(val["meta"]["join_mode"], "three_way");
    assert_eq!(val["rows"].as_array().map(|r| r.len()), Some(5));
    assert_eq!(val["summary"]["status_counts"]["missing_in_bank"], 1);
}

#[test]
fn run_writes_output_and_detail_csv() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("report.json");
    let csv_path = dir.path().join("detail.csv");

    let output = sdorecon()
        .args([
            "run",
            &fixture("headwise.recon.toml"),
            "--output",
            json_path.to_str().unwrap(),
            "--detail-csv",
            csv_path.to_str().unwrap(),
            "--status",
            "matched",
        ])
        .output()
        .expect("sdorecon run --output");
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["total_rows"], 8);

    let detail = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = detail.lines().collect();
    assert_eq!(lines.len(), 6, "header plus five matched rows:\n{detail}");
    assert!(lines[1..].iter().all(|l| l.ends_with(",matched")));
}

#[test]
fn bad_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(
        &config,
        r#"
name = "bad"
key_mode = "identifier_bill"
join_mode = "three_way"

[sources.collection.columns]
identifier = "A"
amount = "B"

[sources.settlement.columns]
identifier = "A"
amount = "B"
"#,
    )
    .unwrap();

    let output = sdorecon()
        .args(["validate", config.to_str().unwrap()])
        .output()
        .expect("sdorecon validate");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config_error"), "stderr: {stderr}");
}

#[test]
fn missing_extract_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("missing.recon.toml");
    std::fs::write(
        &config,
        r#"
name = "missing"

[sources.collection]
files = ["nope.csv"]
[sources.collection.columns]
identifier = "A"
amount = "B"

[sources.settlement]
files = ["nope.csv"]
[sources.settlement.columns]
identifier = "A"
amount = "B"
"#,
    )
    .unwrap();

    let output = sdorecon()
        .args(["run", config.to_str().unwrap()])
        .output()
        .expect("sdorecon run");
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn unknown_status_is_usage_error() {
    let output = sdorecon()
        .args(["run", &fixture("headwise.recon.toml"), "--status", "bogus"])
        .output()
        .expect("sdorecon run --status bogus");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_exits_0_and_bad_args_exit_2() {
    let output = sdorecon().arg("--help").output().expect("sdorecon --help");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("validate"));

    let output = sdorecon().arg("reconcile").output().expect("sdorecon reconcile");
    assert_eq!(output.status.code(), Some(2));
    assert!(!output.stderr.is_empty());
}
