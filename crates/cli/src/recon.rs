//! `sdorecon run` / `sdorecon validate`.

use std::path::{Path, PathBuf};

use sdo_recon::model::ReconStatus;
use sdo_recon::source::load_input;
use sdo_recon::{ReconConfig, ReconError, Report};
use tracing::info;

use crate::exit_codes::{self, EXIT_DISCREPANCIES, EXIT_IO};
use crate::export::{selected, write_detail_csv};
use crate::CliError;

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub detail_csv: Option<PathBuf>,
    pub status: Option<ReconStatus>,
}

fn recon_err(err: ReconError) -> CliError {
    let hint = match (&err, err.location()) {
        (_, Some(at)) => Some(format!("check {} in source '{}'", at.batch, at.source)),
        (ReconError::MissingColumn { .. }, None) => {
            Some("header names are matched exactly; use a column letter or position instead".into())
        }
        _ => None,
    };
    CliError {
        code: exit_codes::for_error(&err),
        message: format!("{}: {err}", err.kind()),
        hint,
    }
}

fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_IO,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    ReconConfig::from_toml(&text).map_err(recon_err)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "{}: ok ({} keys, {} join)",
        config.name, config.key_mode, config.join_mode
    );
    Ok(())
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = read_config(&args.config)?;

    // Resolve file paths relative to config file's directory
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));
    let input = load_input(&config, base_dir).map_err(recon_err)?;
    info!(
        collection_files = input.collection.len(),
        settlement_files = input.settlement.len(),
        bank_files = input.bank.len(),
        "inputs loaded"
    );

    let report = sdo_recon::run(&config, &input).map_err(recon_err)?;

    let json_str = serde_json::to_string_pretty(&report).map_err(|e| CliError {
        code: EXIT_IO,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str).map_err(|e| CliError {
            code: EXIT_IO,
            message: format!("cannot write output: {e}"),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = args.detail_csv {
        let file = std::fs::File::create(path).map_err(|e| CliError {
            code: EXIT_IO,
            message: format!("cannot create {}: {e}", path.display()),
            hint: None,
        })?;
        let rows = write_detail_csv(file, &report, args.status).map_err(|e| CliError {
            code: EXIT_IO,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {} ({rows} rows)", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&report, args.status);

    if report.has_discrepancies() {
        return Err(CliError {
            code: EXIT_DISCREPANCIES,
            message: String::new(),
            hint: None,
        });
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &Report, status: Option<ReconStatus>) {
    let scale = report.meta.amount_unit_scale;
    let s = &report.summary;

    eprintln!(
        "{} ({} keys, {}): {} rows",
        report.meta.config_name, report.meta.key_mode, report.meta.join_mode, s.total_rows,
    );
    eprintln!("  collection total   {:>16}  ({} records)", s.collection_total.display(scale), s.collection_records);
    eprintln!("  settlement total   {:>16}  ({} records)", s.settlement_total.display(scale), s.settlement_records);
    if let Some(bank) = s.bank_credit_total {
        eprintln!(
            "  bank credit total  {:>16}  ({} credits, {} rows excluded)",
            bank.display(scale),
            s.bank_records,
            s.bank_rows_excluded,
        );
    }
    if s.totals_match {
        eprintln!("  collection and settlement totals match");
    } else {
        eprintln!("  discrepancy        {:>16}", s.net_difference.display(scale));
    }
    for (status, count) in &s.status_counts {
        eprintln!("  {:<22} {count}", status.as_str());
    }

    if !report.short_code_summary.is_empty() {
        eprintln!("short-code summary:");
        for t in &report.short_code_summary {
            eprintln!("  {:<8} {:>16}  ({} records)", t.short_code, t.amount.display(scale), t.records);
        }
    }

    if let Some(status) = status {
        eprintln!("{status} rows:");
        for row in selected(report, Some(status)) {
            eprintln!(
                "  {:<32} collection={} settlement={} difference={}",
                row.key.as_str(),
                row.collection_amount.map(|a| a.display(scale)).unwrap_or_else(|| "-".into()),
                row.settlement_amount.map(|a| a.display(scale)).unwrap_or_else(|| "-".into()),
                row.difference.display(scale),
            );
        }
    }
}
