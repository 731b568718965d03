//! Detail-table CSV export.

use std::io::Write;

use sdo_recon::model::{ReconStatus, ReconciledRow};
use sdo_recon::{Amount, Report};

const HEADER: [&str; 7] = [
    "key",
    "group",
    "collection_amount",
    "settlement_amount",
    "bank_amount",
    "difference",
    "status",
];

/// Write detail rows (optionally one status only) as CSV, amounts in currency units.
pub fn write_detail_csv<W: Write>(
    out: W,
    report: &Report,
    status: Option<ReconStatus>,
) -> Result<usize, csv::Error> {
    let scale = report.meta.amount_unit_scale;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;

    let mut written = 0;
    for row in selected(report, status) {
        writer.write_record([
            row.key.to_string(),
            row.group.clone(),
            cell(row.collection_amount, scale),
            cell(row.settlement_amount, scale),
            cell(row.bank_amount, scale),
            row.difference.display(scale),
            row.status.to_string(),
        ])?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

pub fn selected(report: &Report, status: Option<ReconStatus>) -> Vec<&ReconciledRow> {
    match status {
        Some(status) => report.with_status(status).collect(),
        None => report.rows.iter().collect(),
    }
}

/// Missing sides stay empty so they never read as a zero amount.
fn cell(amount: Option<Amount>, scale: u32) -> String {
    amount.map(|a| a.display(scale)).unwrap_or_default()
}
