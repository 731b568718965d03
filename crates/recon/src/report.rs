//! Summary totals, breakdowns and the detail table built from reconciled rows.

use std::collections::{BTreeMap, HashMap};

use crate::amount::Amount;
use crate::config::JoinMode;
use crate::error::ReconError;
use crate::model::{
    BreakdownRow, CollectionRecord, ReconStatus, ReconciledRow, Report, ReportMeta, ReportSummary,
    ShortCodeTotal,
};
use crate::normalize::BankCredits;

/// Record counts and bank figures that are not visible in the joined rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCounts {
    pub collection_records: usize,
    pub settlement_records: usize,
    pub bank_records: usize,
    pub bank_rows_excluded: usize,
    /// Sum of filtered bank credits; `None` when no bank data was supplied.
    pub bank_credit_total: Option<Amount>,
}

impl SourceCounts {
    pub fn with_bank(mut self, bank: Option<&BankCredits>) -> Result<Self, ReconError> {
        if let Some(bank) = bank {
            self.bank_records = bank.records.len();
            self.bank_rows_excluded = bank.excluded;
            self.bank_credit_total = Some(
                Amount::checked_sum(bank.records.iter().map(|r| r.amount))
                    .ok_or_else(|| overflow("bank credit total"))?,
            );
        }
        Ok(self)
    }
}

pub fn build_report(
    meta: ReportMeta,
    rows: Vec<ReconciledRow>,
    collection: &[CollectionRecord],
    counts: SourceCounts,
) -> Result<Report, ReconError> {
    let include_bank = meta.join_mode == JoinMode::ThreeWay;
    let summary = summarize(&rows, counts)?;
    let breakdown = breakdown(&rows, include_bank)?;
    let short_code_summary = short_code_totals(collection)?;

    Ok(Report {
        meta,
        summary,
        breakdown,
        short_code_summary,
        rows,
    })
}

/// Per-source totals, discrepancy totals and status counts.
pub fn summarize(rows: &[ReconciledRow], counts: SourceCounts) -> Result<ReportSummary, ReconError> {
    let mut status_counts: BTreeMap<ReconStatus, usize> = BTreeMap::new();
    let mut collection_total = Amount::ZERO;
    let mut settlement_total = Amount::ZERO;
    let mut absolute_difference = Amount::ZERO;

    for row in rows {
        *status_counts.entry(row.status).or_insert(0) += 1;
        add(&mut collection_total, row.collection_amount, "collection total")?;
        add(&mut settlement_total, row.settlement_amount, "settlement total")?;
        let abs = row
            .difference
            .checked_abs()
            .ok_or_else(|| overflow("absolute difference"))?;
        add(&mut absolute_difference, Some(abs), "absolute difference")?;
    }

    let net_difference = collection_total
        .checked_sub(settlement_total)
        .ok_or_else(|| overflow("net difference"))?;

    Ok(ReportSummary {
        collection_total,
        settlement_total,
        bank_credit_total: counts.bank_credit_total,
        net_difference,
        absolute_difference,
        totals_match: net_difference.is_zero(),
        collection_records: counts.collection_records,
        settlement_records: counts.settlement_records,
        bank_records: counts.bank_records,
        bank_rows_excluded: counts.bank_rows_excluded,
        total_rows: rows.len(),
        status_counts,
    })
}

/// Reconciled rows grouped by their secondary dimension, first-appearance order.
pub fn breakdown(rows: &[ReconciledRow], include_bank: bool) -> Result<Vec<BreakdownRow>, ReconError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<BreakdownRow> = Vec::new();

    for row in rows {
        let i = *index.entry(row.group.as_str()).or_insert_with(|| {
            out.push(BreakdownRow {
                group: row.group.clone(),
                collection_amount: Amount::ZERO,
                settlement_amount: Amount::ZERO,
                bank_amount: include_bank.then_some(Amount::ZERO),
                difference: Amount::ZERO,
                rows: 0,
                discrepancies: 0,
            });
            out.len() - 1
        });

        let group = &mut out[i];
        add(&mut group.collection_amount, row.collection_amount, "breakdown collection amount")?;
        add(&mut group.settlement_amount, row.settlement_amount, "breakdown settlement amount")?;
        if let Some(bank) = group.bank_amount.as_mut() {
            add(bank, row.bank_amount, "breakdown bank amount")?;
        }
        add(&mut group.difference, Some(row.difference), "breakdown difference")?;
        group.rows += 1;
        if row.status != ReconStatus::Matched {
            group.discrepancies += 1;
        }
    }

    Ok(out)
}

/// Collection total per short code, ordered by code.
pub fn short_code_totals(records: &[CollectionRecord]) -> Result<Vec<ShortCodeTotal>, ReconError> {
    let mut groups: BTreeMap<&str, (Amount, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.short_code.as_str()).or_insert((Amount::ZERO, 0));
        add(&mut entry.0, Some(record.amount), "short code total")?;
        entry.1 += 1;
    }

    Ok(groups
        .into_iter()
        .map(|(code, (amount, records))| ShortCodeTotal {
            short_code: code.to_string(),
            amount,
            records,
        })
        .collect())
}

/// Add a possibly-missing amount into `acc`; a missing side counts as zero.
fn add(acc: &mut Amount, amount: Option<Amount>, what: &str) -> Result<(), ReconError> {
    *acc = acc
        .checked_add(amount.unwrap_or(Amount::ZERO))
        .ok_or_else(|| overflow(what))?;
    Ok(())
}

fn overflow(what: &str) -> ReconError {
    ReconError::AmountOverflow(what.to_string())
}
