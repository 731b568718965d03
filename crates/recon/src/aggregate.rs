use std::collections::HashMap;

use crate::amount::Amount;
use crate::config::KeyMode;
use crate::error::ReconError;
use crate::key::build_key;
use crate::model::{AggregatedRow, CanonicalRecord, ReconKey, SourceKind};

/// Group records by key and sum amounts.
///
/// One row per distinct key, in order of each key's first occurrence.
/// Repeated keys are summed, never dropped: two collections against the
/// same bill in one batch are both real money.
pub fn aggregate_records<R: CanonicalRecord, F>(
    source: SourceKind,
    records: &[R],
    key_fn: F,
) -> Result<Vec<AggregatedRow>, ReconError>
where
    F: Fn(&R) -> Result<ReconKey, ReconError>,
{
    let mut index: HashMap<ReconKey, usize> = HashMap::new();
    let mut rows: Vec<AggregatedRow> = Vec::new();

    for record in records {
        let key = key_fn(record)?;
        match index.get(&key) {
            Some(&i) => {
                let row = &mut rows[i];
                row.summed_amount = row
                    .summed_amount
                    .checked_add(record.amount())
                    .ok_or_else(|| {
                        ReconError::AmountOverflow(format!(
                            "{}: sum for key '{}'",
                            record.location(),
                            row.key
                        ))
                    })?;
                row.record_count += 1;
            }
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(AggregatedRow {
                    source,
                    key,
                    summed_amount: record.amount(),
                    record_count: 1,
                });
            }
        }
    }

    Ok(rows)
}

/// [`aggregate_records`] keyed by [`build_key`] under `mode`.
pub fn aggregate_by_mode<R: CanonicalRecord>(
    source: SourceKind,
    records: &[R],
    mode: KeyMode,
) -> Result<Vec<AggregatedRow>, ReconError> {
    aggregate_records(source, records, |r| build_key(r, mode))
}

pub fn total(source: SourceKind, rows: &[AggregatedRow]) -> Result<Amount, ReconError> {
    Amount::checked_sum(rows.iter().map(|r| r.summed_amount))
        .ok_or_else(|| ReconError::AmountOverflow(format!("{source} total")))
}
