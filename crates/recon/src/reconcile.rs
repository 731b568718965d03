use std::collections::HashMap;

use crate::amount::Amount;
use crate::config::JoinMode;
use crate::error::ReconError;
use crate::model::{AggregatedRow, ReconKey, ReconStatus, ReconciledRow, SourceKind};

/// Full outer join of aggregated rows on key, classifying every joined row.
///
/// Output order: collection keys in input order, then settlement-only keys,
/// then bank-only keys. Every input key appears exactly once. In two-way
/// mode `bank` is ignored; three-way mode requires it.
pub fn reconcile(
    collection: &[AggregatedRow],
    settlement: &[AggregatedRow],
    bank: Option<&[AggregatedRow]>,
    join: JoinMode,
) -> Result<Vec<ReconciledRow>, ReconError> {
    let bank = match join {
        JoinMode::TwoWay => None,
        JoinMode::ThreeWay => Some(bank.ok_or_else(|| {
            ReconError::ConfigValidation("join_mode = three_way but no bank data was supplied".into())
        })?),
    };

    let coll_map = index_side(SourceKind::Collection, collection)?;
    let settl_map = index_side(SourceKind::Settlement, settlement)?;
    let bank_map = bank.map(|rows| index_side(SourceKind::Bank, rows)).transpose()?;

    let mut keys: Vec<&ReconKey> = collection.iter().map(|r| &r.key).collect();
    keys.extend(
        settlement
            .iter()
            .map(|r| &r.key)
            .filter(|k| !coll_map.contains_key(k)),
    );
    if let Some(bank) = bank {
        keys.extend(
            bank.iter()
                .map(|r| &r.key)
                .filter(|k| !coll_map.contains_key(k) && !settl_map.contains_key(k)),
        );
    }

    keys.into_iter()
        .map(|key| -> Result<ReconciledRow, ReconError> {
            let collection_amount = coll_map.get(key).map(|r| r.summed_amount);
            let settlement_amount = settl_map.get(key).map(|r| r.summed_amount);
            let bank_amount = bank_map
                .as_ref()
                .and_then(|m| m.get(key))
                .map(|r| r.summed_amount);

            let status = classify(collection_amount, settlement_amount, bank_amount, join);
            let difference = collection_amount
                .unwrap_or(Amount::ZERO)
                .checked_sub(settlement_amount.unwrap_or(Amount::ZERO))
                .ok_or_else(|| ReconError::AmountOverflow(format!("difference for key '{key}'")))?;

            Ok(ReconciledRow {
                key: key.clone(),
                group: key.group().to_string(),
                collection_amount,
                settlement_amount,
                bank_amount,
                status,
                difference,
            })
        })
        .collect()
}

/// Status precedence, first match wins: missing collection, missing
/// settlement, missing bank (three-way only), exact match, mismatch.
pub fn classify(
    collection: Option<Amount>,
    settlement: Option<Amount>,
    bank: Option<Amount>,
    join: JoinMode,
) -> ReconStatus {
    let Some(c) = collection else {
        return ReconStatus::MissingInCollection;
    };
    let Some(s) = settlement else {
        return ReconStatus::MissingInSettlement;
    };
    let all_equal = match join {
        JoinMode::TwoWay => c == s,
        JoinMode::ThreeWay => match bank {
            None => return ReconStatus::MissingInBank,
            Some(b) => c == s && s == b,
        },
    };
    if all_equal {
        ReconStatus::Matched
    } else {
        ReconStatus::AmountMismatch
    }
}

fn index_side(
    source: SourceKind,
    rows: &[AggregatedRow],
) -> Result<HashMap<&ReconKey, &AggregatedRow>, ReconError> {
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        if map.insert(&row.key, row).is_some() {
            return Err(ReconError::DuplicateKey {
                source,
                key: row.key.to_string(),
            });
        }
    }
    Ok(map)
}
