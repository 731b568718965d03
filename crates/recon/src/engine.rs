use tracing::{debug, info};

use crate::aggregate::aggregate_by_mode;
use crate::config::{JoinMode, ReconConfig};
use crate::error::ReconError;
use crate::model::{ReconInput, Report, ReportMeta, SourceKind};
use crate::normalize::Normalizer;
use crate::reconcile::reconcile;
use crate::report::{build_report, SourceCounts};

/// Run one reconciliation. Pure function of config and input.
///
/// Any schema, key or duplicate-key failure aborts the whole run; a
/// partially reconciled report is never returned.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<Report, ReconError> {
    config.validate()?;
    if config.join_mode == JoinMode::ThreeWay && input.bank.is_empty() {
        return Err(ReconError::ConfigValidation(
            "join_mode = three_way but no bank statement was supplied".into(),
        ));
    }

    let normalizer = Normalizer::new(config);
    let collection = normalizer.collection(&input.collection)?;
    let settlement = normalizer.settlement(&input.settlement)?;
    let bank = if input.bank.is_empty() {
        None
    } else {
        Some(normalizer.bank(&input.bank)?)
    };

    let coll_aggs = aggregate_by_mode(SourceKind::Collection, &collection, config.key_mode)?;
    let settl_aggs = aggregate_by_mode(SourceKind::Settlement, &settlement, config.key_mode)?;
    let bank_aggs = match (&bank, config.join_mode) {
        (Some(credits), JoinMode::ThreeWay) => Some(aggregate_by_mode(
            SourceKind::Bank,
            &credits.records,
            config.key_mode,
        )?),
        _ => None,
    };
    debug!(
        collection_keys = coll_aggs.len(),
        settlement_keys = settl_aggs.len(),
        bank_keys = bank_aggs.as_ref().map(Vec::len),
        "aggregated sources"
    );

    let rows = reconcile(&coll_aggs, &settl_aggs, bank_aggs.as_deref(), config.join_mode)?;

    let counts = SourceCounts {
        collection_records: collection.len(),
        settlement_records: settlement.len(),
        ..SourceCounts::default()
    }
    .with_bank(bank.as_ref())?;

    let meta = ReportMeta {
        config_name: config.name.clone(),
        key_mode: config.key_mode,
        join_mode: config.join_mode,
        amount_unit_scale: config.amount_unit_scale,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    };

    let report = build_report(meta, rows, &collection, counts)?;
    info!(
        config = %config.name,
        rows = report.summary.total_rows,
        matched = report.summary.status_counts.get(&crate::model::ReconStatus::Matched).copied().unwrap_or(0),
        net_difference = %report.summary.net_difference.display(config.amount_unit_scale),
        "reconciliation complete"
    );
    Ok(report)
}
