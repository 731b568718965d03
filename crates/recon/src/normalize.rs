//! Raw rows → canonical records.
//!
//! Column references are resolved against each batch once, before any data
//! row is read. Every required field is checked per row; the first failure
//! aborts the run with the offending batch and row number.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::amount::Amount;
use crate::config::{BankColumns, CollectionColumns, ColumnRef, ReconConfig, SettlementColumns};
use crate::error::ReconError;
use crate::model::{
    BankCreditRecord, CollectionRecord, RawBatch, RowLocation, SettlementRecord, SourceKind,
};

/// Column positions for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollection {
    pub identifier: usize,
    pub bill_reference: Option<usize>,
    pub amount: usize,
    pub date: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettlement {
    pub identifier: Option<usize>,
    pub bill_reference: Option<usize>,
    pub amount: usize,
    pub date: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBank {
    pub description: usize,
    pub amount: usize,
    pub date: Option<usize>,
}

/// Bank credits that passed the gateway filter, plus how many rows did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankCredits {
    pub records: Vec<BankCreditRecord>,
    pub excluded: usize,
}

/// Normalizes raw batches under one config.
pub struct Normalizer<'a> {
    config: &'a ReconConfig,
    filter: String,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self {
            config,
            filter: config.bank_credit_filter.trim().to_lowercase(),
        }
    }

    pub fn collection(&self, batches: &[RawBatch]) -> Result<Vec<CollectionRecord>, ReconError> {
        let columns = &self.config.sources.collection.columns;
        let mut records = Vec::new();
        for batch in batches {
            let resolved = resolve_collection(columns, batch)?;
            for (i, cells) in data_rows(batch) {
                let at = location(SourceKind::Collection, batch, i);
                records.push(self.collection_row(cells, &resolved, at)?);
            }
            debug!(batch = %batch.name, rows = batch.rows.len(), "normalized collection batch");
        }
        Ok(records)
    }

    pub fn settlement(&self, batches: &[RawBatch]) -> Result<Vec<SettlementRecord>, ReconError> {
        let columns = &self.config.sources.settlement.columns;
        let mut records = Vec::new();
        for batch in batches {
            let resolved = resolve_settlement(columns, batch)?;
            for (i, cells) in data_rows(batch) {
                let at = location(SourceKind::Settlement, batch, i);
                records.push(self.settlement_row(cells, &resolved, at)?);
            }
            debug!(batch = %batch.name, rows = batch.rows.len(), "normalized settlement batch");
        }
        Ok(records)
    }

    /// Normalize bank statement rows, keeping only gateway-remitted credits.
    ///
    /// Rows are filtered on description before amount and date are parsed,
    /// so unrelated debits or blank lines never fail the run.
    pub fn bank(&self, batches: &[RawBatch]) -> Result<BankCredits, ReconError> {
        let Some(source) = &self.config.sources.bank else {
            if batches.is_empty() {
                return Ok(BankCredits::default());
            }
            return Err(ReconError::ConfigValidation(
                "bank data supplied but no [sources.bank] mapping is configured".into(),
            ));
        };

        let mut credits = BankCredits::default();
        for batch in batches {
            let resolved = resolve_bank(&source.columns, batch)?;
            let before = credits.excluded;
            for (i, cells) in data_rows(batch) {
                let at = location(SourceKind::Bank, batch, i);
                match self.bank_row(cells, &resolved, at)? {
                    Some(record) => credits.records.push(record),
                    None => credits.excluded += 1,
                }
            }
            debug!(
                batch = %batch.name,
                rows = batch.rows.len(),
                excluded = credits.excluded - before,
                "normalized bank batch"
            );
        }
        Ok(credits)
    }

    pub fn collection_row(
        &self,
        cells: &[String],
        cols: &ResolvedCollection,
        at: RowLocation,
    ) -> Result<CollectionRecord, ReconError> {
        let identifier = required(cells, cols.identifier, &at, "identifier")?.to_string();
        let bill_reference = cols
            .bill_reference
            .map(|idx| required(cells, idx, &at, "bill_reference").map(String::from))
            .transpose()?;
        let amount = self.amount(cells, cols.amount, &at)?;
        let date = cols.date.map(|idx| self.date(cells, idx, &at)).transpose()?;
        let short_code = short_code(&identifier, self.config.short_code_length);

        Ok(CollectionRecord {
            at,
            identifier,
            bill_reference,
            date,
            amount,
            short_code,
        })
    }

    pub fn settlement_row(
        &self,
        cells: &[String],
        cols: &ResolvedSettlement,
        at: RowLocation,
    ) -> Result<SettlementRecord, ReconError> {
        let identifier = cols
            .identifier
            .map(|idx| required(cells, idx, &at, "identifier").map(String::from))
            .transpose()?;
        let bill_reference = cols
            .bill_reference
            .map(|idx| required(cells, idx, &at, "bill_reference").map(String::from))
            .transpose()?;
        let amount = self.amount(cells, cols.amount, &at)?;
        let date = cols.date.map(|idx| self.date(cells, idx, &at)).transpose()?;
        let short_code = identifier
            .as_deref()
            .map(|id| short_code(id, self.config.short_code_length));

        Ok(SettlementRecord {
            at,
            identifier,
            bill_reference,
            date,
            amount,
            short_code,
        })
    }

    /// `Ok(None)` when the description does not name the gateway.
    pub fn bank_row(
        &self,
        cells: &[String],
        cols: &ResolvedBank,
        at: RowLocation,
    ) -> Result<Option<BankCreditRecord>, ReconError> {
        let description = cell(cells, cols.description).unwrap_or("");
        if !self.is_gateway_credit(description) {
            return Ok(None);
        }
        let description = description.to_string();
        let amount = self.amount(cells, cols.amount, &at)?;
        let date = cols.date.map(|idx| self.date(cells, idx, &at)).transpose()?;

        Ok(Some(BankCreditRecord {
            at,
            date,
            description,
            amount,
        }))
    }

    /// Case-insensitive substring match on the configured remitter signature.
    pub fn is_gateway_credit(&self, description: &str) -> bool {
        description.to_lowercase().contains(&self.filter)
    }

    fn amount(&self, cells: &[String], idx: usize, at: &RowLocation) -> Result<Amount, ReconError> {
        let raw = required(cells, idx, at, "amount")?;
        Amount::parse(raw, self.config.amount_unit_scale).ok_or_else(|| ReconError::AmountParse {
            at: at.clone(),
            field: "amount",
            value: raw.into(),
        })
    }

    fn date(&self, cells: &[String], idx: usize, at: &RowLocation) -> Result<NaiveDate, ReconError> {
        let raw = required(cells, idx, at, "date")?;
        parse_date(raw, &self.config.date_formats).ok_or_else(|| ReconError::DateParse {
            at: at.clone(),
            field: "date",
            value: raw.into(),
        })
    }
}

/// First `len` characters of the identifier; the whole identifier when shorter.
pub fn short_code(identifier: &str, len: usize) -> String {
    identifier.trim().chars().take(len).collect()
}

/// Try each format as a date, then as a date-time with the time discarded.
pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
        for time in [" %H:%M:%S", " %H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, &format!("{fmt}{time}")) {
                return Some(dt.date());
            }
        }
    }
    None
}

/// Rows with at least one non-blank cell, with their index in the batch.
/// Blank rows are skipped without renumbering the rows after them.
fn data_rows(batch: &RawBatch) -> impl Iterator<Item = (usize, &Vec<String>)> + '_ {
    batch
        .rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
}

fn location(source: SourceKind, batch: &RawBatch, index: usize) -> RowLocation {
    RowLocation {
        source,
        batch: batch.name.clone(),
        row: index + 1,
    }
}

fn cell(cells: &[String], idx: usize) -> Option<&str> {
    cells.get(idx).map(|c| c.trim()).filter(|c| !c.is_empty())
}

fn required<'c>(
    cells: &'c [String],
    idx: usize,
    at: &RowLocation,
    field: &'static str,
) -> Result<&'c str, ReconError> {
    cell(cells, idx).ok_or_else(|| ReconError::MissingField {
        at: at.clone(),
        field,
    })
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

fn resolve(col: &ColumnRef, source: SourceKind, batch: &RawBatch) -> Result<usize, ReconError> {
    match col {
        ColumnRef::Position(pos) => Ok(*pos),
        ColumnRef::Header(name) => batch
            .headers
            .iter()
            .position(|h| h.trim() == name.trim())
            .ok_or_else(|| ReconError::MissingColumn {
                source,
                batch: batch.name.clone(),
                column: name.clone(),
            }),
    }
}

fn resolve_opt(
    col: &Option<ColumnRef>,
    source: SourceKind,
    batch: &RawBatch,
) -> Result<Option<usize>, ReconError> {
    col.as_ref().map(|c| resolve(c, source, batch)).transpose()
}

pub fn resolve_collection(
    cols: &CollectionColumns,
    batch: &RawBatch,
) -> Result<ResolvedCollection, ReconError> {
    let s = SourceKind::Collection;
    Ok(ResolvedCollection {
        identifier: resolve(&cols.identifier, s, batch)?,
        bill_reference: resolve_opt(&cols.bill_reference, s, batch)?,
        amount: resolve(&cols.amount, s, batch)?,
        date: resolve_opt(&cols.date, s, batch)?,
    })
}

pub fn resolve_settlement(
    cols: &SettlementColumns,
    batch: &RawBatch,
) -> Result<ResolvedSettlement, ReconError> {
    let s = SourceKind::Settlement;
    Ok(ResolvedSettlement {
        identifier: resolve_opt(&cols.identifier, s, batch)?,
        bill_reference: resolve_opt(&cols.bill_reference, s, batch)?,
        amount: resolve(&cols.amount, s, batch)?,
        date: resolve_opt(&cols.date, s, batch)?,
    })
}

pub fn resolve_bank(cols: &BankColumns, batch: &RawBatch) -> Result<ResolvedBank, ReconError> {
    let s = SourceKind::Bank;
    Ok(ResolvedBank {
        description: resolve(&cols.description, s, batch)?,
        amount: resolve(&cols.amount, s, batch)?,
        date: resolve_opt(&cols.date, s, batch)?,
    })
}
