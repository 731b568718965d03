use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::amount::Amount;
use crate::config::{JoinMode, KeyMode};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The three independently produced extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Field collection (SDO) records.
    Collection,
    /// Payment-gateway (BillDesk) settlement report.
    Settlement,
    /// Bank statement credits.
    Bank,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Settlement => write!(f, "settlement"),
            Self::Bank => write!(f, "bank"),
        }
    }
}

/// One already-parsed table (a single uploaded file) from one source.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    /// File or sheet name, used only for diagnostics.
    pub name: String,
    /// Header row. Empty when the extract has no header row.
    pub headers: Vec<String>,
    /// Data rows, in file order.
    pub rows: Vec<Vec<String>>,
}

/// Raw batches for one run. `bank` may be empty in two-way mode.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub collection: Vec<RawBatch>,
    pub settlement: Vec<RawBatch>,
    pub bank: Vec<RawBatch>,
}

/// Where a record came from: source, batch name and 1-based data-row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowLocation {
    pub source: SourceKind,
    pub batch: String,
    pub row: usize,
}

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' row {}", self.source, self.batch, self.row)
    }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRecord {
    pub at: RowLocation,
    pub identifier: String,
    pub bill_reference: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Amount,
    /// Fixed-length prefix of `identifier` (regional office code).
    pub short_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRecord {
    pub at: RowLocation,
    pub identifier: Option<String>,
    pub bill_reference: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Amount,
    pub short_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankCreditRecord {
    pub at: RowLocation,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Amount,
}

/// Fields a key can be built from, borrowed from any canonical record.
#[derive(Debug, Clone, Copy)]
pub struct KeyFields<'a> {
    pub short_code: Option<&'a str>,
    pub identifier: Option<&'a str>,
    pub bill_reference: Option<&'a str>,
    pub date: Option<NaiveDate>,
}

/// Common view over the three canonical record types.
pub trait CanonicalRecord {
    fn location(&self) -> &RowLocation;
    fn amount(&self) -> Amount;
    fn key_fields(&self) -> KeyFields<'_>;
}

impl CanonicalRecord for CollectionRecord {
    fn location(&self) -> &RowLocation {
        &self.at
    }
    fn amount(&self) -> Amount {
        self.amount
    }
    fn key_fields(&self) -> KeyFields<'_> {
        KeyFields {
            short_code: Some(&self.short_code),
            identifier: Some(&self.identifier),
            bill_reference: self.bill_reference.as_deref(),
            date: self.date,
        }
    }
}

impl CanonicalRecord for SettlementRecord {
    fn location(&self) -> &RowLocation {
        &self.at
    }
    fn amount(&self) -> Amount {
        self.amount
    }
    fn key_fields(&self) -> KeyFields<'_> {
        KeyFields {
            short_code: self.short_code.as_deref(),
            identifier: self.identifier.as_deref(),
            bill_reference: self.bill_reference.as_deref(),
            date: self.date,
        }
    }
}

impl CanonicalRecord for BankCreditRecord {
    fn location(&self) -> &RowLocation {
        &self.at
    }
    fn amount(&self) -> Amount {
        self.amount
    }
    fn key_fields(&self) -> KeyFields<'_> {
        KeyFields {
            short_code: None,
            identifier: None,
            bill_reference: None,
            date: self.date,
        }
    }
}

// ---------------------------------------------------------------------------
// Keys + aggregation
// ---------------------------------------------------------------------------

/// Reconciliation join key.
///
/// Record keys are `short_code|identifier|bill_reference`; date keys are
/// `YYYY-MM-DD`. Components never contain the separator (enforced by the
/// key builder), so the text form is collision-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReconKey(String);

impl ReconKey {
    pub const SEPARATOR: char = '|';

    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Secondary reporting dimension: the short code for record keys, the
    /// date itself for date keys.
    pub fn group(&self) -> &str {
        self.0.split(Self::SEPARATOR).next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ReconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All records of one source sharing a key, amounts summed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub source: SourceKind,
    pub key: ReconKey,
    pub summed_amount: Amount,
    pub record_count: usize,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    MissingInCollection,
    MissingInSettlement,
    MissingInBank,
    Matched,
    AmountMismatch,
}

impl ReconStatus {
    pub const ALL: [ReconStatus; 5] = [
        Self::MissingInCollection,
        Self::MissingInSettlement,
        Self::MissingInBank,
        Self::Matched,
        Self::AmountMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInCollection => "missing_in_collection",
            Self::MissingInSettlement => "missing_in_settlement",
            Self::MissingInBank => "missing_in_bank",
            Self::Matched => "matched",
            Self::AmountMismatch => "amount_mismatch",
        }
    }
}

impl fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// One outer-joined key with its per-source amounts.
///
/// `None` means the source had no record for the key, which is distinct
/// from a present zero amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRow {
    pub key: ReconKey,
    pub group: String,
    pub collection_amount: Option<Amount>,
    pub settlement_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_amount: Option<Amount>,
    pub status: ReconStatus,
    /// `collection - settlement`, a missing side counting as zero.
    pub difference: Amount,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub key_mode: KeyMode,
    pub join_mode: JoinMode,
    pub amount_unit_scale: u32,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub collection_total: Amount,
    pub settlement_total: Amount,
    /// Present whenever bank data was supplied, in either join mode.
    pub bank_credit_total: Option<Amount>,
    /// `collection_total - settlement_total`.
    pub net_difference: Amount,
    /// Sum of `|difference|` over all reconciled rows.
    pub absolute_difference: Amount,
    pub totals_match: bool,
    pub collection_records: usize,
    pub settlement_records: usize,
    pub bank_records: usize,
    pub bank_rows_excluded: usize,
    pub total_rows: usize,
    pub status_counts: BTreeMap<ReconStatus, usize>,
}

/// Reconciled rows summed per secondary dimension (short code or date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub group: String,
    pub collection_amount: Amount,
    pub settlement_amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_amount: Option<Amount>,
    pub difference: Amount,
    pub rows: usize,
    pub discrepancies: usize,
}

/// Collection total per regional office code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortCodeTotal {
    pub short_code: String,
    pub amount: Amount,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub breakdown: Vec<BreakdownRow>,
    pub short_code_summary: Vec<ShortCodeTotal>,
    pub rows: Vec<ReconciledRow>,
}

impl Report {
    /// Detail rows with the given status, in report order.
    pub fn with_status(&self, status: ReconStatus) -> impl Iterator<Item = &ReconciledRow> + '_ {
        self.rows.iter().filter(move |r| r.status == status)
    }

    /// True when at least one row is not `Matched`.
    pub fn has_discrepancies(&self) -> bool {
        self.rows.iter().any(|r| r.status != ReconStatus::Matched)
    }
}
