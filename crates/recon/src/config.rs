use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub key_mode: KeyMode,
    #[serde(default)]
    pub join_mode: JoinMode,
    #[serde(default = "default_short_code_length")]
    pub short_code_length: usize,
    #[serde(default = "default_amount_unit_scale")]
    pub amount_unit_scale: u32,
    #[serde(default = "default_bank_credit_filter")]
    pub bank_credit_filter: String,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    pub sources: SourcesConfig,
}

fn default_short_code_length() -> usize {
    3
}

fn default_amount_unit_scale() -> u32 {
    100
}

fn default_bank_credit_filter() -> String {
    "INDIAIDEAS".into()
}

fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y", "%Y/%m/%d"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// How reconciliation keys are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// `(short_code, identifier, bill_reference)` record-level matching.
    #[default]
    IdentifierBill,
    /// Calendar-date matching.
    Date,
}

/// Which sources take part in the outer join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Collection vs settlement.
    #[default]
    TwoWay,
    /// Collection vs settlement vs bank credit.
    ThreeWay,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentifierBill => write!(f, "identifier_bill"),
            Self::Date => write!(f, "date"),
        }
    }
}

impl std::fmt::Display for JoinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TwoWay => write!(f, "two_way"),
            Self::ThreeWay => write!(f, "three_way"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub collection: SourceConfig<CollectionColumns>,
    pub settlement: SourceConfig<SettlementColumns>,
    #[serde(default)]
    pub bank: Option<SourceConfig<BankColumns>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig<C> {
    /// Extract files, relative to the config file. Read by the CLI only.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
    pub columns: C,
}

fn default_has_headers() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionColumns {
    pub identifier: ColumnRef,
    #[serde(default)]
    pub bill_reference: Option<ColumnRef>,
    pub amount: ColumnRef,
    #[serde(default)]
    pub date: Option<ColumnRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettlementColumns {
    #[serde(default)]
    pub identifier: Option<ColumnRef>,
    #[serde(default)]
    pub bill_reference: Option<ColumnRef>,
    pub amount: ColumnRef,
    #[serde(default)]
    pub date: Option<ColumnRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankColumns {
    pub description: ColumnRef,
    pub amount: ColumnRef,
    #[serde(default)]
    pub date: Option<ColumnRef>,
}

/// Explicit binding of a field to a column.
///
/// In TOML: an integer is a zero-based position, a string of one or two
/// upper-case letters is a spreadsheet column letter (`"Q"` = 16), any other
/// string is a header name, and `{ header = "..." }` forces a header name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawColumnRef")]
pub enum ColumnRef {
    Position(usize),
    Header(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumnRef {
    Position(usize),
    Named(String),
    Header { header: String },
}

impl From<RawColumnRef> for ColumnRef {
    fn from(raw: RawColumnRef) -> Self {
        match raw {
            RawColumnRef::Position(pos) => Self::Position(pos),
            RawColumnRef::Named(name) => match column_letter_position(&name) {
                Some(pos) => {
                    debug!(column = %name, position = pos, "column reference read as column letter");
                    Self::Position(pos)
                }
                None => Self::Header(name),
            },
            RawColumnRef::Header { header } => Self::Header(header),
        }
    }
}

/// `"A"` → 0, `"Q"` → 16, `"AA"` → 26, up to `"ZZ"`. Three-letter names
/// such as `"UTR"` or `"GST"` are header names.
fn column_letter_position(name: &str) -> Option<usize> {
    if name.is_empty() || name.len() > 2 || !name.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let n = name
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1);
    Some(n - 1)
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position(pos) => write!(f, "#{pos}"),
            Self::Header(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.short_code_length == 0 {
            return Err(invalid("short_code_length must be at least 1"));
        }
        if self.amount_unit_scale == 0 {
            return Err(invalid("amount_unit_scale must be at least 1"));
        }
        if self.bank_credit_filter.trim().is_empty() {
            return Err(invalid("bank_credit_filter must not be empty"));
        }
        if self.date_formats.is_empty() {
            return Err(invalid("date_formats must list at least one format"));
        }

        if self.join_mode == JoinMode::ThreeWay {
            if self.key_mode != KeyMode::Date {
                return Err(invalid(
                    "join_mode = three_way requires key_mode = date (bank credits carry no consumer identity)",
                ));
            }
            match &self.sources.bank {
                None => return Err(invalid("join_mode = three_way requires a [sources.bank] table")),
                Some(bank) if bank.columns.date.is_none() => {
                    return Err(invalid("join_mode = three_way requires sources.bank.columns.date"));
                }
                Some(_) => {}
            }
        }

        let collection = &self.sources.collection.columns;
        let settlement = &self.sources.settlement.columns;

        match self.key_mode {
            KeyMode::Date => {
                if collection.date.is_none() {
                    return Err(invalid("key_mode = date requires sources.collection.columns.date"));
                }
                if settlement.date.is_none() {
                    return Err(invalid("key_mode = date requires sources.settlement.columns.date"));
                }
            }
            KeyMode::IdentifierBill => {
                if settlement.identifier.is_none() {
                    return Err(invalid(
                        "key_mode = identifier_bill requires sources.settlement.columns.identifier",
                    ));
                }
                if collection.bill_reference.is_some() != settlement.bill_reference.is_some() {
                    return Err(invalid(
                        "bill_reference must be mapped on both collection and settlement, or on neither",
                    ));
                }
            }
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> ReconError {
    ReconError::ConfigValidation(msg.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
