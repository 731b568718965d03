use std::fmt;

use crate::model::{RowLocation, SourceKind};

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad scale, contradictory modes, missing bank data, etc.).
    ConfigValidation(String),
    /// A header-bound column is not present in a batch's header row.
    MissingColumn { source: SourceKind, batch: String, column: String },
    /// A required field is absent or empty in a data row.
    MissingField { at: RowLocation, field: &'static str },
    /// Amount cell is not a decimal representable at the configured unit scale.
    AmountParse { at: RowLocation, field: &'static str, value: String },
    /// A sum or difference left the representable amount range.
    AmountOverflow(String),
    /// Date cell matches none of the configured date formats.
    DateParse { at: RowLocation, field: &'static str, value: String },
    /// A key component contains the key separator, so the composite key would be ambiguous.
    KeyCollision { at: RowLocation, component: &'static str },
    /// Reconciler received more than one aggregated row for the same key.
    DuplicateKey { source: SourceKind, key: String },
    /// IO error (file read, CSV decoding).
    Io(String),
}

impl ReconError {
    /// Stable error category, surfaced to users next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) => "config_error",
            Self::MissingColumn { .. }
            | Self::MissingField { .. }
            | Self::AmountParse { .. }
            | Self::DateParse { .. }
            | Self::AmountOverflow(_) => "schema_error",
            Self::KeyCollision { .. } => "key_error",
            Self::DuplicateKey { .. } => "duplicate_key_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Location of the offending row, when the error is tied to one.
    pub fn location(&self) -> Option<&RowLocation> {
        match self {
            Self::MissingField { at, .. }
            | Self::AmountParse { at, .. }
            | Self::DateParse { at, .. }
            | Self::KeyCollision { at, .. } => Some(at),
            _ => None,
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, batch, column } => {
                write!(f, "{source} '{batch}': missing column '{column}'")
            }
            Self::MissingField { at, field } => {
                write!(f, "{at}: required field '{field}' is empty")
            }
            Self::AmountParse { at, field, value } => {
                write!(f, "{at}: cannot parse amount '{value}' in field '{field}'")
            }
            Self::AmountOverflow(what) => write!(f, "amount overflow: {what}"),
            Self::DateParse { at, field, value } => {
                write!(f, "{at}: cannot parse date '{value}' in field '{field}'")
            }
            Self::KeyCollision { at, component } => {
                write!(f, "{at}: key component '{component}' contains the key separator")
            }
            Self::DuplicateKey { source, key } => {
                write!(f, "{source}: duplicate key '{key}' reached the reconciler unaggregated")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
