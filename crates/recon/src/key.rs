use crate::config::KeyMode;
use crate::error::ReconError;
use crate::model::{CanonicalRecord, ReconKey};

/// Build the reconciliation key for a record.
///
/// `identifier_bill`: `short_code|identifier|bill_reference`, with an empty
/// bill component when no bill column is mapped. `date`: `YYYY-MM-DD`.
pub fn build_key<R: CanonicalRecord>(record: &R, mode: KeyMode) -> Result<ReconKey, ReconError> {
    let fields = record.key_fields();
    let at = record.location();

    match mode {
        KeyMode::IdentifierBill => {
            let identifier = fields.identifier.ok_or_else(|| ReconError::MissingField {
                at: at.clone(),
                field: "identifier",
            })?;
            let short_code = fields.short_code.unwrap_or_default();
            let bill = fields.bill_reference.unwrap_or_default();

            for (component, value) in [
                ("short_code", short_code),
                ("identifier", identifier),
                ("bill_reference", bill),
            ] {
                if value.contains(ReconKey::SEPARATOR) {
                    return Err(ReconError::KeyCollision {
                        at: at.clone(),
                        component,
                    });
                }
            }

            let sep = ReconKey::SEPARATOR;
            Ok(ReconKey::new(format!("{short_code}{sep}{identifier}{sep}{bill}")))
        }
        KeyMode::Date => {
            let date = fields.date.ok_or_else(|| ReconError::MissingField {
                at: at.clone(),
                field: "date",
            })?;
            Ok(ReconKey::new(date.format("%Y-%m-%d").to_string()))
        }
    }
}
