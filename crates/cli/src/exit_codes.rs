//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scheduled close jobs branch on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Reconciled, every row matched                       |
//! | 1    | Reconciled, discrepancies found                     |
//! | 2    | CLI usage error (bad args)                          |
//! | 3    | Invalid or contradictory config                     |
//! | 4    | Input data error (schema, key, duplicate key)       |
//! | 5    | IO error (unreadable config/extract, write failure) |

use sdo_recon::ReconError;

/// Every row matched.
pub const EXIT_SUCCESS: u8 = 0;

/// Run completed but at least one row is not `matched`.
/// Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Usage error - bad arguments or unknown `--status` value.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation failure.
pub const EXIT_CONFIG: u8 = 3;

/// A row failed normalization or key construction, or aggregation was bypassed.
pub const EXIT_DATA: u8 = 4;

/// File read/write failure.
pub const EXIT_IO: u8 = 5;

/// Exit code for a library error, by error kind.
pub fn for_error(err: &ReconError) -> u8 {
    match err.kind() {
        "config_error" => EXIT_CONFIG,
        "io_error" => EXIT_IO,
        _ => EXIT_DATA,
    }
}
