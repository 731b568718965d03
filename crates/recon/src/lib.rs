//! `sdo-recon`: field collection, gateway settlement and bank credit reconciliation.
//!
//! Pure engine crate: receives pre-parsed tabular batches, returns a report.
//! No CLI dependencies; the `source` module is the only IO-adjacent code.

pub mod aggregate;
pub mod amount;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod source;

pub use amount::Amount;
pub use config::{JoinMode, KeyMode, ReconConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{RawBatch, ReconInput, ReconStatus, ReconciledRow, Report};
