//! Resumable per-repository result datasets.

mod row;
mod store;

pub use row::{CoverageRow, LedgerRow, MutationRow, NOT_AVAILABLE, RunStatus};
pub use store::Ledger;
