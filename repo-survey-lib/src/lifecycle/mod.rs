//! Per-repository clone, build, analyze and delete sequence.
//!
//! Repositories are processed strictly one at a time. Every repository yields exactly one
//! ledger row, whether its processing succeeded or not.

mod analysis;
mod driver;
mod git;
mod state;
mod workspace;

pub use analysis::{Analysis, CoverageAnalysis, MutationAnalysis, Outcome};
pub use driver::{BatchSummary, Driver};
pub use git::{CloneOutcome, clone_repo, clone_url};
pub use state::Stage;
pub use workspace::{WorkDirLock, remove_tree};

/// Log target for the lifecycle
const LOG_TARGET: &str = " lifecycle";
