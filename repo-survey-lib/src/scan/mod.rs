//! Repository discovery and classification.
//!
//! Discovery walks creation-date windows of a repository search, recording every
//! result in a discovery log and advancing a checkpoint after each page. The
//! discovered repositories are then classified concurrently, and those passing every
//! gate are written to the candidate list consumed by the lifecycle stage.

mod candidate;
mod checkpoint;
mod classification;
mod classifier;
mod coordinator;
mod crawler;
mod discovery_log;
mod progress;

pub use candidate::{CANDIDATE_HEADERS, Candidate, read_candidates, write_candidates};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use classification::{Architecture, Classification};
pub use classifier::{
    Manifest, ScanSettings, SolutionLookup, classify, classify_listing, detect_architecture, detect_sdk_version, detect_tests,
    find_solution, is_ecosystem_path, sdk_label, target_frameworks,
};
pub use coordinator::{ScanReport, classify_all};
pub use crawler::{CrawlSummary, SearchSettings, crawl};
pub use discovery_log::DiscoveryLog;
pub use progress::{NoProgress, Progress};
