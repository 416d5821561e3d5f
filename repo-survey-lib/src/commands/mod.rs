//! Command-line interface and orchestration for repo-survey
//!
//! The pipeline runs as separate, individually resumable commands:
//!
//! - **discover**: walk creation-date windows of a GitHub search, recording every
//!   repository found, then classify them concurrently and write the candidate list
//! - **mutate**: clone, build and mutation-test each candidate into the mutation ledger
//! - **coverage**: clone, test and measure coverage of each candidate into the coverage ledger
//! - **age**: add each ledger repository's age to a small report
//! - **init**: write the default configuration file
//!
//! Every command loads the TOML configuration (see `default_config.toml`) and sets up
//! logging through [`common::CommonArgs`]. Interrupting a command loses at most the
//! repository being processed; running it again picks up from the checkpoint or ledger.

mod age;
mod analyze;
mod common;
mod config;
mod discover;
mod host;
mod init;
mod progress_reporter;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use age::{AgeArgs, report_age};
pub use analyze::{AnalyzeArgs, run_coverage, run_mutation};
pub use discover::{DiscoverArgs, EXIT_INCOMPLETE, discover};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
