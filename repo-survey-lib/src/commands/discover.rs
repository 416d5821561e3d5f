use super::common::{CommonArgs, LogLevel, TokenArgs};
use super::{Host, ProgressReporter};
use crate::Result;
use crate::scan::{Candidate, CheckpointStore, Classification, DiscoveryLog, Progress, classify_all, crawl, write_candidates};
use clap::Parser;
use core::time::Duration;
use std::io::Write;

const LOG_TARGET: &str = "  discover";

/// Exit code used when the search stopped before reaching the end date
pub const EXIT_INCOMPLETE: i32 = 2;

#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub tokens: TokenArgs,

    /// Classify the repositories already in the discovery log without searching for more
    #[arg(long)]
    pub skip_search: bool,
}

/// Search for repositories, classify everything discovered so far and write the candidate list.
///
/// When the search could not finish, the candidates found so far are still written and the
/// process exits with [`EXIT_INCOMPLETE`]; running the command again resumes the search.
pub async fn discover<H: Host>(host: &mut H, args: &DiscoverArgs) -> Result<()> {
    let config = args.common.setup()?;
    let client = args.tokens.client(&config)?;
    let paths = &config.paths;

    let mut complete = true;
    if !args.skip_search {
        let mut checkpoints = CheckpointStore::new(&paths.checkpoint);
        let mut discovery_log = DiscoveryLog::open(&paths.discovery_log)?;

        let summary = crawl(&client, &config.search, &mut checkpoints, &mut discovery_log).await?;
        log::info!(
            target: LOG_TARGET,
            "Searched {} windows ({} pages, {} repositories)",
            summary.windows,
            summary.pages,
            summary.repositories
        );
        complete = summary.complete;
    }

    let repos = DiscoveryLog::load(&paths.discovery_log)?;
    log::info!(target: LOG_TARGET, "Classifying {} discovered repositories", repos.len());

    let delay = if args.common.log_level == LogLevel::None {
        Duration::from_millis(300)
    } else {
        Duration::from_hours(365 * 24)
    };
    let progress = ProgressReporter::new(delay, args.common.color.use_colors_on_stderr());
    let report = classify_all(&client, &config.scan, repos, &progress).await;
    progress.done();

    let mut candidates: Vec<Candidate> = report.accepted.into_iter().filter_map(Classification::into_candidate).collect();
    candidates.sort_by(|a, b| b.stars.cmp(&a.stars).then_with(|| a.repo_ref().cmp(&b.repo_ref())));
    write_candidates(&paths.candidates, &candidates)?;

    let _ = writeln!(
        host.output(),
        "Wrote {} candidates to '{}' ({} rejected, {} failed)",
        candidates.len(),
        paths.candidates.display(),
        report.rejected,
        report.failed
    );

    if !complete {
        let _ = writeln!(
            host.error(),
            "The search stopped before reaching {}; run discover again to resume it",
            config.search.end_date
        );
        host.exit(EXIT_INCOMPLETE);
    }

    Ok(())
}
