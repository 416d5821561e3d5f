use super::Host;
use super::common::CommonArgs;
use super::config::Config;
use crate::Result;
use crate::ledger::Ledger;
use crate::lifecycle::{Analysis, CoverageAnalysis, Driver, MutationAnalysis, WorkDirLock};
use crate::scan::read_candidates;
use crate::tools::ToolSettings;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "   analyze";

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Candidate list to process (default from the configuration)
    #[arg(long, value_name = "PATH")]
    pub candidates: Option<Utf8PathBuf>,

    /// Ledger receiving one row per repository (default from the configuration)
    #[arg(long, value_name = "PATH")]
    pub ledger: Option<Utf8PathBuf>,
}

/// Run mutation testing over every candidate.
pub async fn run_mutation<H: Host>(host: &mut H, args: &AnalyzeArgs) -> Result<()> {
    let config = args.common.setup()?;
    let ledger = pick(args.ledger.as_ref(), &config.paths.mutation_ledger);
    run_analysis(host, args, &config, ledger, MutationAnalysis::new).await
}

/// Measure test coverage of every candidate.
pub async fn run_coverage<H: Host>(host: &mut H, args: &AnalyzeArgs) -> Result<()> {
    let config = args.common.setup()?;
    let ledger = pick(args.ledger.as_ref(), &config.paths.coverage_ledger);
    run_analysis(host, args, &config, ledger, CoverageAnalysis::new).await
}

async fn run_analysis<H, A>(
    host: &mut H,
    args: &AnalyzeArgs,
    config: &Config,
    ledger_path: PathBuf,
    make_analysis: impl FnOnce(Arc<ToolSettings>) -> A,
) -> Result<()>
where
    H: Host,
    A: Analysis,
{
    let candidates_path = pick(args.candidates.as_ref(), &config.paths.candidates);
    let candidates = read_candidates(&candidates_path)?;
    log::info!(target: LOG_TARGET, "Loaded {} candidates from '{}'", candidates.len(), candidates_path.display());

    let clone_dir = config.paths.clone_dir()?;
    let _lock = WorkDirLock::acquire(&clone_dir).await?;

    let mut ledger = Ledger::<A::Row>::open(ledger_path)?;
    let tools = Arc::new(config.tools.clone());
    let driver = Driver::new(make_analysis(Arc::clone(&tools)), tools, &config.github.clone_url, clone_dir);

    let summary = driver.run(&candidates, &mut ledger).await?;

    let _ = writeln!(
        host.output(),
        "{} run: {} succeeded, {} failed, {} already recorded; results in '{}'",
        A::NAME,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        ledger.path().display()
    );

    Ok(())
}

fn pick(arg: Option<&Utf8PathBuf>, configured: &Path) -> PathBuf {
    arg.map_or_else(|| configured.to_path_buf(), |p| p.as_std_path().to_path_buf())
}
