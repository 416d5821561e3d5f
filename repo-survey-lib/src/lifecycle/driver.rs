use super::analysis::{Analysis, Outcome};
use super::git::{clone_repo, clone_url};
use super::workspace::remove_tree;
use super::{LOG_TARGET, Stage};
use crate::Result;
use crate::github::RepoRef;
use crate::ledger::{Ledger, RunStatus};
use crate::scan::Candidate;
use crate::tools::{ToolSettings, dotnet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counts from one pass of [`Driver::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Repositories skipped because the ledger already holds their row
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    const fn record(&mut self, status: RunStatus) {
        if matches!(status, RunStatus::Success) {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runs an [`Analysis`] over candidates one repository at a time.
///
/// Each repository is cloned into `{clone_dir}/{owner}/{name}`, optionally built, analyzed
/// and then deleted, whatever the outcome.
#[derive(Debug)]
pub struct Driver<A> {
    analysis: Arc<A>,
    tools: Arc<ToolSettings>,
    clone_url: Arc<str>,
    clone_dir: Arc<Path>,
}

impl<A> Clone for Driver<A> {
    fn clone(&self) -> Self {
        Self {
            analysis: Arc::clone(&self.analysis),
            tools: Arc::clone(&self.tools),
            clone_url: Arc::clone(&self.clone_url),
            clone_dir: Arc::clone(&self.clone_dir),
        }
    }
}

impl<A: Analysis> Driver<A> {
    #[must_use]
    pub fn new(analysis: A, tools: Arc<ToolSettings>, clone_url: &str, clone_dir: impl Into<PathBuf>) -> Self {
        Self {
            analysis: Arc::new(analysis),
            tools,
            clone_url: Arc::from(clone_url),
            clone_dir: Arc::from(clone_dir.into()),
        }
    }

    /// Process every candidate not yet in `ledger`, appending one row per repository.
    ///
    /// Processing starts after the last candidate the ledger already holds. Failures of
    /// individual repositories, panics included, become rows; only ledger I/O errors end
    /// the batch.
    pub async fn run(&self, candidates: &[Candidate], ledger: &mut Ledger<A::Row>) -> Result<BatchSummary> {
        let total = candidates.len();
        let start = ledger.resume_position(candidates);
        let mut summary = BatchSummary {
            skipped: start,
            ..BatchSummary::default()
        };

        if start > 0 {
            log::info!(target: LOG_TARGET, "Resuming {} run at repository {} of {total}", A::NAME, start + 1);
        }

        for (index, candidate) in candidates.iter().enumerate().skip(start) {
            let repo = candidate.repo_ref();
            if ledger.is_completed(&repo) {
                log::debug!(target: LOG_TARGET, "Skipping '{repo}', already recorded");
                summary.skipped += 1;
                continue;
            }

            log::info!(target: LOG_TARGET, "[{}/{total}] Processing '{repo}'", index + 1);
            let outcome = self.process_isolated(candidate).await;
            log::info!(target: LOG_TARGET, "'{repo}' finished with status '{}'", outcome.status);

            summary.record(outcome.status);
            ledger.append(&A::into_row(candidate.clone(), outcome))?;
        }

        Ok(summary)
    }

    /// Process one repository on its own task so a panic is confined to that repository.
    async fn process_isolated(&self, candidate: &Candidate) -> Outcome<A::Metrics> {
        let driver = self.clone();
        let owned = candidate.clone();

        match tokio::spawn(async move { driver.process(&owned).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Processing '{}' aborted: {e}", candidate.repo_ref());
                let _ = remove_tree(&self.repo_dir(&candidate.repo_ref()));
                Outcome::failed(RunStatus::UnexpectedError, e.to_string())
            }
        }
    }

    async fn process(&self, candidate: &Candidate) -> Outcome<A::Metrics> {
        let repo = candidate.repo_ref();
        let repo_dir = self.repo_dir(&repo);
        let mut stage = Stage::NotCloned;

        let outcome = self.run_stages(candidate, &repo_dir, &mut stage).await;

        if remove_tree(&repo_dir) {
            enter(&mut stage, Stage::Deleted, &repo);
        }

        outcome
    }

    async fn run_stages(&self, candidate: &Candidate, repo_dir: &Path, stage: &mut Stage) -> Outcome<A::Metrics> {
        let repo = candidate.repo_ref();

        let url = clone_url(&self.clone_url, &repo);
        if let Err(e) = clone_repo(&self.tools, &url, repo_dir).await {
            enter(stage, Stage::Errored, &repo);
            return Outcome::failed(RunStatus::CloneFailed, format!("{e:#}"));
        }
        enter(stage, Stage::Cloned, &repo);

        let work_dir = solution_path(repo_dir, &candidate.solution_dir);
        if !work_dir.is_dir() {
            enter(stage, Stage::Errored, &repo);
            return Outcome::failed(
                RunStatus::SolutionDirMissing,
                format!("solution directory '{}' not found in the clone", candidate.solution_dir),
            );
        }

        if A::REQUIRES_BUILD {
            log::info!(target: LOG_TARGET, "Building '{repo}'");
            match dotnet::build(&self.tools, &work_dir).await {
                Ok(output) if output.success() => enter(stage, Stage::Built, &repo),
                Ok(output) => {
                    enter(stage, Stage::Errored, &repo);
                    return Outcome::failed(RunStatus::BuildFailed, output.failure_text());
                }
                Err(e) => {
                    enter(stage, Stage::Errored, &repo);
                    return Outcome::failed(RunStatus::BuildFailed, format!("{e:#}"));
                }
            }
        }

        log::info!(target: LOG_TARGET, "Running {} analysis of '{repo}'", A::NAME);
        let outcome = self.analysis.analyze(&work_dir).await;
        let next = if outcome.status == RunStatus::Success { Stage::Tested } else { Stage::Errored };
        enter(stage, next, &repo);

        outcome
    }

    fn repo_dir(&self, repo: &RepoRef) -> PathBuf {
        self.clone_dir.join(&repo.owner).join(&repo.name)
    }
}

fn solution_path(repo_dir: &Path, solution_dir: &str) -> PathBuf {
    let solution_dir = solution_dir.trim().trim_matches('/');
    if solution_dir.is_empty() {
        repo_dir.to_path_buf()
    } else {
        repo_dir.join(solution_dir)
    }
}

fn enter(stage: &mut Stage, next: Stage, repo: &RepoRef) {
    match stage.advance(next) {
        Ok(advanced) => *stage = advanced,
        Err(e) => {
            log::error!(target: LOG_TARGET, "'{repo}': {e:#}");
            *stage = Stage::Errored;
        }
    }
    log::debug!(target: LOG_TARGET, "'{repo}' is now {stage}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_path() {
        let root = Path::new("/work/acme/shop");
        assert_eq!(solution_path(root, ""), root);
        assert_eq!(solution_path(root, "  "), root);
        assert_eq!(solution_path(root, "src"), root.join("src"));
        assert_eq!(solution_path(root, "src/Shop/"), root.join("src/Shop"));
    }

    #[test]
    fn test_enter_follows_transitions() {
        let repo = RepoRef::new("acme", "shop");
        let mut stage = Stage::NotCloned;

        enter(&mut stage, Stage::Cloned, &repo);
        assert_eq!(stage, Stage::Cloned);

        enter(&mut stage, Stage::Deleted, &repo);
        assert_eq!(stage, Stage::Errored);

        enter(&mut stage, Stage::Deleted, &repo);
        assert_eq!(stage, Stage::Errored);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(RunStatus::Success);
        summary.record(RunStatus::BuildFailed);
        summary.record(RunStatus::NoTestsFound);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
    }
}
