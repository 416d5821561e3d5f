use super::LOG_TARGET;
use crate::Result;
use crate::github::RepoRef;
use crate::tools::{Invocation, ToolOutput, ToolSettings};
use ohno::{IntoAppError, bail};
use std::fs;
use std::path::Path;

/// What [`clone_repo`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// A fresh clone was made
    Cloned,

    /// The target directory already existed and was left untouched
    AlreadyPresent,
}

/// URL of a repository under `base`, e.g. `https://github.com/acme/shop.git`.
#[must_use]
pub fn clone_url(base: &str, repo: &RepoRef) -> String {
    format!("{}/{}/{}.git", base.trim_end_matches('/'), repo.owner, repo.name)
}

/// Shallow-clone `url` into `target`.
///
/// An existing `target` counts as success and no git process is started.
pub async fn clone_repo(tools: &ToolSettings, url: &str, target: &Path) -> Result<CloneOutcome> {
    if target.exists() {
        log::debug!(target: LOG_TARGET, "Reusing existing clone at '{}'", target.display());
        return Ok(CloneOutcome::AlreadyPresent);
    }

    let parent = target.parent().into_app_err("clone target has no parent directory")?;
    fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{}'", parent.display()))?;

    let start_time = std::time::Instant::now();
    log::info!(target: LOG_TARGET, "Cloning '{url}'");

    let output = Invocation::new(&tools.git, parent)
        .args(["clone", "--depth", "1", "--no-tags", url])
        .arg(target.to_string_lossy())
        .timeout(tools.git_timeout)
        .run_captured()
        .await?;
    check_git_output(&output, "git clone")?;

    log::debug!(target: LOG_TARGET, "Cloned '{url}' in {:.3}s", start_time.elapsed().as_secs_f64());
    Ok(CloneOutcome::Cloned)
}

fn check_git_output(output: &ToolOutput, operation: &str) -> Result<()> {
    if !output.success() {
        bail!("{operation} failed: {}", output.stderr.trim());
    }
    Ok(())
}
