use super::{Invocation, ToolOutput};
use crate::Result;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// External program names and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    /// `git` executable
    pub git: String,

    /// `dotnet` executable, also used for `dotnet stryker`
    pub dotnet: String,

    /// Coverlet console executable
    pub coverlet: String,

    /// Limit on a single `git clone`
    #[serde(with = "humantime_serde")]
    pub git_timeout: Duration,
}

/// `dotnet build`, captured.
pub async fn build(tools: &ToolSettings, dir: &Path) -> Result<ToolOutput> {
    Invocation::new(&tools.dotnet, dir).arg("build").run_captured().await
}

/// `dotnet test`, streamed to the log.
pub async fn test(tools: &ToolSettings, dir: &Path) -> Result<ToolOutput> {
    Invocation::new(&tools.dotnet, dir).arg("test").run_streaming().await
}

/// `dotnet stryker --verbosity info`, streamed to the log. Runs without a time limit.
pub async fn stryker(tools: &ToolSettings, dir: &Path) -> Result<ToolOutput> {
    Invocation::new(&tools.dotnet, dir)
        .args(["stryker", "--verbosity", "info"])
        .run_streaming()
        .await
}

/// Coverlet over a test assembly, re-running the project's tests without rebuilding.
pub async fn coverlet(tools: &ToolSettings, assembly: &Path, project_dir: &Path) -> Result<ToolOutput> {
    Invocation::new(&tools.coverlet, project_dir)
        .arg(assembly.to_string_lossy())
        .args(["--target", tools.dotnet.as_str(), "--targetargs"])
        .arg(format!("test \"{}\" --no-build", project_dir.display()))
        .run_captured()
        .await
}
