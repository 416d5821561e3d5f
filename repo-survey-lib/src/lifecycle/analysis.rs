use super::LOG_TARGET;
use crate::ledger::{CoverageRow, LedgerRow, MutationRow, RunStatus};
use crate::scan::Candidate;
use crate::tools::{CoverageMetrics, MutationMetrics, ToolSettings, dotnet, find_project_dir, find_test_assembly};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// What an analysis produced for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<M> {
    pub status: RunStatus,
    pub metrics: M,

    /// Directory the analysis ran in, relative to the clone
    pub tested_dir: Option<String>,

    pub error: Option<String>,
}

impl<M: Default> Outcome<M> {
    #[must_use]
    pub fn failed(status: RunStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            metrics: M::default(),
            tested_dir: None,
            error: Some(error.into()),
        }
    }
}

/// The tool stage run against each cloned repository.
pub trait Analysis: Send + Sync + 'static {
    type Metrics: Default + Send + 'static;
    type Row: LedgerRow + Send + 'static;

    /// Short name used in log lines
    const NAME: &'static str;

    /// Whether `dotnet build` must succeed before [`Analysis::analyze`] runs
    const REQUIRES_BUILD: bool;

    /// Run the analysis in `dir`, the candidate's solution directory.
    fn analyze(&self, dir: &Path) -> impl Future<Output = Outcome<Self::Metrics>> + Send;

    fn into_row(candidate: Candidate, outcome: Outcome<Self::Metrics>) -> Self::Row;
}

/// Mutation testing with Stryker.
#[derive(Debug, Clone)]
pub struct MutationAnalysis {
    tools: Arc<ToolSettings>,
}

impl MutationAnalysis {
    #[must_use]
    pub const fn new(tools: Arc<ToolSettings>) -> Self {
        Self { tools }
    }
}

impl Analysis for MutationAnalysis {
    type Metrics = MutationMetrics;
    type Row = MutationRow;

    const NAME: &'static str = "mutation";
    const REQUIRES_BUILD: bool = true;

    async fn analyze(&self, dir: &Path) -> Outcome<MutationMetrics> {
        let output = match dotnet::stryker(&self.tools, dir).await {
            Ok(output) => output,
            Err(e) => return Outcome::failed(RunStatus::ToolFailed, format!("{e:#}")),
        };

        // Stryker may print partial results before failing; keep whatever it reported.
        let metrics = MutationMetrics::parse(&output.stdout);
        let (status, error) = if output.success() {
            (RunStatus::Success, None)
        } else {
            (RunStatus::ToolFailed, Some(output.failure_text()))
        };

        Outcome {
            status,
            metrics,
            tested_dir: None,
            error,
        }
    }

    fn into_row(candidate: Candidate, outcome: Outcome<MutationMetrics>) -> MutationRow {
        MutationRow {
            candidate,
            status: outcome.status,
            metrics: outcome.metrics,
            error: outcome.error,
        }
    }
}

/// Line and method coverage with Coverlet.
#[derive(Debug, Clone)]
pub struct CoverageAnalysis {
    tools: Arc<ToolSettings>,
}

impl CoverageAnalysis {
    #[must_use]
    pub const fn new(tools: Arc<ToolSettings>) -> Self {
        Self { tools }
    }
}

impl Analysis for CoverageAnalysis {
    type Metrics = CoverageMetrics;
    type Row = CoverageRow;

    const NAME: &'static str = "coverage";
    const REQUIRES_BUILD: bool = false;

    async fn analyze(&self, dir: &Path) -> Outcome<CoverageMetrics> {
        if !has_project_file(dir) {
            return Outcome::failed(
                RunStatus::NoTestsFound,
                format!("no .sln or .csproj file in '{}'", dir.display()),
            );
        }

        let test_output = match dotnet::test(&self.tools, dir).await {
            Ok(output) => output,
            Err(e) => return Outcome::failed(RunStatus::ToolFailed, format!("{e:#}")),
        };

        if !test_output.success() {
            log::warn!(target: LOG_TARGET, "dotnet test exited with {}, looking for a test assembly anyway", test_output.status);
        }

        let Some(assembly) = find_test_assembly(dir, &test_output.stdout) else {
            return Outcome::failed(RunStatus::NoTestsFound, "no test assembly found after dotnet test");
        };

        let project_dir = find_project_dir(&assembly, dir);
        let tested_dir = Some(relative_display(&project_dir, dir));
        log::info!(target: LOG_TARGET, "Measuring coverage of '{}'", assembly.display());

        let output = match dotnet::coverlet(&self.tools, &assembly, &project_dir).await {
            Ok(output) => output,
            Err(e) => {
                return Outcome {
                    tested_dir,
                    ..Outcome::failed(RunStatus::CoverageFailed, format!("{e:#}"))
                };
            }
        };

        let metrics = CoverageMetrics::parse(&output.stdout);
        if metrics.is_found() {
            Outcome {
                status: RunStatus::Success,
                metrics,
                tested_dir,
                error: None,
            }
        } else {
            Outcome {
                status: RunStatus::CoverageFailed,
                metrics,
                tested_dir,
                error: Some(output.failure_text()),
            }
        }
    }

    fn into_row(candidate: Candidate, outcome: Outcome<CoverageMetrics>) -> CoverageRow {
        CoverageRow {
            candidate,
            status: outcome.status,
            metrics: outcome.metrics,
            tested_dir: outcome.tested_dir,
            error: outcome.error,
        }
    }
}

/// Whether `dir` directly contains a solution or project file.
fn has_project_file(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.filter_map(core::result::Result::ok).any(|entry| {
        entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sln") || ext.eq_ignore_ascii_case("csproj"))
    })
}

fn relative_display(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}
