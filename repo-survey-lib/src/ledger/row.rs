use crate::github::RepoRef;
use crate::scan::Candidate;
use crate::tools::{CoverageMetrics, MutationMetrics};
use core::fmt;
use strum::{Display, EnumString};

/// Placeholder written for a metric the tool did not report
pub const NOT_AVAILABLE: &str = "N/A";

/// Longest error text stored in a ledger cell
const MAX_ERROR_CHARS: usize = 32 * 1024;

/// Final outcome of processing one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum RunStatus {
    #[strum(serialize = "Success")]
    Success,

    #[strum(serialize = "Clone Failed")]
    CloneFailed,

    #[strum(serialize = "Solution Directory Missing")]
    SolutionDirMissing,

    #[strum(serialize = "Build Failed")]
    BuildFailed,

    #[strum(serialize = "No Tests Found")]
    NoTestsFound,

    #[strum(serialize = "Tool Failed")]
    ToolFailed,

    #[strum(serialize = "Coverage Failed")]
    CoverageFailed,

    #[strum(serialize = "Unexpected Error")]
    UnexpectedError,
}

/// A row that can be appended to a [`Ledger`](super::Ledger).
///
/// The first two columns of every ledger are the repository name and owner; the
/// ledger relies on them to recover identities when rebuilding its index.
pub trait LedgerRow {
    /// Column headers, in order
    const HEADERS: &'static [&'static str];

    fn repo(&self) -> RepoRef;

    /// Field values, one per header
    fn to_record(&self) -> Vec<String>;
}

/// Columns shared by every ledger, taken from the candidate list.
fn candidate_fields(candidate: &Candidate) -> Vec<String> {
    vec![
        candidate.name.clone(),
        candidate.owner.clone(),
        candidate.stars.to_string(),
        candidate.sdk.clone(),
        candidate.architecture.to_string(),
        candidate.solution_dir.clone(),
    ]
}

fn metric<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), ToString::to_string)
}

fn error_text(error: Option<&str>) -> String {
    let Some(error) = error else {
        return String::new();
    };

    let error = error.trim();
    if error.chars().count() <= MAX_ERROR_CHARS {
        error.to_string()
    } else {
        let mut truncated: String = error.chars().take(MAX_ERROR_CHARS).collect();
        truncated.push_str(" [truncated]");
        truncated
    }
}

/// Result of a mutation-testing run.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRow {
    pub candidate: Candidate,
    pub status: RunStatus,
    pub metrics: MutationMetrics,
    pub error: Option<String>,
}

impl LedgerRow for MutationRow {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Owner",
        "Stars",
        "SDK",
        "Architecture",
        "Solution Directory",
        "Killed",
        "Survived",
        "Timeout",
        "Time Elapsed",
        "Mutation Score",
        "Total Mutants",
        "Mutants Compile Error",
        "Mutants No Coverage",
        "Mutants Ignored",
        "Mutants Skipped",
        "Mutants Tested",
        "Status",
        "Error",
    ];

    fn repo(&self) -> RepoRef {
        self.candidate.repo_ref()
    }

    fn to_record(&self) -> Vec<String> {
        let m = &self.metrics;
        let mut fields = candidate_fields(&self.candidate);
        fields.extend([
            metric(m.killed.as_ref()),
            metric(m.survived.as_ref()),
            metric(m.timeout.as_ref()),
            metric(m.time_elapsed.as_ref()),
            metric(m.mutation_score.as_ref()),
            metric(m.total.as_ref()),
            metric(m.compile_error.as_ref()),
            metric(m.no_coverage.as_ref()),
            metric(m.ignored.as_ref()),
            metric(m.skipped.as_ref()),
            metric(m.tested.as_ref()),
            self.status.to_string(),
            error_text(self.error.as_deref()),
        ]);
        fields
    }
}

/// Result of a coverage run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub candidate: Candidate,
    pub status: RunStatus,
    pub metrics: CoverageMetrics,

    /// Directory the tests ran in
    pub tested_dir: Option<String>,

    pub error: Option<String>,
}

impl LedgerRow for CoverageRow {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Owner",
        "Stars",
        "SDK",
        "Architecture",
        "Solution Directory",
        "Line Coverage (%)",
        "Method Coverage (%)",
        "Status",
        "Tested Directory",
        "Error",
    ];

    fn repo(&self) -> RepoRef {
        self.candidate.repo_ref()
    }

    fn to_record(&self) -> Vec<String> {
        let mut fields = candidate_fields(&self.candidate);
        fields.extend([
            metric(self.metrics.line.as_ref()),
            metric(self.metrics.method.as_ref()),
            self.status.to_string(),
            self.tested_dir.clone().unwrap_or_default(),
            error_text(self.error.as_deref()),
        ]);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Architecture, CANDIDATE_HEADERS};

    fn candidate() -> Candidate {
        Candidate {
            name: "shop".into(),
            owner: "acme".into(),
            stars: 10,
            sdk: "6.0.x".into(),
            architecture: Architecture::Mvc,
            solution_dir: String::new(),
        }
    }

    #[test]
    fn test_headers_start_with_candidate_columns() {
        assert_eq!(&MutationRow::HEADERS[..CANDIDATE_HEADERS.len()], CANDIDATE_HEADERS.as_slice());
        assert_eq!(&CoverageRow::HEADERS[..CANDIDATE_HEADERS.len()], CANDIDATE_HEADERS.as_slice());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(RunStatus::CloneFailed.to_string(), "Clone Failed");
        assert_eq!(RunStatus::NoTestsFound.to_string(), "No Tests Found");
        assert_eq!("Build Failed".parse::<RunStatus>().unwrap(), RunStatus::BuildFailed);
    }

    #[test]
    fn test_mutation_row_renders_absent_metrics() {
        let row = MutationRow {
            candidate: candidate(),
            status: RunStatus::Success,
            metrics: MutationMetrics {
                killed: Some(0),
                mutation_score: Some(73.5),
                ..MutationMetrics::default()
            },
            error: None,
        };

        let record = row.to_record();
        assert_eq!(record.len(), MutationRow::HEADERS.len());
        assert_eq!(record[6], "0");
        assert_eq!(record[7], NOT_AVAILABLE);
        assert_eq!(record[10], "73.5");
        assert_eq!(record[17], "Success");
        assert_eq!(record[18], "");
        assert_eq!(row.repo(), RepoRef::new("acme", "shop"));
    }

    #[test]
    fn test_coverage_row() {
        let row = CoverageRow {
            candidate: candidate(),
            status: RunStatus::CoverageFailed,
            metrics: CoverageMetrics::default(),
            tested_dir: Some("src".into()),
            error: Some("  coverlet exploded \n".into()),
        };

        let record = row.to_record();
        assert_eq!(record.len(), CoverageRow::HEADERS.len());
        assert_eq!(record[6], NOT_AVAILABLE);
        assert_eq!(record[8], "Coverage Failed");
        assert_eq!(record[9], "src");
        assert_eq!(record[10], "coverlet exploded");
    }

    #[test]
    fn test_long_errors_are_truncated() {
        let long = "x".repeat(MAX_ERROR_CHARS + 10);
        let text = error_text(Some(&long));
        assert!(text.ends_with("[truncated]"));
        assert!(text.len() < long.len() + 20);
    }
}
