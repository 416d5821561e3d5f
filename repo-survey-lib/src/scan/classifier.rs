//! Per-repository classification.
//!
//! A repository is classified from its file listing and the contents of its project
//! manifests. The decision rules are pure functions over already-fetched data so they
//! can be exercised without network access; [`classify`] does the fetching.

use super::{Architecture, Classification};
use crate::github::{Client, DiscoveredRepo, fetch_raw, fetch_tree};
use core::time::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const LOG_TARGET: &str = "classifier";

const PROJECT_EXTENSION: &str = ".csproj";
const SOLUTION_EXTENSION: &str = ".sln";

static TARGET_FRAMEWORK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<TargetFrameworks?>([^<]*)</TargetFrameworks?>").expect("invalid regex"));

/// Classifier rules and pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSettings {
    /// Maximum number of repositories classified concurrently
    pub workers: usize,

    /// Pause after every manifest fetch
    #[serde(with = "humantime_serde")]
    pub fetch_delay: Duration,

    /// Accepted framework monikers, e.g. `net6.0`
    pub frameworks: Vec<String>,

    /// Package names that mark a request-handling (MVC) project
    pub mvc_keywords: Vec<String>,

    /// Package names that mark a data-binding (MVVM) project
    pub mvvm_keywords: Vec<String>,

    /// Case-insensitive markers of a test project
    pub test_keywords: Vec<String>,
}

/// A project manifest and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: String,
    pub content: String,
}

/// Where the repository's solution file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionLookup {
    None,
    One(String),
    Many(usize),
}

/// Whether a path is a project or solution file.
#[must_use]
pub fn is_ecosystem_path(path: &str) -> bool {
    path.ends_with(PROJECT_EXTENSION) || path.ends_with(SOLUTION_EXTENSION)
}

/// Locate the single solution file in a listing.
#[must_use]
pub fn find_solution<S: AsRef<str>>(paths: &[S]) -> SolutionLookup {
    let solutions: Vec<&str> = paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| p.ends_with(SOLUTION_EXTENSION))
        .collect();

    match solutions.as_slice() {
        [] => SolutionLookup::None,
        [single] => SolutionLookup::One(parent_dir(single).to_string()),
        many => SolutionLookup::Many(many.len()),
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Framework monikers declared by a manifest, in declaration order.
#[must_use]
pub fn target_frameworks(content: &str) -> Vec<&str> {
    TARGET_FRAMEWORK_REGEX
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .flat_map(|m| m.as_str().split(';'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Map a framework moniker to the SDK version label used in the candidate list.
#[must_use]
pub fn sdk_label(moniker: &str) -> String {
    format!("{}.x", moniker.strip_prefix("net").unwrap_or(moniker))
}

/// The SDK version of the first manifest targeting an accepted framework.
#[must_use]
pub fn detect_sdk_version(settings: &ScanSettings, manifests: &[Manifest]) -> Option<String> {
    manifests.iter().find_map(|m| {
        let declared = target_frameworks(&m.content);
        settings
            .frameworks
            .iter()
            .find(|wanted| declared.iter().any(|d| d.starts_with(wanted.as_str())))
            .map(|wanted| sdk_label(wanted))
    })
}

/// The architecture of the first manifest mentioning a known framework package.
#[must_use]
pub fn detect_architecture(settings: &ScanSettings, manifests: &[Manifest]) -> Architecture {
    let mentions = |content: &str, keywords: &[String]| keywords.iter().any(|k| content.contains(k.as_str()));

    manifests
        .iter()
        .find_map(|m| {
            if mentions(&m.content, &settings.mvc_keywords) {
                Some(Architecture::Mvc)
            } else if mentions(&m.content, &settings.mvvm_keywords) {
                Some(Architecture::Mvvm)
            } else {
                None
            }
        })
        .unwrap_or_default()
}

/// Whether any manifest looks like part of a test suite.
#[must_use]
pub fn detect_tests(settings: &ScanSettings, manifests: &[Manifest]) -> bool {
    let keywords: Vec<String> = settings.test_keywords.iter().map(|k| k.to_ascii_lowercase()).collect();

    manifests.iter().any(|m| {
        let path = m.path.to_ascii_lowercase();
        let content = m.content.to_ascii_lowercase();
        keywords.iter().any(|k| path.contains(k.as_str()) || content.contains(k.as_str()))
    })
}

/// Apply every classification rule to an already-fetched repository.
///
/// Without exactly one solution file the record is left entirely unclassified.
#[must_use]
pub fn classify_listing<S: AsRef<str>>(
    settings: &ScanSettings,
    repo: DiscoveredRepo,
    paths: &[S],
    manifests: &[Manifest],
) -> Classification {
    let SolutionLookup::One(solution_dir) = find_solution(paths) else {
        return Classification::unclassified(repo);
    };

    let mut record = Classification::unclassified(repo);
    record.is_target_ecosystem = paths.iter().any(|p| is_ecosystem_path(p.as_ref()));
    record.sdk_version = detect_sdk_version(settings, manifests);
    record.architecture = detect_architecture(settings, manifests);
    record.has_tests = detect_tests(settings, manifests);
    record.solution_dir = Some(solution_dir);
    record
}

/// Fetch and classify one repository.
///
/// Failure to list the repository yields an unclassified record. Manifests that fail
/// to download are skipped.
pub async fn classify(client: &Client, settings: &ScanSettings, repo: DiscoveredRepo) -> Classification {
    let repo_ref = repo.repo_ref();

    let Some(tree) = fetch_tree(client, &repo_ref).await else {
        return Classification::unclassified(repo);
    };

    match find_solution(tree.paths.as_slice()) {
        SolutionLookup::One(_) => {}
        SolutionLookup::None => {
            log::debug!(target: LOG_TARGET, "{repo_ref}: no solution file");
            return classify_listing(settings, repo, tree.paths.as_slice(), &[]);
        }
        SolutionLookup::Many(n) => {
            log::debug!(target: LOG_TARGET, "{repo_ref}: {n} solution files, skipping");
            return classify_listing(settings, repo, tree.paths.as_slice(), &[]);
        }
    }

    let mut manifests = Vec::new();
    for path in tree.paths.iter().filter(|p| p.ends_with(PROJECT_EXTENSION)) {
        match fetch_raw(client, &repo_ref, &tree.branch, path).await {
            Ok(content) => manifests.push(Manifest {
                path: path.clone(),
                content,
            }),
            Err(e) => log::debug!(target: LOG_TARGET, "{repo_ref}: skipping manifest '{path}': {e:#}"),
        }
        tokio::time::sleep(settings.fetch_delay).await;
    }

    let record = classify_listing(settings, repo, tree.paths.as_slice(), &manifests);
    log::debug!(
        target: LOG_TARGET,
        "{repo_ref}: tests={} sdk={:?} architecture={} accepted={}",
        record.has_tests,
        record.sdk_version,
        record.architecture,
        record.is_accepted()
    );
    record
}
