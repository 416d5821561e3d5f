use super::Candidate;
use crate::github::DiscoveredRepo;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Architectural style of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize)]
pub enum Architecture {
    /// Request-handling style
    #[strum(serialize = "MVC")]
    #[serde(rename = "MVC")]
    Mvc,

    /// Data-binding style
    #[strum(serialize = "MVVM")]
    #[serde(rename = "MVVM")]
    Mvvm,

    #[default]
    #[strum(serialize = "Unknown")]
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Everything the classifier derived about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub repo: DiscoveredRepo,
    pub is_target_ecosystem: bool,
    pub has_tests: bool,
    pub sdk_version: Option<String>,
    pub architecture: Architecture,

    /// Directory of the single solution file, relative to the repository root.
    /// The root itself is the empty string.
    pub solution_dir: Option<String>,
}

impl Classification {
    /// A record with every derived attribute unset.
    #[must_use]
    pub const fn unclassified(repo: DiscoveredRepo) -> Self {
        Self {
            repo,
            is_target_ecosystem: false,
            has_tests: false,
            sdk_version: None,
            architecture: Architecture::Unknown,
            solution_dir: None,
        }
    }

    /// Whether the repository passes every gate and should become a candidate.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.is_target_ecosystem
            && self.has_tests
            && self.sdk_version.is_some()
            && self.architecture != Architecture::Unknown
            && self.solution_dir.is_some()
    }

    /// Convert an accepted record into a candidate row.
    #[must_use]
    pub fn into_candidate(self) -> Option<Candidate> {
        if !self.is_accepted() {
            return None;
        }

        Some(Candidate {
            name: self.repo.name,
            owner: self.repo.owner,
            stars: self.repo.stars,
            sdk: self.sdk_version?,
            architecture: self.architecture,
            solution_dir: self.solution_dir?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn repo() -> DiscoveredRepo {
        DiscoveredRepo {
            owner: "o".into(),
            name: "n".into(),
            stars: 150,
        }
    }

    fn accepted() -> Classification {
        Classification {
            repo: repo(),
            is_target_ecosystem: true,
            has_tests: true,
            sdk_version: Some("6.0.x".into()),
            architecture: Architecture::Mvc,
            solution_dir: Some(String::new()),
        }
    }

    #[test]
    fn test_architecture_names() {
        assert_eq!(Architecture::Mvc.to_string(), "MVC");
        assert_eq!(Architecture::Mvvm.to_string(), "MVVM");
        assert_eq!(Architecture::from_str("MVVM").unwrap(), Architecture::Mvvm);
    }

    #[test]
    fn test_unclassified_is_rejected() {
        assert!(!Classification::unclassified(repo()).is_accepted());
    }

    #[test]
    fn test_every_gate_is_required() {
        assert!(accepted().is_accepted());

        let mut c = accepted();
        c.is_target_ecosystem = false;
        assert!(!c.is_accepted());

        let mut c = accepted();
        c.has_tests = false;
        assert!(!c.is_accepted());

        let mut c = accepted();
        c.sdk_version = None;
        assert!(!c.is_accepted());

        let mut c = accepted();
        c.architecture = Architecture::Unknown;
        assert!(!c.is_accepted());

        let mut c = accepted();
        c.solution_dir = None;
        assert!(!c.is_accepted());
    }

    #[test]
    fn test_into_candidate() {
        let candidate = accepted().into_candidate().unwrap();
        assert_eq!(candidate.owner, "o");
        assert_eq!(candidate.sdk, "6.0.x");
        assert_eq!(candidate.solution_dir, "");

        assert!(Classification::unclassified(repo()).into_candidate().is_none());
    }
}
