//! Extraction of mutation-testing metrics from Stryker.NET console output.
//!
//! Each output line is checked against a table of label rules. The first rule whose
//! pattern matches stores its capture into the associated field; lines matching no
//! rule are ignored. A field that no line ever populated stays `None`, which is
//! distinct from a reported zero.

use regex::Regex;
use std::sync::LazyLock;

/// Metrics reported by a mutation-testing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationMetrics {
    pub killed: Option<u64>,
    pub survived: Option<u64>,
    pub timeout: Option<u64>,

    /// Wall-clock duration exactly as the tool printed it
    pub time_elapsed: Option<String>,

    /// Percentage, 0..=100
    pub mutation_score: Option<f64>,

    pub total: Option<u64>,
    pub compile_error: Option<u64>,
    pub no_coverage: Option<u64>,
    pub ignored: Option<u64>,
    pub skipped: Option<u64>,
    pub tested: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Killed,
    Survived,
    Timeout,
    TimeElapsed,
    MutationScore,
    Total,
    CompileError,
    NoCoverage,
    Ignored,
    Skipped,
    Tested,
}

struct Rule {
    pattern: Regex,
    field: Field,
}

fn rule(pattern: &str, field: Field) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("invalid regex"),
        field,
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"final mutation score is\s+(\d+(?:\.\d+)?|NaN)\s*%", Field::MutationScore),
        rule(r"(\d+)\s+mutants created", Field::Total),
        rule(r"(\d+)\s+mutants got status CompileError", Field::CompileError),
        rule(r"(\d+)\s+mutants got status NoCoverage", Field::NoCoverage),
        rule(r"(\d+)\s+mutants got status Ignored", Field::Ignored),
        rule(r"(\d+)\s+total mutants are skipped", Field::Skipped),
        rule(r"(\d+)\s+total mutants will be tested", Field::Tested),
        rule(r"Time Elapsed\b.*?(\S+)\s*$", Field::TimeElapsed),
        rule(r"\bKilled\s*:\s*(\d+)", Field::Killed),
        rule(r"\bSurvived\s*:\s*(\d+)", Field::Survived),
        rule(r"\bTimeout\s*:\s*(\d+)", Field::Timeout),
    ]
});

impl MutationMetrics {
    /// Parse a full tool transcript.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut metrics = Self::default();
        for line in output.lines() {
            metrics.apply_line(line);
        }
        metrics
    }

    /// Update from a single line of output.
    pub fn apply_line(&mut self, line: &str) {
        for rule in RULES.iter() {
            let Some(value) = rule.pattern.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str()) else {
                continue;
            };

            match rule.field {
                Field::Killed => self.killed = value.parse().ok(),
                Field::Survived => self.survived = value.parse().ok(),
                Field::Timeout => self.timeout = value.parse().ok(),
                Field::TimeElapsed => self.time_elapsed = Some(value.to_string()),
                Field::MutationScore => self.mutation_score = value.parse().ok(),
                Field::Total => self.total = value.parse().ok(),
                Field::CompileError => self.compile_error = value.parse().ok(),
                Field::NoCoverage => self.no_coverage = value.parse().ok(),
                Field::Ignored => self.ignored = value.parse().ok(),
                Field::Skipped => self.skipped = value.parse().ok(),
                Field::Tested => self.tested = value.parse().ok(),
            }
            return;
        }
    }

    /// Whether no field was found at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "\
[10:00:01 INF] Analysis starting.
[10:00:05 INF] 120 mutants created
[10:00:05 INF] 7 mutants got status CompileError. Reason: Mutant caused compile errors
[10:00:05 INF] 4 mutants got status Ignored. Reason: Removed by block already covered filter
[10:00:05 INF] 11 mutants got status NoCoverage. Reason: Not covered by any test
[10:00:05 INF] 22 total mutants are skipped because of errors or because they are ignored
[10:00:05 INF] 98 total mutants will be tested
Killed:   60
Survived: 25
Timeout:  2
[10:03:00 INF] Time Elapsed 00:02:59.1234
[10:03:00 INF] The final mutation score is 73.50 %
";

    #[test]
    fn test_full_transcript() {
        let m = MutationMetrics::parse(TRANSCRIPT);
        assert_eq!(m.total, Some(120));
        assert_eq!(m.compile_error, Some(7));
        assert_eq!(m.ignored, Some(4));
        assert_eq!(m.no_coverage, Some(11));
        assert_eq!(m.skipped, Some(22));
        assert_eq!(m.tested, Some(98));
        assert_eq!(m.killed, Some(60));
        assert_eq!(m.survived, Some(25));
        assert_eq!(m.timeout, Some(2));
        assert_eq!(m.time_elapsed.as_deref(), Some("00:02:59.1234"));
        assert_eq!(m.mutation_score, Some(73.5));
    }

    #[test]
    fn test_score_independent_of_line_order() {
        let first = MutationMetrics::parse("The final mutation score is 73.5 %\nKilled: 3\n");
        let last = MutationMetrics::parse("Killed: 3\nnoise\nThe final mutation score is 73.5 %");
        assert_eq!(first.mutation_score, Some(73.5));
        assert_eq!(last.mutation_score, Some(73.5));
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let m = MutationMetrics::parse("Killed: 0\n");
        assert_eq!(m.killed, Some(0));
        assert_eq!(m.survived, None);
        assert_eq!(m.mutation_score, None);
        assert!(!m.is_empty());
    }

    #[test]
    fn test_unrelated_output() {
        let m = MutationMetrics::parse("Build succeeded.\n    0 Warning(s)\n    0 Error(s)\n");
        assert!(m.is_empty());
    }

    #[test]
    fn test_empty_output() {
        assert!(MutationMetrics::parse("").is_empty());
    }

    #[test]
    fn test_nan_score() {
        let m = MutationMetrics::parse("[INF] The final mutation score is NaN %");
        assert!(m.mutation_score.unwrap().is_nan());
    }

    #[test]
    fn test_skipped_and_tested_are_separate() {
        let m = MutationMetrics::parse("5 total mutants are skipped\n9 total mutants will be tested\n");
        assert_eq!(m.skipped, Some(5));
        assert_eq!(m.tested, Some(9));
    }

    #[test]
    fn test_status_line_does_not_count_as_killed() {
        let m = MutationMetrics::parse("[INF] 3 mutants got status Ignored. Reason: Killed by filter");
        assert_eq!(m.ignored, Some(3));
        assert_eq!(m.killed, None);
    }
}
