use regex::Regex;
use std::sync::LazyLock;

/// The `Total` row of Coverlet's summary table: `| Total | line% | branch% | method% |`
static TOTAL_ROW_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*Total\s*\|\s*(\d+(?:\.\d+)?)%\s*\|\s*\d+(?:\.\d+)?%\s*\|\s*(\d+(?:\.\d+)?)%\s*\|").expect("invalid regex")
});

/// Line and method coverage reported by Coverlet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverageMetrics {
    pub line: Option<f64>,
    pub method: Option<f64>,
}

impl CoverageMetrics {
    /// Extract coverage from Coverlet console output.
    ///
    /// Output without a `Total` row yields both metrics absent.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        TOTAL_ROW_REGEX.captures(output).map_or_else(Self::default, |c| Self {
            line: c.get(1).and_then(|m| m.as_str().parse().ok()),
            method: c.get(2).and_then(|m| m.as_str().parse().ok()),
        })
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.line.is_some() && self.method.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "\
Calculating coverage result...
+-----------------+--------+--------+--------+
| Module          | Line   | Branch | Method |
+-----------------+--------+--------+--------+
| Shop.Core       | 81.2%  | 66.6%  | 90%    |
+-----------------+--------+--------+--------+

+---------+--------+--------+--------+
|         | Line   | Branch | Method |
+---------+--------+--------+--------+
| Total   | 81.25% | 66.66% | 90.5%  |
+---------+--------+--------+--------+
| Average | 81.25% | 66.66% | 90.5%  |
+---------+--------+--------+--------+
";

    #[test]
    fn test_total_row() {
        let m = CoverageMetrics::parse(SUMMARY);
        assert_eq!(m.line, Some(81.25));
        assert_eq!(m.method, Some(90.5));
        assert!(m.is_found());
    }

    #[test]
    fn test_integer_percentages() {
        let m = CoverageMetrics::parse("| Total | 100% | 0% | 75% |");
        assert_eq!(m.line, Some(100.0));
        assert_eq!(m.method, Some(75.0));
    }

    #[test]
    fn test_missing_total_row() {
        let m = CoverageMetrics::parse("| Module | Line | Branch | Method |\n| A | 1% | 2% | 3% |\n");
        assert_eq!(m, CoverageMetrics::default());
        assert!(!m.is_found());
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(CoverageMetrics::parse(""), CoverageMetrics::default());
    }
}
