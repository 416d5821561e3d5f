use crate::Result;
use crate::github::GitHubSettings;
use crate::scan::{ScanSettings, SearchSettings};
use crate::tools::ToolSettings;
use camino::Utf8Path;
use directories::BaseDirs;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked for in the current directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "survey.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub github: GitHubSettings,
    pub search: SearchSettings,
    pub scan: ScanSettings,
    pub paths: PathSettings,
    pub tools: ToolSettings,
}

/// Locations of every file the pipeline reads or writes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    /// Where repositories are cloned while being processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_dir: Option<PathBuf>,

    pub checkpoint: PathBuf,
    pub discovery_log: PathBuf,
    pub candidates: PathBuf,
    pub mutation_ledger: PathBuf,
    pub coverage_ledger: PathBuf,
    pub age_output: PathBuf,
}

impl PathSettings {
    /// The configured clone directory, or one under the platform cache directory.
    pub fn clone_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.clone_dir {
            return Ok(dir.clone());
        }

        Ok(BaseDirs::new()
            .into_app_err("could not determine cache directory")?
            .cache_dir()
            .join("repo-survey")
            .join("clones"))
    }
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `survey.toml` in the current directory is used when it
    /// exists and the built-in defaults otherwise.
    pub fn load(config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.to_owned(), text)
        } else {
            let path = Utf8Path::new(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(path) {
                Ok(text) => (path.to_owned(), text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.window_days == 0 {
            return Err(app_err!("search.window_days must be at least 1"));
        }

        if self.search.start_date >= self.search.end_date {
            return Err(app_err!(
                "search.start_date ({}) must be before search.end_date ({})",
                self.search.start_date,
                self.search.end_date
            ));
        }

        if self.scan.workers == 0 {
            return Err(app_err!("scan.workers must be at least 1"));
        }

        if self.scan.frameworks.is_empty() {
            return Err(app_err!("scan.frameworks must name at least one target framework"));
        }

        if self.github.branches.is_empty() {
            return Err(app_err!("github.branches must name at least one branch"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use chrono::NaiveDate;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.search.language, "C#");
        assert_eq!(config.search.min_stars, 100);
        assert_eq!(config.search.window_days, 30);
        assert_eq!(config.search.start_date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(config.scan.frameworks, ["net6.0"]);
        assert_eq!(config.github.branches, ["main", "master"]);
        assert!(config.paths.clone_dir.is_none());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.search.window_days = 0;
        assert!(config.validate().unwrap_err().to_string().contains("window_days"));
    }

    #[test]
    fn test_validate_reversed_dates() {
        let mut config = Config::default();
        config.search.end_date = config.search.start_date;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.scan.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_lists() {
        let mut config = Config::default();
        config.scan.frameworks.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.github.branches.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let text = DEFAULT_CONFIG_TOML.replace("[tools]", "[tools]\nmaven = \"mvn\"");
        let result = toml::from_str::<Config>(&text);
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_clone_dir() {
        let text = DEFAULT_CONFIG_TOML.replace("# clone_dir = \"clones\"", "clone_dir = \"clones\"");
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.paths.clone_dir().unwrap(), PathBuf::from("clones"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_save_default_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let output_path = Utf8PathBuf::try_from(tmp.path().join("survey.toml")).unwrap();
        Config::save_default(&output_path).unwrap();

        let loaded = Config::load(Some(output_path.as_path())).unwrap();
        assert_eq!(loaded.scan.workers, Config::default().scan.workers);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("survey.toml")).unwrap();
        fs::write(&path, DEFAULT_CONFIG_TOML.replace("workers = 24", "workers = 0")).unwrap();

        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Utf8Path::new("no/such/survey.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading configuration file"));
    }
}
