//! Arguments and setup shared by every command that touches the pipeline.

use super::config::Config;
use crate::Result;
use crate::github::{Client, TokenPool};
use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use std::sync::Arc;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Whether progress output on stderr should be colored.
    #[must_use]
    pub fn use_colors_on_stderr(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments shared by the pipeline commands
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file (default is `survey.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,
}

/// GitHub credentials, for the commands that call the API
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// GitHub personal access tokens, rotated when one hits its rate limit
    #[arg(long, value_name = "TOKENS", env = "GITHUB_TOKENS", value_delimiter = ',', hide_env_values = true)]
    pub github_tokens: Vec<String>,
}

impl TokenArgs {
    /// Build a GitHub client over the configured credentials.
    pub fn client(&self, config: &Config) -> Result<Client> {
        let pool = TokenPool::new(&self.github_tokens)?;
        Client::new(Arc::new(pool), config.github.clone())
    }
}

impl CommonArgs {
    /// Initialize logging, then load and validate the configuration.
    pub fn setup(&self) -> Result<Config> {
        init_logging(self.log_level);
        Config::load(self.config.as_deref())
    }
}

/// Initialize logger based on log level
fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // Tests run several commands in one process; only the first logger sticks.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
