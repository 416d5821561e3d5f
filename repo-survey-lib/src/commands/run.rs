//! Command dispatch logic for repo-survey

use super::{AgeArgs, AnalyzeArgs, DiscoverArgs, InitArgs, discover, init_config, report_age, run_coverage, run_mutation};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-survey", version, author, long_about = None)]
#[command(about = "Mine GitHub for .NET projects and measure their test suites")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: SurveySubcommand,
}

#[derive(Subcommand, Debug)]
enum SurveySubcommand {
    /// Search GitHub and write the list of candidate repositories
    Discover(Box<DiscoverArgs>),
    /// Run mutation testing over the candidates
    Mutate(Box<AnalyzeArgs>),
    /// Measure test coverage of the candidates
    Coverage(Box<AnalyzeArgs>),
    /// Add repository age to a result ledger
    Age(Box<AgeArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        SurveySubcommand::Discover(discover_args) => discover(host, discover_args).await,
        SurveySubcommand::Mutate(analyze_args) => run_mutation(host, analyze_args).await,
        SurveySubcommand::Coverage(analyze_args) => run_coverage(host, analyze_args).await,
        SurveySubcommand::Age(age_args) => report_age(host, age_args).await,
        SurveySubcommand::Init(init_args) => init_config(host, init_args),
    }
}
