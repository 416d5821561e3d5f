//! Mine GitHub for .NET projects and measure their test suites.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use repo_survey_lib::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host that runs real OS commands.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
#[cfg_attr(coverage_nightly, coverage(off))]
async fn main() -> Result<(), ohno::AppError> {
    // A missing .env file is fine; GITHUB_TOKENS may come from the environment or the command line.
    let _ = dotenvy::dotenv();
    run(&mut RealHost, std::env::args()).await
}
