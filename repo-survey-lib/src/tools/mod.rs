//! External build, test, coverage and mutation tools.
//!
//! Programs run as child processes. Their textual output is parsed into typed metrics
//! where every field is optional: anything the output does not mention stays absent.

mod coverage;
pub mod dotnet;
mod mutation;
mod process;
mod test_assembly;

pub use coverage::CoverageMetrics;
pub use dotnet::ToolSettings;
pub use mutation::MutationMetrics;
pub use process::{Invocation, ToolOutput};
pub use test_assembly::{find_project_dir, find_test_assembly};
