//! Integration tests for the `mutate` and `coverage` commands.
//!
//! `git`, `dotnet` and `coverlet` are replaced by small shell scripts, so these tests
//! only run on unix-like systems.

#![cfg(unix)]

use repo_survey_lib::Host;
use repo_survey_lib::scan::{Architecture, Candidate, write_candidates};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Test host that captures output to in-memory buffers.
#[derive(Default)]
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
}

impl TestHost {
    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl std::io::Write {
        &mut self.error_buf
    }

    fn exit(&mut self, _code: i32) {}
}

/// Clones by creating a directory holding a solution file; fails for URLs mentioning `gone`.
const FAKE_GIT: &str = r#"#!/bin/sh
for last; do :; done
case "$*" in
  *gone*) echo "fatal: repository 'gone' not found" >&2; exit 128 ;;
esac
mkdir -p "$last" && touch "$last/App.sln"
"#;

/// Builds everything except directories named `broken` or `quiet`; fakes Stryker and `dotnet test`.
const FAKE_DOTNET: &str = r#"#!/bin/sh
case "$1" in
  build)
    case "$PWD" in
      *broken*) echo "error CS1002: ; expected" >&2; exit 1 ;;
      *quiet*) echo "Program.cs(3,1): error CS0246: type 'Foo' could not be found"; exit 1 ;;
    esac
    echo "Build succeeded."
    ;;
  stryker)
    echo "[Info] 10 mutants created"
    echo "[Info] 1 mutants got status NoCoverage"
    echo "Killed:   7"
    echo "Survived: 2"
    echo "Timeout:  1"
    echo "The final mutation score is 73.50 %"
    echo "Time Elapsed 00:01:02.345"
    ;;
  test)
    project="$PWD/tests/App.Tests"
    mkdir -p "$project/bin/Debug/net6.0"
    touch "$project/App.Tests.csproj" "$project/bin/Debug/net6.0/App.Tests.dll"
    echo "Test run for $project/bin/Debug/net6.0/App.Tests.dll (.NETCoreApp,Version=v6.0)"
    echo "Passed!  - Failed: 0, Passed: 12, Skipped: 0, Total: 12"
    ;;
esac
"#;

const FAKE_COVERLET: &str = r"#!/bin/sh
echo 'Calculating coverage result...'
echo '| Module   | Line   | Branch | Method |'
echo '| Total    | 81.25% | 66.66% | 90.5%  |'
";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    let mut permissions = fs::metadata(&path).expect("script metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("make script executable");
    path
}

fn candidate(name: &str, solution_dir: &str) -> Candidate {
    Candidate {
        name: name.into(),
        owner: "acme".into(),
        stars: 150,
        sdk: "6.0.x".into(),
        architecture: Architecture::Mvc,
        solution_dir: solution_dir.into(),
    }
}

struct Workspace {
    _temp_dir: tempfile::TempDir,
    root: PathBuf,
    config: String,
}

impl Workspace {
    fn new(candidates: &[Candidate]) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let bin = root.join("bin");
        fs::create_dir_all(&bin).expect("create bin dir");

        let git = write_script(&bin, "git", FAKE_GIT);
        let dotnet = write_script(&bin, "dotnet", FAKE_DOTNET);
        let coverlet = write_script(&bin, "coverlet", FAKE_COVERLET);

        let data = root.join("data");
        write_candidates(&data.join("candidates.csv"), candidates).expect("write candidates");

        let config = format!(
            r#"
[github]
graphql_url = "http://127.0.0.1:9/graphql"
api_url = "http://127.0.0.1:9"
raw_url = "http://127.0.0.1:9"
clone_url = "https://example.invalid"
rate_limit_pause = "1ms"
request_timeout = "1s"
branches = ["main"]

[search]
language = "C#"
min_stars = 100
start_date = "2020-01-01"
end_date = "2020-01-31"
window_days = 30
page_delay = "0s"

[scan]
workers = 1
fetch_delay = "0s"
frameworks = ["net6.0"]
mvc_keywords = ["Microsoft.AspNetCore.Mvc"]
mvvm_keywords = ["CommunityToolkit.Mvvm"]
test_keywords = ["xunit"]

[paths]
clone_dir = "{data}/clones"
checkpoint = "{data}/checkpoint.json"
discovery_log = "{data}/discovered.jsonl"
candidates = "{data}/candidates.csv"
mutation_ledger = "{data}/mutation.csv"
coverage_ledger = "{data}/coverage.csv"
age_output = "{data}/age.csv"

[tools]
git = "{git}"
dotnet = "{dotnet}"
coverlet = "{coverlet}"
git_timeout = "30s"
"#,
            data = data.display(),
            git = git.display(),
            dotnet = dotnet.display(),
            coverlet = coverlet.display(),
        );

        let config_path = root.join("survey.toml");
        fs::write(&config_path, config).expect("write config");

        Self {
            _temp_dir: temp_dir,
            root,
            config: config_path.to_str().expect("valid path").to_string(),
        }
    }

    fn data(&self, name: &str) -> PathBuf {
        self.root.join("data").join(name)
    }

    async fn run(&self, command: &str) -> String {
        let mut host = TestHost::default();
        repo_survey_lib::run(
            &mut host,
            ["repo-survey", command, "--config", self.config.as_str(), "--log-level", "none"],
        )
        .await
        .unwrap_or_else(|e| panic!("{command} failed: {e:#}"));
        host.output_str()
    }
}

/// Ledger rows keyed by column name.
fn read_ledger(path: &Path) -> Vec<std::collections::HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).expect("open ledger");
    let headers = reader.headers().expect("ledger headers").clone();
    reader
        .records()
        .map(|record| {
            let record = record.expect("ledger record");
            headers.iter().zip(record.iter()).map(|(h, v)| (h.to_string(), v.to_string())).collect()
        })
        .collect()
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot spawn processes")]
async fn test_mutation_run_records_every_outcome() {
    let workspace = Workspace::new(&[
        candidate("shop", ""),
        candidate("broken", ""),
        candidate("missing", "src"),
        candidate("gone", ""),
    ]);

    let output = workspace.run("mutate").await;
    assert!(output.contains("1 succeeded, 3 failed, 0 already recorded"), "{output}");

    let rows = read_ledger(&workspace.data("mutation.csv"));
    assert_eq!(rows.len(), 4);

    let shop = &rows[0];
    assert_eq!(shop["Name"], "shop");
    assert_eq!(shop["Status"], "Success");
    assert_eq!(shop["Killed"], "7");
    assert_eq!(shop["Survived"], "2");
    assert_eq!(shop["Timeout"], "1");
    assert_eq!(shop["Mutation Score"], "73.5");
    assert_eq!(shop["Total Mutants"], "10");
    assert_eq!(shop["Mutants No Coverage"], "1");
    assert_eq!(shop["Mutants Ignored"], "N/A");
    assert_eq!(shop["Time Elapsed"], "00:01:02.345");
    assert_eq!(shop["Error"], "");

    assert_eq!(rows[1]["Status"], "Build Failed");
    assert_eq!(rows[1]["Error"], "error CS1002: ; expected");
    assert_eq!(rows[1]["Killed"], "N/A");

    assert_eq!(rows[2]["Status"], "Solution Directory Missing");
    assert!(rows[2]["Error"].contains("src"));

    assert_eq!(rows[3]["Status"], "Clone Failed");
    assert!(rows[3]["Error"].contains("not found"));

    // Every clone is deleted once its row is written.
    let clones = workspace.data("clones").join("acme");
    for name in ["shop", "broken", "missing", "gone"] {
        assert!(!clones.join(name).exists(), "{name} was not deleted");
    }

    // A second run finds everything already recorded.
    let output = workspace.run("mutate").await;
    assert!(output.contains("0 succeeded, 0 failed, 4 already recorded"), "{output}");
    assert_eq!(read_ledger(&workspace.data("mutation.csv")).len(), 4);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot spawn processes")]
async fn test_mutation_run_resumes_after_last_recorded_repository() {
    let workspace = Workspace::new(&[candidate("shop", ""), candidate("broken", "")]);
    let _ = workspace.run("mutate").await;

    // New candidates appended to the list are picked up; recorded ones are not redone.
    write_candidates(
        &workspace.data("candidates.csv"),
        &[candidate("shop", ""), candidate("broken", ""), candidate("extra", "")],
    )
    .expect("rewrite candidates");

    let output = workspace.run("mutate").await;
    assert!(output.contains("1 succeeded, 0 failed, 2 already recorded"), "{output}");

    let rows = read_ledger(&workspace.data("mutation.csv"));
    let names: Vec<_> = rows.iter().map(|r| r["Name"].as_str()).collect();
    assert_eq!(names, ["shop", "broken", "extra"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot spawn processes")]
async fn test_build_failure_reported_on_stdout_is_recorded() {
    let workspace = Workspace::new(&[candidate("quiet", "")]);

    let output = workspace.run("mutate").await;
    assert!(output.contains("0 succeeded, 1 failed"), "{output}");

    let rows = read_ledger(&workspace.data("mutation.csv"));
    assert_eq!(rows[0]["Status"], "Build Failed");
    assert_eq!(rows[0]["Error"], "Program.cs(3,1): error CS0246: type 'Foo' could not be found");
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot spawn processes")]
async fn test_coverage_run() {
    let workspace = Workspace::new(&[candidate("shop", ""), candidate("gone", "")]);

    let output = workspace.run("coverage").await;
    assert!(output.contains("coverage run: 1 succeeded, 1 failed"), "{output}");

    let rows = read_ledger(&workspace.data("coverage.csv"));
    assert_eq!(rows.len(), 2);

    let shop = &rows[0];
    assert_eq!(shop["Status"], "Success");
    assert_eq!(shop["Line Coverage (%)"], "81.25");
    assert_eq!(shop["Method Coverage (%)"], "90.5");
    assert_eq!(shop["Tested Directory"], "tests/App.Tests");

    assert_eq!(rows[1]["Status"], "Clone Failed");
    assert_eq!(rows[1]["Line Coverage (%)"], "N/A");
    assert!(!workspace.data("clones").join("acme").join("shop").exists());
}
