//! Locating the compiled test assembly after `dotnet test`.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

const LOG_TARGET: &str = "  assembly";

/// Framework output folders probed, newest first
const FRAMEWORK_DIRS: [&str; 3] = ["net9.0", "net8.0", "net6.0"];

const CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];

/// Lines in which `dotnet test` names the assembly it ran, in English and Portuguese
static RUN_LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Execução de teste para (.+\.Tests?\.dll)",
        r"Test execution for (.+\.Tests?\.dll)",
        r"Test results for: (.+\.Tests?\.dll)",
        r"Test run for (.+\.Tests?\.dll)",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("invalid regex"))
    .collect()
});

static ASSEMBLY_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+\.Tests?\.dll)").expect("invalid regex"));

fn is_test_assembly_name(name: &str) -> bool {
    name.ends_with(".Tests.dll") || name.ends_with(".Test.dll")
}

fn resolve(test_dir: &Path, reported: &str) -> PathBuf {
    let path = Path::new(reported.trim());
    if path.is_absolute() { path.to_path_buf() } else { test_dir.join(path) }
}

/// Files under a `bin` folder of `root` matching `accept`, in a stable order.
fn find_in_bin_dirs(root: &Path, accept: impl Fn(&str) -> bool) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(&accept))
        .find(|e| {
            e.path()
                .strip_prefix(root)
                .is_ok_and(|rel| rel.components().any(|c| c.as_os_str() == "bin"))
        })
        .map(walkdir::DirEntry::into_path)
}

/// Find the test assembly produced by a `dotnet test` run in `test_dir`.
///
/// Tries, in order: a path reported by the run that exists on disk; the assembly
/// name mentioned in the output looked up in the conventional `bin` folders; and
/// finally any `*.Tests.dll` or `*.Test.dll` under a `bin` folder.
#[must_use]
pub fn find_test_assembly(test_dir: &Path, test_output: &str) -> Option<PathBuf> {
    for pattern in RUN_LINE_PATTERNS.iter() {
        if let Some(m) = pattern.captures(test_output).and_then(|c| c.get(1)) {
            let path = resolve(test_dir, m.as_str());
            if path.is_file() {
                log::debug!(target: LOG_TARGET, "Test assembly reported by run: {}", path.display());
                return Some(path);
            }
        }
    }

    if let Some(m) = ASSEMBLY_NAME_REGEX.captures(test_output).and_then(|c| c.get(1))
        && let Some(name) = Path::new(m.as_str()).file_name().and_then(|n| n.to_str())
    {
        for configuration in CONFIGURATIONS {
            for framework in FRAMEWORK_DIRS {
                let path = test_dir.join("bin").join(configuration).join(framework).join(name);
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        if let Some(path) = find_in_bin_dirs(test_dir, |file| file == name) {
            return Some(path);
        }
    }

    let found = find_in_bin_dirs(test_dir, is_test_assembly_name);
    if found.is_none() {
        log::debug!(target: LOG_TARGET, "No test assembly under '{}'", test_dir.display());
    }
    found
}

fn has_project_file(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(Result::ok)
            .any(|e| e.path().extension().is_some_and(|ext| ext == "csproj"))
    })
}

/// The nearest ancestor of `assembly` containing a project file, or `fallback` if none does.
#[must_use]
pub fn find_project_dir(assembly: &Path, fallback: &Path) -> PathBuf {
    assembly
        .ancestors()
        .skip(1)
        .find(|dir| has_project_file(dir))
        .map_or_else(|| fallback.to_path_buf(), Path::to_path_buf)
}
