use crate::Result;
use crate::github::DiscoveredRepo;
use ohno::IntoAppError;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = " discovery";

/// Append-only JSON-lines record of every repository returned by search.
///
/// Each page is durable before the crawl checkpoint moves past it, so a resumed
/// crawl still classifies repositories found before an interruption.
#[derive(Debug)]
pub struct DiscoveryLog {
    path: PathBuf,
    file: File,
}

impl DiscoveryLog {
    /// Open (creating if needed) the log for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .into_app_err_with(|| format!("opening discovery log '{}'", path.display()))?;

        // Terminate a record torn by a crash so the next append starts on its own line
        if !ends_with_newline(&mut file).into_app_err_with(|| format!("inspecting discovery log '{}'", path.display()))? {
            file.write_all(b"\n").into_app_err("repairing discovery log")?;
        }

        Ok(Self { path, file })
    }

    /// Append a page of repositories and sync it to disk.
    pub fn append(&mut self, repos: &[DiscoveredRepo]) -> Result<()> {
        if repos.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for repo in repos {
            serde_json::to_writer(&mut buf, repo).into_app_err("serializing discovered repository")?;
            buf.push(b'\n');
        }

        self.file
            .write_all(&buf)
            .into_app_err_with(|| format!("appending to discovery log '{}'", self.path.display()))?;
        self.file.flush().into_app_err("flushing discovery log")?;
        self.file.sync_data().into_app_err("syncing discovery log")?;
        Ok(())
    }

    /// Read every distinct repository recorded so far, in first-seen order.
    ///
    /// A missing file is an empty log. Lines that fail to parse (such as a record torn
    /// by a crash) are skipped with a warning.
    pub fn load(path: &Path) -> Result<Vec<DiscoveredRepo>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).into_app_err_with(|| format!("opening discovery log '{}'", path.display())),
        };

        let mut seen = HashSet::new();
        let mut repos = Vec::new();

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.into_app_err_with(|| format!("reading discovery log '{}'", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<DiscoveredRepo>(&line) {
                Ok(repo) => {
                    if seen.insert(repo.repo_ref()) {
                        repos.push(repo);
                    }
                }
                Err(e) => log::warn!(target: LOG_TARGET, "Skipping malformed line {} of '{}': {e}", i + 1, path.display()),
            }
        }

        Ok(repos)
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }

    let _ = file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
