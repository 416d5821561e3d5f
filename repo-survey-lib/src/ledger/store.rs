use super::LedgerRow;
use crate::Result;
use crate::github::RepoRef;
use crate::scan::Candidate;
use core::marker::PhantomData;
use ohno::{IntoAppError, app_err, bail};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "    ledger";

/// A completed row: who it was for and the ledger byte offset just past it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexEntry {
    repo: RepoRef,
    end: u64,
}

/// Append-only CSV of per-repository results with a sidecar index of completed identities.
///
/// Every row is synced to the ledger before its identity is appended to the index
/// (`<ledger>.index`, one `owner/name<TAB>offset` line per row, where `offset` is the
/// ledger length just after the row). Opening the ledger reconciles the two files:
///
/// - rows past the last indexed offset (a crash between the two writes) are indexed;
/// - a torn final row is truncated away;
/// - a missing or inconsistent index is rebuilt from the ledger.
#[derive(Debug)]
pub struct Ledger<R> {
    path: PathBuf,
    file: File,
    index: File,
    completed: HashSet<RepoRef>,
    rows: usize,
    _row: PhantomData<fn(&R)>,
}

impl<R: LedgerRow> Ledger<R> {
    /// Open or create a ledger.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, or if an existing ledger has different columns.
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
            .into_app_err_with(|| format!("opening ledger '{}'", path.display()))?;

        let header_end = ensure_header(&mut file, &path, R::HEADERS)?;
        let index_path = index_path_for(&path);

        let entries = match load_index(&index_path)? {
            StoredIndex::Loaded(entries) if index_is_consistent(&file, &entries, header_end)? => {
                let last = entries.last().map_or(header_end, |e| e.end);
                let tail = scan_records(&mut file, &path, last, R::HEADERS.len())?;
                if !tail.is_empty() {
                    log::info!(target: LOG_TARGET, "Indexing {} unindexed row(s) in '{}'", tail.len(), path.display());
                    append_index_lines(&index_path, &tail)?;
                }
                entries.into_iter().chain(tail).collect()
            }
            stored => {
                if !matches!(stored, StoredIndex::Missing) {
                    log::warn!(target: LOG_TARGET, "Index for '{}' is inconsistent, rebuilding", path.display());
                }
                let entries = scan_records(&mut file, &path, header_end, R::HEADERS.len())?;
                write_index(&index_path, &entries)?;
                entries
            }
        };

        let index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .into_app_err_with(|| format!("opening ledger index '{}'", index_path.display()))?;

        let rows = entries.len();
        let completed = entries.into_iter().map(|e| e.repo).collect();

        Ok(Self {
            path,
            file,
            index,
            completed,
            rows,
            _row: PhantomData,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows in the ledger.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Whether a row for `repo` has already been recorded.
    #[must_use]
    pub fn is_completed(&self, repo: &RepoRef) -> bool {
        self.completed.contains(repo)
    }

    /// Position in `candidates` just after the last one already recorded.
    #[must_use]
    pub fn resume_position(&self, candidates: &[Candidate]) -> usize {
        candidates
            .iter()
            .rposition(|c| self.is_completed(&c.repo_ref()))
            .map_or(0, |i| i + 1)
    }

    /// Append a row, syncing it to disk before recording it as completed.
    pub fn append(&mut self, row: &R) -> Result<()> {
        let repo = row.repo();
        let bytes = encode_record(row.to_record())?;

        self.file
            .write_all(&bytes)
            .into_app_err_with(|| format!("appending to ledger '{}'", self.path.display()))?;
        self.file.flush().into_app_err("flushing ledger")?;
        self.file.sync_data().into_app_err("syncing ledger")?;

        let end = self.file.metadata().into_app_err("reading ledger length")?.len();
        writeln!(self.index, "{repo}\t{end}").into_app_err("appending to ledger index")?;
        self.index.flush().into_app_err("flushing ledger index")?;

        let _ = self.completed.insert(repo);
        self.rows += 1;
        Ok(())
    }
}

fn index_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".index");
    PathBuf::from(name)
}

fn encode_record<I, T>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields).into_app_err("encoding ledger record")?;
    writer.into_inner().map_err(|e| app_err!("encoding ledger record: {}", e.error()))
}

fn byte_at(file: &mut File, offset: u64) -> io::Result<u8> {
    let _ = file.seek(SeekFrom::Start(offset))?;
    let mut byte = [0_u8; 1];
    file.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    Ok(len == 0 || byte_at(file, len - 1)? == b'\n')
}

/// Make sure the ledger starts with the expected header, writing it if the file is
/// new. Returns the byte offset just past the header.
fn ensure_header(file: &mut File, path: &Path, headers: &[&str]) -> Result<u64> {
    let len = file.metadata().into_app_err("reading ledger length")?.len();

    if len > 0 {
        let _ = file.seek(SeekFrom::Start(0)).into_app_err("seeking ledger")?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&mut *file);
        let mut record = csv::StringRecord::new();
        let found = reader
            .read_record(&mut record)
            .into_app_err_with(|| format!("reading header of '{}'", path.display()))?;
        let end = reader.position().byte();
        drop(reader);

        if found && (end < len || ends_with_newline(file, len).into_app_err("reading ledger")?) {
            if !record.iter().eq(headers.iter().copied()) {
                bail!(
                    "ledger '{}' has columns {:?}, expected {:?}",
                    path.display(),
                    record.iter().collect::<Vec<_>>(),
                    headers
                );
            }
            return Ok(end);
        }

        log::warn!(target: LOG_TARGET, "Discarding torn header of '{}'", path.display());
        file.set_len(0).into_app_err("truncating ledger")?;
    }

    let bytes = encode_record(headers)?;
    file.write_all(&bytes).into_app_err("writing ledger header")?;
    file.sync_data().into_app_err("syncing ledger")?;
    Ok(bytes.len() as u64)
}

/// Parse every complete record from `start` to the end of the ledger.
///
/// Each record must re-encode to exactly the bytes it was read from. A record torn
/// mid-write (no terminating newline, an unclosed quote, the wrong number of fields)
/// fails that check, ends the scan, and the ledger is truncated to the last good record.
fn scan_records(file: &mut File, path: &Path, start: u64, columns: usize) -> Result<Vec<IndexEntry>> {
    let len = file.metadata().into_app_err("reading ledger length")?.len();
    if start >= len {
        return Ok(Vec::new());
    }

    let _ = file.seek(SeekFrom::Start(start)).into_app_err("seeking ledger")?;
    let mut tail = Vec::new();
    let _ = file
        .read_to_end(&mut tail)
        .into_app_err_with(|| format!("reading ledger '{}'", path.display()))?;

    let mut entries = Vec::new();
    let mut good_end = 0_usize;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(tail.as_slice());
    let mut record = csv::StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let Ok(end) = usize::try_from(reader.position().byte()) else {
                    break;
                };
                let raw = tail.get(good_end..end).unwrap_or_default();
                if record.len() != columns || encode_record(record.iter())? != raw {
                    break;
                }
                good_end = end;
                entries.push(IndexEntry {
                    repo: RepoRef::new(&record[1], &record[0]),
                    end: start + good_end as u64,
                });
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unreadable record in '{}': {e}", path.display());
                break;
            }
        }
    }

    let good_end = start + good_end as u64;
    if good_end < len {
        log::warn!(
            target: LOG_TARGET,
            "Truncating {} byte(s) of incomplete data from '{}'",
            len - good_end,
            path.display()
        );
        file.set_len(good_end).into_app_err("truncating ledger")?;
        file.sync_all().into_app_err("syncing ledger")?;
    }

    Ok(entries)
}

/// What was found at the index path.
#[derive(Debug)]
enum StoredIndex {
    Missing,
    Corrupt,
    Loaded(Vec<IndexEntry>),
}

fn parse_index_line(line: &str) -> Option<IndexEntry> {
    let (key, offset) = line.rsplit_once('\t')?;
    let (owner, name) = key.split_once('/')?;
    Some(IndexEntry {
        repo: RepoRef::new(owner, name),
        end: offset.parse().ok()?,
    })
}

fn load_index(path: &Path) -> Result<StoredIndex> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredIndex::Missing),
        Err(e) => return Err(e).into_app_err_with(|| format!("opening ledger index '{}'", path.display())),
    };

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.into_app_err_with(|| format!("reading ledger index '{}'", path.display()))?;
        if line.is_empty() {
            continue;
        }

        match parse_index_line(&line) {
            Some(entry) => entries.push(entry),
            None => return Ok(StoredIndex::Corrupt),
        }
    }

    Ok(StoredIndex::Loaded(entries))
}

/// Offsets must increase strictly, stay within the ledger and land on record boundaries.
fn index_is_consistent(file: &File, entries: &[IndexEntry], header_end: u64) -> Result<bool> {
    let mut file = file.try_clone().into_app_err("cloning ledger handle")?;
    let len = file.metadata().into_app_err("reading ledger length")?.len();

    let mut previous = header_end;
    for entry in entries {
        if entry.end <= previous || entry.end > len {
            return Ok(false);
        }
        previous = entry.end;
    }

    if entries.is_empty() {
        return Ok(true);
    }

    Ok(byte_at(&mut file, previous - 1).into_app_err("reading ledger")? == b'\n')
}

fn format_index_line(entry: &IndexEntry) -> String {
    format!("{}\t{}\n", entry.repo, entry.end)
}

fn write_index(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let text: String = entries.iter().map(format_index_line).collect();
    fs::write(&tmp, text).into_app_err_with(|| format!("writing '{}'", tmp.display()))?;
    fs::rename(&tmp, path).into_app_err_with(|| format!("replacing ledger index '{}'", path.display()))?;
    Ok(())
}

fn append_index_lines(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    let mut index = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .into_app_err_with(|| format!("opening ledger index '{}'", path.display()))?;

    let text: String = entries.iter().map(format_index_line).collect();
    index.write_all(text.as_bytes()).into_app_err("appending to ledger index")?;
    index.sync_data().into_app_err("syncing ledger index")?;
    Ok(())
}
