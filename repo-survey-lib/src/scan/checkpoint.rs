use crate::Result;
use chrono::NaiveDate;
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "checkpoint";

/// Progress marker for a date-windowed crawl.
///
/// `current_date` is the start of the window being paginated; `end_cursor` resumes
/// pagination within that window, or is `None` at the start of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub current_date: NaiveDate,
    pub end_cursor: Option<String>,
}

/// Durable storage for a single [`Checkpoint`].
///
/// Saves are atomic (write to a sibling temporary file, then rename) and the
/// checkpoint date never moves backward.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    last: Option<Checkpoint>,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored checkpoint, or start from `default_start` when none exists.
    pub fn load(&mut self, default_start: NaiveDate) -> Result<Checkpoint> {
        let checkpoint = match fs::read_to_string(&self.path) {
            Ok(text) => {
                let checkpoint: Checkpoint =
                    serde_json::from_str(&text).into_app_err_with(|| format!("parsing checkpoint '{}'", self.path.display()))?;
                log::info!(
                    target: LOG_TARGET,
                    "Resuming crawl at {} (cursor: {})",
                    checkpoint.current_date,
                    checkpoint.end_cursor.as_deref().unwrap_or("none")
                );
                checkpoint
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Checkpoint {
                current_date: default_start,
                end_cursor: None,
            },
            Err(e) => return Err(e).into_app_err_with(|| format!("reading checkpoint '{}'", self.path.display())),
        };

        self.last = Some(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Persist a checkpoint.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written, or if `checkpoint` would move the crawl
    /// to an earlier date than the last one saved or loaded.
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(last) = &self.last
            && checkpoint.current_date < last.current_date
        {
            bail!(
                "checkpoint cannot move backward from {} to {}",
                last.current_date,
                checkpoint.current_date
            );
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(checkpoint).into_app_err("serializing checkpoint")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).into_app_err_with(|| format!("writing '{}'", tmp.display()))?;
        fs::rename(&tmp, &self.path).into_app_err_with(|| format!("replacing checkpoint '{}'", self.path.display()))?;

        log::debug!(target: LOG_TARGET, "Saved checkpoint {checkpoint:?}");
        self.last = Some(checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        let cp = store.load(date(2010, 1, 1)).unwrap();
        assert_eq!(cp.current_date, date(2010, 1, 1));
        assert_eq!(cp.end_cursor, None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("checkpoint.json");

        let mut store = CheckpointStore::new(&path);
        let cp = Checkpoint {
            current_date: date(2015, 3, 1),
            end_cursor: Some("Y3Vyc29yOjEwMA==".into()),
        };
        store.save(&cp).unwrap();

        let mut reopened = CheckpointStore::new(&path);
        assert_eq!(reopened.load(date(2010, 1, 1)).unwrap(), cp);
        assert!(!dir.path().join("state").join("checkpoint.json.tmp").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut store = CheckpointStore::new(&path);
        store
            .save(&Checkpoint {
                current_date: date(2020, 12, 31),
                end_cursor: None,
            })
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["current_date"], "2020-12-31");
        assert!(value["end_cursor"].is_null());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_date_never_moves_backward() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        store
            .save(&Checkpoint {
                current_date: date(2016, 1, 1),
                end_cursor: None,
            })
            .unwrap();

        // Same date with a new cursor is fine
        store
            .save(&Checkpoint {
                current_date: date(2016, 1, 1),
                end_cursor: Some("abc".into()),
            })
            .unwrap();

        let err = store
            .save(&Checkpoint {
                current_date: date(2015, 12, 1),
                end_cursor: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("backward"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = CheckpointStore::new(&path);
        let _ = store.load(date(2010, 1, 1)).unwrap_err();
    }
}
