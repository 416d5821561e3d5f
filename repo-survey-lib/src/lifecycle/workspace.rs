use super::LOG_TARGET;
use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Name of the lock file kept in the work directory
const LOCK_FILE: &str = ".repo-survey.lock";

/// Exclusive hold on a work directory, released when dropped.
#[derive(Debug)]
pub struct WorkDirLock(File);

impl WorkDirLock {
    /// Take an exclusive advisory lock on `dir`, creating the directory if needed.
    ///
    /// Waits for any other process holding the lock to release it.
    pub async fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).into_app_err_with(|| format!("could not create work directory '{}'", dir.display()))?;

        let lock_path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .into_app_err_with(|| format!("opening lock file at '{}'", lock_path.display()))?;

        let file = tokio::task::spawn_blocking(move || {
            file.lock_exclusive()
                .into_app_err_with(|| format!("acquiring exclusive lock on '{}'", lock_path.display()))?;
            log::debug!(target: LOG_TARGET, "Acquired work directory lock at '{}'", lock_path.display());
            Ok::<_, ohno::AppError>(file)
        })
        .await
        .into_app_err("lock task panicked")??;

        Ok(Self(file))
    }
}

impl Drop for WorkDirLock {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not unlock work directory: {e:#}");
        }
    }
}

/// Delete a directory tree, best effort.
///
/// When the first attempt fails, write permission is restored on every entry and the
/// removal is retried once. Returns whether the tree is gone.
pub fn remove_tree(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }

    let Err(first) = fs::remove_dir_all(path) else {
        log::debug!(target: LOG_TARGET, "Deleted '{}'", path.display());
        return true;
    };

    log::debug!(target: LOG_TARGET, "Could not delete '{}' ({first}), clearing read-only flags", path.display());
    make_writable(path);

    match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            log::warn!(target: LOG_TARGET, "Could not delete '{}': {e}", path.display());
            false
        }
    }
}

fn make_writable(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(core::result::Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        let mut permissions = metadata.permissions();
        if !permissions.readonly() {
            continue;
        }

        set_writable(&mut permissions);
        let _ = fs::set_permissions(entry.path(), permissions);
    }
}

#[cfg(unix)]
fn set_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn set_writable(permissions: &mut fs::Permissions) {
    #[expect(clippy::permissions_set_readonly_false, reason = "only reached on platforms without mode bits")]
    permissions.set_readonly(false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_remove_missing_tree() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        assert!(remove_tree(&temp_dir.path().join("nothing-here")));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_remove_tree_with_read_only_entries() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("clone");
        let objects = root.join(".git").join("objects");
        fs::create_dir_all(&objects).unwrap();

        let pack = objects.join("pack-1.idx");
        fs::write(&pack, b"data").unwrap();

        for path in [&pack, &objects] {
            let mut permissions = fs::metadata(path).unwrap().permissions();
            permissions.set_readonly(true);
            fs::set_permissions(path, permissions).unwrap();
        }

        assert!(remove_tree(&root));
        assert!(!root.exists());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_lock_creates_directory_and_lock_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("work");

        let guard = WorkDirLock::acquire(&dir).await.unwrap();
        assert!(dir.join(LOCK_FILE).exists());
        assert!(format!("{guard:?}").contains("WorkDirLock"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_lock_released_on_drop() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let guard = WorkDirLock::acquire(temp_dir.path()).await.unwrap();
        drop(guard);

        let _guard = WorkDirLock::acquire(temp_dir.path()).await.unwrap();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_exclusive_lock_blocks_second_holder() {
        use core::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().to_path_buf();
        let released = Arc::new(AtomicBool::new(false));

        let guard = WorkDirLock::acquire(&dir).await.unwrap();

        let flag = Arc::clone(&released);
        let waiter = tokio::spawn(async move {
            let _guard = WorkDirLock::acquire(&dir).await.unwrap();
            assert!(flag.load(Ordering::SeqCst));
        });

        tokio::time::sleep(core::time::Duration::from_millis(50)).await;
        released.store(true, Ordering::SeqCst);
        drop(guard);

        waiter.await.unwrap();
    }
}
