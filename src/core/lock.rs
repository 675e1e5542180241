//! Advisory, process-level lock over the repository's `lock` file (§4.5, §9).
//!
//! The core requires exactly one writer at a time; readers may skip the lock
//! and tolerate a window in which uncommitted events are invisible. The lock
//! is released automatically when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::core::error::{RefBuilderError, Result};

/// A held exclusive lock on a repository's `lock` file.
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Attempts to acquire the exclusive lock, failing fast with
    /// [`RefBuilderError::LockConflict`] if another process holds it.
    pub fn acquire(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join("lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| RefBuilderError::LockConflict)?;
        Ok(RepoLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let lock = RepoLock::acquire(dir.path()).unwrap();
        assert!(lock.path().exists());
        drop(lock);
        let lock2 = RepoLock::acquire(dir.path()).unwrap();
        drop(lock2);
    }

    #[test]
    fn test_conflicting_acquire_fails() {
        let dir = tempdir().unwrap();
        let _held = RepoLock::acquire(dir.path()).unwrap();
        let err = RepoLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, RefBuilderError::LockConflict));
    }
}
