// src/tooltree.rs

//! Per-tool advisory locking (§4.7, §5)
//!
//! Concurrent `install`/`remove`/`update` calls for the same tool serialize
//! on a `flock`-backed lock file at `tools/<T>/.lock`; different tools
//! proceed independently. Mirrors the teacher's `SystemLock` shape: acquire
//! blocks, `Drop` releases.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub struct ToolLock {
    path: PathBuf,
    file: File,
}

impl ToolLock {
    /// Block until the lock for `tool` is acquired.
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).write(true).open(lock_path)?;
        file.lock_exclusive().map_err(|e| Error::LockFailed {
            path: lock_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { path: lock_path.to_path_buf(), file })
    }

    /// Non-blocking variant; returns `Ok(None)` if already held elsewhere.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).write(true).open(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { path: lock_path.to_path_buf(), file })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => {
                Err(Error::LockFailed { path: lock_path.to_path_buf(), reason: e.to_string() })
            }
        }
    }
}

impl Drop for ToolLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
