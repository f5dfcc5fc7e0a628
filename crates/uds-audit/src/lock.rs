//! # Single-Runner Lock
//!
//! The repair pass must not run concurrently with itself; two repairers
//! sweeping the same dataset would double-log and could double-delete.
//! A lock file created with `create_new` gives an atomic claim on the run
//! slot, and dropping the guard releases it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::AuditError;

/// Guard held for the duration of a repair run.
///
/// The lock file is removed on drop. A crashed run leaves the file behind;
/// operators remove it by hand once they have confirmed no runner is alive.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Claim the run slot, failing if another runner holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        let result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path);
        match result {
            Ok(mut file) => {
                // Best effort breadcrumb for whoever finds a stale file.
                let _ = writeln!(file, "pid={}", std::process::id());
                tracing::debug!(path = %path.display(), "run lock acquired");
                Ok(Self { path })
            }
            Err(source) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AuditError::AlreadyRunning {
                    path: path.display().to_string(),
                })
            }
            Err(source) => Err(AuditError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// The lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %error, "failed to remove run lock");
        }
    }
}
