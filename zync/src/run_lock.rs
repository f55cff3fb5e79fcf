//! Run lock: at most one run per kind (and group) on a host
//!
//! The lock is a file created with `create_new`, holding the pid and run id
//! of its owner. It is removed when the [`RunLock`] is dropped.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::APP_NAME;
use crate::errors::LockError;

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    run_id: String,
    acquired_at: DateTime<Utc>,
}

impl RunLock {
    /// Lock file path for a run key such as `sync-web`
    pub fn lock_path(lock_dir: &Path, key: &str) -> PathBuf {
        lock_dir.join(format!("{}-{}.pid", APP_NAME, key))
    }

    pub fn acquire(lock_dir: &Path, key: &str, run_id: &str) -> Result<Self, LockError> {
        let path = Self::lock_path(lock_dir, key);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .map(|contents| contents.trim().replace('\n', " "))
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(LockError::AlreadyRunning {
                    path: path.display().to_string(),
                    holder,
                });
            }
            Err(e) => {
                return Err(LockError::WriteFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let lock = Self {
            path,
            run_id: run_id.to_string(),
            acquired_at: Utc::now(),
        };

        // From here on Drop cleans up, also when the write fails
        writeln!(file, "{}\n{}", std::process::id(), run_id).map_err(|e| {
            LockError::WriteFailed {
                path: lock.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        info!("Acquired run lock {} for run {}", lock.path.display(), run_id);
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let held = Utc::now().signed_duration_since(self.acquired_at);
        match fs::remove_file(&self.path) {
            Ok(()) => info!(
                "Released run lock {} for run {} (held {}s)",
                self.path.display(),
                self.run_id,
                held.num_seconds()
            ),
            Err(e) => warn!("Failed to remove lock file {}: {}", self.path.display(), e),
        }
    }
}
