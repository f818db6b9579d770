//! Single-instance run lock.
//!
//! A lock file holds the owning PID. Acquisition fails loudly when that
//! process is still alive; a lock naming a dead process is stale and
//! overwritten. The guard removes the file on drop.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::StoreError;

const LOCK_FILE: &str = ".run.lock";

pub struct RunLock {
    path: PathBuf,
}

/// Held for the duration of the run; releases the lock file on drop.
pub struct RunLockGuard {
    path: PathBuf,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to remove run lock");
        } else {
            tracing::info!(path = %self.path.display(), "released run lock");
        }
    }
}

impl RunLock {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(LOCK_FILE),
        }
    }

    /// Acquire the lock for this process.
    ///
    /// # Errors
    ///
    /// [`StoreError::LockContention`] if the recorded process is still alive;
    /// [`StoreError::Io`] if the lock file cannot be written.
    pub fn acquire(&self) -> Result<RunLockGuard, StoreError> {
        if self.path.exists() {
            match fs::read_to_string(&self.path) {
                Ok(content) => match content.trim().parse::<u32>() {
                    Ok(pid) if process_running(pid) => {
                        return Err(StoreError::LockContention {
                            pid,
                            path: self.path.clone(),
                        });
                    }
                    Ok(pid) => {
                        tracing::warn!(pid, "found stale run lock from dead process — overwriting");
                    }
                    Err(_) => {
                        tracing::warn!(path = %self.path.display(), "invalid run lock content — overwriting");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "unreadable run lock — overwriting");
                }
            }
        }

        let pid = std::process::id();
        fs::write(&self.path, pid.to_string()).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::info!(path = %self.path.display(), pid, "acquired run lock");

        Ok(RunLockGuard {
            path: self.path.clone(),
        })
    }
}

/// Probe liveness with `kill -0`. A permission error reads as "not running",
/// which errs on the side of overwriting locks from other users' processes —
/// acceptable for a single-user collection box.
#[cfg(unix)]
fn process_running(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn process_running(pid: u32) -> bool {
    Command::new("tasklist")
        .arg("/FI")
        .arg(format!("PID eq {pid}"))
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_pid_and_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = RunLock::new(dir.path());
        {
            let _guard = lock.acquire().unwrap();
            let content = fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap();
            assert_eq!(content, std::process::id().to_string());
        }
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn live_process_lock_is_contended() {
        let dir = tempfile::tempdir().unwrap();
        // Our own PID is definitely alive.
        fs::write(dir.path().join(LOCK_FILE), std::process::id().to_string()).unwrap();

        let lock = RunLock::new(dir.path());
        let result = lock.acquire();
        assert!(
            matches!(result, Err(StoreError::LockContention { .. })),
            "expected LockContention"
        );
    }

    #[test]
    fn dead_process_lock_is_stale_and_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        // PIDs are bounded well below this on any real system.
        fs::write(dir.path().join(LOCK_FILE), "999999999").unwrap();

        let lock = RunLock::new(dir.path());
        let guard = lock.acquire();
        assert!(guard.is_ok(), "stale lock must be overwritten");
    }

    #[test]
    fn garbage_lock_content_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "not-a-pid").unwrap();

        let lock = RunLock::new(dir.path());
        assert!(lock.acquire().is_ok());
    }
}
