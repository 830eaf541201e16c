//! Directory-based advisory lock for hooks that share on-disk state.
//!
//! A lock is held while its directory exists. `create_dir` is atomic and
//! non-recursive, so at most one acquirer succeeds. No owner identity, no
//! reentrancy, no stale-lock recovery.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{DEFAULT_LOCK_RETRY_INTERVAL, DEFAULT_LOCK_TIMEOUT, LOCK_DIR_SUFFIX};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("timed out after {timeout:?} waiting for lock {path}")]
    Timeout { path: PathBuf, timeout: Duration },
}

/// Lock directory guarding `state_file`: a sibling named `<file>.lockdir`.
pub fn lock_dir_for(state_file: &Path) -> PathBuf {
    let mut name = state_file.as_os_str().to_owned();
    name.push(LOCK_DIR_SUFFIX);
    PathBuf::from(name)
}

#[derive(Debug, Clone)]
pub struct ResourceLock {
    path: PathBuf,
    timeout: Duration,
    retry_interval: Duration,
}

impl ResourceLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_LOCK_TIMEOUT,
            retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether some acquirer currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.path.is_dir()
    }

    /// Try to take the lock until the timeout elapses.
    ///
    /// Returns `None` on timeout, or immediately if the directory cannot be
    /// created for any reason other than already existing.
    pub async fn acquire(&self) -> Option<LockGuard> {
        let start = Instant::now();
        loop {
            match tokio::fs::create_dir(&self.path).await {
                Ok(()) => {
                    tracing::debug!(lock = %self.path.display(), "lock acquired");
                    return Some(LockGuard {
                        path: self.path.clone(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if start.elapsed() >= self.timeout {
                        tracing::debug!(lock = %self.path.display(), "lock acquisition timed out");
                        return None;
                    }
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(e) => {
                    tracing::warn!(lock = %self.path.display(), error = %e, "cannot create lock directory");
                    return None;
                }
            }
        }
    }
}

/// Proof of holding a [`ResourceLock`]. Releases on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = std::fs::remove_dir(&self.path) {
            tracing::debug!(lock = %self.path.display(), error = %e, "lock directory already gone");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Run `f` while holding the lock at `lock_dir`.
pub async fn with_lock<F, Fut, T>(lock_dir: &Path, timeout: Duration, f: F) -> Result<T, LockError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let lock = ResourceLock::new(lock_dir).with_timeout(timeout);
    let guard = lock.acquire().await.ok_or_else(|| LockError::Timeout {
        path: lock_dir.to_path_buf(),
        timeout,
    })?;
    let out = f().await;
    guard.release();
    Ok(out)
}
