//! Coordination primitives shared by stateful hooks.

pub mod resource_lock;

pub use resource_lock::{lock_dir_for, with_lock, LockError, LockGuard, ResourceLock};

use std::time::Duration;

/// Suffix of the lock directory placed next to a guarded state file.
pub const LOCK_DIR_SUFFIX: &str = ".lockdir";

/// Default bound on lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Backoff between acquisition attempts.
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_LOCK_TIMEOUT, Duration::from_secs(5));
        assert_eq!(DEFAULT_LOCK_RETRY_INTERVAL, Duration::from_millis(100));
        assert!(LOCK_DIR_SUFFIX.starts_with('.'));
    }
}
