//! Cross-process dedup of completion feedback.
//!
//! Several daemons of the same user may observe the same completion (for
//! example two instances started against different sockets). Each one tries
//! to claim `complete_<mode>_<epoch seconds>` before playing sound or
//! sending a notification; only the first claim within [`LOCK_EXPIRY_MS`]
//! wins.
//!
//! The file is read, modified and written without OS-level locking, so two
//! claims racing within the same few microseconds may both succeed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::TimerMode;

use super::error::NotificationError;

/// How long a claim blocks other claimants of the same key.
pub const LOCK_EXPIRY_MS: u64 = 2_000;

/// File name of the lock table inside the data directory.
pub const LOCK_FILE_NAME: &str = "notify-locks.json";

/// Builds the claim key for a completion observed at `now_ms`.
pub fn completion_key(mode: TimerMode, now_ms: u64) -> String {
    format!("complete_{}_{}", mode.as_str(), now_ms / 1000)
}

/// File-backed table of recent claims.
#[derive(Debug, Clone)]
pub struct NotificationLock {
    path: PathBuf,
}

impl NotificationLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Places the lock table inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(LOCK_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Claims `key` at `now_ms`.
    ///
    /// Returns false if someone else claimed the same key less than
    /// [`LOCK_EXPIRY_MS`] ago. Expired entries are dropped on every call. A
    /// table that cannot be written is logged and the claim still succeeds,
    /// so feedback is never lost to a storage problem.
    pub fn try_claim(&self, key: &str, now_ms: u64) -> bool {
        let mut table = self.read_table();
        table.retain(|_, claimed_at| now_ms.saturating_sub(*claimed_at) < LOCK_EXPIRY_MS);

        if table.contains_key(key) {
            debug!(key, "notification already claimed");
            return false;
        }

        table.insert(key.to_string(), now_ms);
        if let Err(e) = self.write_table(&table) {
            warn!("{} ({})", e, e.suggestion());
        }
        true
    }

    fn read_table(&self) -> BTreeMap<String, u64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), "ignoring malformed lock table: {}", e);
            BTreeMap::new()
        })
    }

    fn write_table(&self, table: &BTreeMap<String, u64>) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| NotificationError::Lock(e.to_string()))?;
        }
        let json =
            serde_json::to_string(table).map_err(|e| NotificationError::Lock(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| NotificationError::Lock(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const T0: u64 = 1_700_000_000_000;

    #[test]
    fn test_completion_key() {
        assert_eq!(
            completion_key(TimerMode::ShortBreak, 1_700_000_000_999),
            "complete_short-break_1700000000"
        );
    }

    #[test]
    fn test_second_claim_within_expiry_fails() {
        let dir = TempDir::new().unwrap();
        let lock = NotificationLock::in_dir(dir.path());

        assert!(lock.try_claim("complete_focus_1", T0));
        assert!(!lock.try_claim("complete_focus_1", T0 + 1_999));
        assert!(lock.try_claim("complete_focus_1", T0 + 2_000));
    }

    #[test]
    fn test_claims_are_shared_through_the_file() {
        let dir = TempDir::new().unwrap();
        let first = NotificationLock::in_dir(dir.path());
        let second = NotificationLock::in_dir(dir.path());

        assert!(first.try_claim("complete_focus_1", T0));
        assert!(!second.try_claim("complete_focus_1", T0 + 100));
        assert!(second.try_claim("complete_long-break_1", T0 + 100));
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let dir = TempDir::new().unwrap();
        let lock = NotificationLock::in_dir(dir.path());

        lock.try_claim("a", T0);
        lock.try_claim("b", T0 + 5_000);

        let table: BTreeMap<String, u64> =
            serde_json::from_str(&fs::read_to_string(lock.path()).unwrap()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("b"));
    }

    #[test]
    fn test_malformed_table_is_ignored() {
        let dir = TempDir::new().unwrap();
        let lock = NotificationLock::in_dir(dir.path());
        fs::write(lock.path(), "not json").unwrap();

        assert!(lock.try_claim("a", T0));
        assert!(!lock.try_claim("a", T0 + 1));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let lock = NotificationLock::in_dir(&dir.path().join("nested").join("data"));

        assert!(lock.try_claim("a", T0));
        assert!(lock.path().exists());
    }
}
