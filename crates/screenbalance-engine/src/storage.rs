// Durable Local State
//
// One JSON (or plain-string) file per logical key, written synchronously
// after each mutation. Keys persist independently; a partial write only
// costs a slightly stale read on the next launch, never corruption across
// keys.

use std::fs;
use std::path::{Path, PathBuf};

use screenbalance_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const AGGREGATE_KEY: &str = "aggregate.json";
pub const LAST_RESET_DATE_KEY: &str = "last_reset_date";
pub const COOLDOWNS_KEY: &str = "cooldowns.json";
pub const LIMIT_KEY: &str = "limit.json";
pub const SCHEDULES_KEY: &str = "schedules.json";

#[derive(Debug, Clone)]
pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .map_err(|e| Error::Storage(format!("cannot create {:?}: {}", data_dir, e)))?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }

    /// Load a JSON-encoded value. Missing files return `None`; a malformed
    /// file is logged and treated as missing rather than failing the caller.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.key_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read state key {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("State key {} is malformed, ignoring: {}", key, e);
                None
            }
        }
    }

    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_atomic(key, content.as_bytes())
    }

    pub fn load_string(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(s) => Some(s.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read state key {}: {}", key, e);
                None
            }
        }
    }

    pub fn save_string(&self, key: &str, value: &str) -> Result<()> {
        self.write_atomic(key, value.as_bytes())
    }

    /// Write through a temp file and rename into place. A crash mid-write
    /// leaves the previous value intact instead of a torn file.
    fn write_atomic(&self, key: &str, content: &[u8]) -> Result<()> {
        let tmp = self.data_dir.join(format!("{}.tmp", key));
        fs::write(&tmp, content)
            .map_err(|e| Error::Storage(format!("cannot write {}: {}", key, e)))?;
        fs::rename(&tmp, self.key_path(key))
            .map_err(|e| Error::Storage(format!("cannot write {}: {}", key, e)))?;
        debug!("Persisted state key {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use screenbalance_common::NotificationCooldownState;

    use super::*;

    fn store() -> (StateStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_missing_key_is_none() {
        let (store, _dir) = store();
        assert!(store.load_json::<NotificationCooldownState>(COOLDOWNS_KEY).is_none());
        assert!(store.load_string(LAST_RESET_DATE_KEY).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let (store, _dir) = store();
        let state = NotificationCooldownState {
            last_approaching_fired_at: Some(chrono::Local::now()),
            last_limit_reached_fired_at: None,
        };
        store.save_json(COOLDOWNS_KEY, &state).unwrap();

        let loaded: NotificationCooldownState = store.load_json(COOLDOWNS_KEY).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_malformed_json_is_ignored() {
        let (store, _dir) = store();
        std::fs::write(store.data_dir().join(COOLDOWNS_KEY), "{not json").unwrap();
        assert!(store.load_json::<NotificationCooldownState>(COOLDOWNS_KEY).is_none());
    }

    #[test]
    fn test_save_replaces_file_in_place() {
        let (store, _dir) = store();
        store.save_string(LAST_RESET_DATE_KEY, "2026-01-18").unwrap();
        store.save_string(LAST_RESET_DATE_KEY, "2026-01-19").unwrap();
        assert_eq!(store.load_string(LAST_RESET_DATE_KEY).unwrap(), "2026-01-19");

        // The rename step leaves no partially written temp file behind
        let leftovers: Vec<_> = std::fs::read_dir(store.data_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_string_round_trip() {
        let (store, _dir) = store();
        store.save_string(LAST_RESET_DATE_KEY, "2026-01-19").unwrap();
        assert_eq!(store.load_string(LAST_RESET_DATE_KEY).unwrap(), "2026-01-19");
    }
}
