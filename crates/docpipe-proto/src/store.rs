//! Key/value persistence for the client.
//!
//! Two stores with different lifetimes share one JSON-file mechanism:
//!
//! - `DurableStore` — survives indefinitely on the device (theme, stored
//!   credential, lifetime counters).
//! - `SessionStore` — holds in-flight pipeline and conversation state so a
//!   restart of the same session does not lose progress; `reset_task`
//!   removes everything except the auth flag and username.
//!
//! Every `put` writes through to disk synchronously. A corrupt or absent
//! entry never fails a read: callers get `None` (and an anomaly log line)
//! and fall back to defaults.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use super::platform;

/// Store entry names. Each key is serialized independently so a corrupt
/// value only loses that one field.
pub mod keys {
    // ── Session-scoped ──
    pub const STEP: &str = "pipeline_step";
    pub const FILE_META: &str = "file_meta";
    pub const UPLOADED_PATHS: &str = "uploaded_paths";
    pub const USER_PROMPT: &str = "user_prompt";
    pub const SUGGESTED_METRICS: &str = "suggested_metrics";
    pub const SELECTED_METRICS: &str = "selected_metrics";
    pub const RESULTS: &str = "results";
    pub const ANALYSIS_HISTORY: &str = "analysis_history";
    pub const AVAILABLE_DATA: &str = "available_data";
    pub const AUTH_FLAG: &str = "authenticated";
    pub const USERNAME: &str = "username";

    // ── Durable ──
    pub const THEME: &str = "theme";
    pub const CREDENTIAL: &str = "credential";
    pub const LIFETIME_PROCESSED: &str = "lifetime_processed";
    pub const AGGREGATE_STATS: &str = "aggregate_stats";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write store file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

/// One JSON file holding a flat key → value map.
#[derive(Debug)]
pub struct KvFile {
    path: PathBuf,
    entries: BTreeMap<String, serde_json::Value>,
}

impl KvFile {
    /// Load the backing file, falling back to an empty map on any failure.
    /// Corruption is logged and never blocks startup.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("store {} is corrupt, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Typed read. Returns `None` for an absent or undeserializable entry;
    /// the latter is logged as an anomaly.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("store entry '{}' is corrupt, using default: {}", key, e);
                None
            }
        }
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key).unwrap_or_default()
    }

    /// Serialize and write through to disk.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), json);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove every key for which `keep` returns false, then flush once.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) -> Result<(), StoreError> {
        self.entries.retain(|k, _| keep(k));
        self.flush()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let write = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write)?;
        }
        // entries are plain JSON values, serialization cannot fail here
        let content = serde_json::to_string_pretty(&self.entries).expect("serializable map");
        std::fs::write(&self.path, content).map_err(write)
    }
}

// ── Durable store ─────────────────────────────────────────────────────────────

/// Device-level persistence: theme preference, stored credential, lifetime
/// counters. Never touched by task resets.
#[derive(Debug)]
pub struct DurableStore {
    kv: KvFile,
}

impl DurableStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            kv: KvFile::open(path),
        }
    }

    pub fn open_default() -> Self {
        Self::open(platform::data_dir().join("durable.json"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.kv.get(key)
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.kv.put(key, value)
    }
}

// ── Session store ─────────────────────────────────────────────────────────────

/// Session-scoped persistence: the whole pipeline and conversation state.
#[derive(Debug)]
pub struct SessionStore {
    kv: KvFile,
}

impl SessionStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            kv: KvFile::open(path),
        }
    }

    pub fn open_default() -> Self {
        Self::open(platform::data_dir().join("session.json"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.kv.get(key)
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.kv.get_or_default(key)
    }

    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.kv.put(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.kv.remove(key)
    }

    /// Drop every session key except the auth flag and username, so logging
    /// out and back in during the same session does not see a half-reset
    /// pipeline.
    pub fn reset_task(&mut self) -> Result<(), StoreError> {
        self.kv
            .retain(|k| k == keys::AUTH_FLAG || k == keys::USERNAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json"));
        (dir, store)
    }

    #[test]
    fn round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(path.clone());
        store.put(keys::UPLOADED_PATHS, &vec!["a.pdf", "b.pdf"]).unwrap();
        store.put(keys::USER_PROMPT, &"extract revenue").unwrap();
        drop(store);

        let store = SessionStore::open(path);
        let paths: Vec<String> = store.get(keys::UPLOADED_PATHS).unwrap();
        assert_eq!(paths, vec!["a.pdf", "b.pdf"]);
        let prompt: String = store.get(keys::USER_PROMPT).unwrap();
        assert_eq!(prompt, "extract revenue");
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(path);
        assert!(store.get::<String>(keys::USER_PROMPT).is_none());
    }

    #[test]
    fn corrupt_entry_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"pipeline_step": {"weird": true}}"#).unwrap();

        let store = SessionStore::open(path);
        assert!(store.get::<u8>(keys::STEP).is_none());
    }

    #[test]
    fn reset_task_keeps_auth_and_username() {
        let (_dir, mut store) = temp_store();
        store.put(keys::AUTH_FLAG, &true).unwrap();
        store.put(keys::USERNAME, &"ada").unwrap();
        store.put(keys::STEP, &3u8).unwrap();
        store.put(keys::USER_PROMPT, &"x").unwrap();

        store.reset_task().unwrap();

        assert_eq!(store.get::<bool>(keys::AUTH_FLAG), Some(true));
        assert_eq!(store.get::<String>(keys::USERNAME).as_deref(), Some("ada"));
        assert!(store.get::<u8>(keys::STEP).is_none());
        assert!(store.get::<String>(keys::USER_PROMPT).is_none());
    }

    #[test]
    fn reset_task_twice_is_idempotent() {
        let (_dir, mut store) = temp_store();
        store.put(keys::AUTH_FLAG, &true).unwrap();
        store.put(keys::STEP, &2u8).unwrap();

        store.reset_task().unwrap();
        store.reset_task().unwrap();

        assert_eq!(store.get::<bool>(keys::AUTH_FLAG), Some(true));
        assert!(store.get::<u8>(keys::STEP).is_none());
    }
}
