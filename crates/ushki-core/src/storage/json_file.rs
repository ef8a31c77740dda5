//! JSON-file backed key-value store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KeyValueStore, Result};

/// All keys live in one pretty-printed JSON object on disk, rewritten on
/// every mutation. The mutex serializes mutations so writers never clobber
/// each other mid-rewrite. A mutation that fails to persist is rolled back,
/// so the in-memory map never runs ahead of the file.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store, loading whatever is on disk. A missing or corrupt
    /// file starts empty rather than failing.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: HashMap<String, String> = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!(
                        "profile {} unreadable, starting empty: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        debug!(
            "profile loaded from {} ({} key(s))",
            path.display(),
            entries.len()
        );
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries).await {
            match previous {
                Some(prev) => {
                    entries.insert(key.to_string(), prev);
                }
                None => {
                    entries.remove(key);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&entries).await {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("profile.json")).await;

        assert_eq!(store.get("volume").await.unwrap(), None);
        store.set("volume", "0.8").await.unwrap();
        assert_eq!(store.get("volume").await.unwrap(), Some("0.8".to_string()));
        store.remove("volume").await.unwrap();
        assert_eq!(store.get("volume").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        {
            let store = JsonFileStore::open(&path).await;
            store.set("last_station", "{\"id\":1}").await.unwrap();
        }

        let store = JsonFileStore::open(&path).await;
        assert_eq!(
            store.get("last_station").await.unwrap(),
            Some("{\"id\":1}".to_string())
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(&path, "{{{ not json").await.unwrap();

        let store = JsonFileStore::open(&path).await;
        assert_eq!(store.get("volume").await.unwrap(), None);

        // Still writable afterwards.
        store.set("volume", "1").await.unwrap();
        assert_eq!(store.get("volume").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("profile.json");

        let store = JsonFileStore::open(&path).await;
        store.set("k", "v").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("profile.json")).await;
        store.remove("never-set").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let store = JsonFileStore::open(&path).await;
        store.set("volume", "0.9").await.unwrap();

        // Block the file path so the next persist fails.
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        assert!(store.set("favorites", "[\"a\"]").await.is_err());
        assert_eq!(store.get("favorites").await.unwrap(), None);

        assert!(store.remove("volume").await.is_err());
        assert_eq!(store.get("volume").await.unwrap(), Some("0.9".to_string()));

        // Once writable again, a flush carries only acknowledged values.
        tokio::fs::remove_dir(&path).await.unwrap();
        store.set("last_station", "{\"id\":1}").await.unwrap();

        let reloaded = JsonFileStore::open(&path).await;
        assert_eq!(reloaded.get("favorites").await.unwrap(), None);
        assert_eq!(reloaded.get("volume").await.unwrap(), Some("0.9".to_string()));
        assert_eq!(
            reloaded.get("last_station").await.unwrap(),
            Some("{\"id\":1}".to_string())
        );
    }
}
