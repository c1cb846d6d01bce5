//! Key-value storage backends for `kv` data sources.
//!
//! The store is an opaque async collaborator: [`DataStore`](crate::DataStore)
//! reads initial values from it and writes every update of a `kv` source
//! through to it.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{fs, sync::Mutex};

/// KV backend failure.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("kv storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("kv serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Async key-value store holding JSON values.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), KvError>;
    async fn delete(&self, key: &str) -> Result<(), KvError>;
    async fn keys(&self) -> Result<Vec<String>, KvError>;
    async fn clear(&self) -> Result<(), KvError>;
}

/// In-memory store, contents lost on drop.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryKvStore {
    /// A store pre-populated with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), KvError> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

/// Store persisted as one pretty-printed JSON object on disk.
///
/// The file is read on every access and rewritten on every mutation; it is
/// created, along with its parent directory, on the first write.
#[derive(Debug)]
pub struct JsonFileKvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, KvError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(KvError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| KvError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, entries: &Map<String, Value>) -> Result<(), KvError> {
        let io_err = |source: std::io::Error| KvError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let s = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, s).await.map_err(io_err)
    }

    async fn modify(&self, f: impl FnOnce(&mut Map<String, Value>) + Send) -> Result<(), KvError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        f(&mut entries);
        self.save(&entries).await
    }
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), KvError> {
        debug!("kv set `{key}` -> {}", self.path.display());
        self.modify(|m| {
            m.insert(key.to_string(), value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.modify(|m| {
            m.remove(key);
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), KvError> {
        self.modify(Map::clear).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store() {
        let kv = MemoryKvStore::default();
        assert_eq!(kv.get("a").await.unwrap(), None);
        kv.set("a", json!([1])).await.unwrap();
        kv.set("b", json!(true)).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some(json!([1])));
        assert_eq!(kv.keys().await.unwrap(), vec!["a", "b"]);
        kv.delete("a").await.unwrap();
        assert_eq!(kv.keys().await.unwrap(), vec!["b"]);
        kv.clear().await.unwrap();
        assert!(kv.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.json");

        let kv = JsonFileKvStore::new(&path);
        assert_eq!(kv.get("todos").await.unwrap(), None);
        kv.set("todos", json!([{"id": 1}])).await.unwrap();

        let reopened = JsonFileKvStore::new(&path);
        assert_eq!(reopened.get("todos").await.unwrap(), Some(json!([{"id": 1}])));
        reopened.delete("todos").await.unwrap();
        assert!(kv.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = JsonFileKvStore::new(&path).get("x").await.unwrap_err();
        assert!(matches!(err, KvError::Corrupt { .. }));
    }
}
