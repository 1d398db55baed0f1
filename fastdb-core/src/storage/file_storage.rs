// storage/file_storage.rs
//! File-based storage engine
//!
//! ```text
//! <root>/
//!   users/
//!     users.json        ← JSON array of documents
//!     .users.json.*.tmp ← unique per save, only present while it is in flight
//!   orders/
//!     orders.json
//! ```
//!
//! Saves replace the file atomically (temp file + rename) and are serialized
//! per collection name, so a concurrent `load` observes either the previous
//! or the next snapshot. Several engines may share a root inside one
//! process; each save still lands whole, and the last rename wins. Other
//! processes writing the same files are not detected.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::io::{ensure_dir, read_file, write_atomic};
use super::{decode_documents, encode_documents, validate_collection_name, Storage};
use crate::config::{DurabilityMode, StoreConfig};
use crate::document::{Document, Payload};
use crate::error::{FastDbError, Result};
use crate::{log_debug, log_error, log_trace};

/// Maps collection names to `<root>/<name>/<name>.json`
///
/// # Examples
///
/// ```no_run
/// use fastdb_core::storage::{Storage, StorageEngine};
/// use fastdb_core::Document;
/// use serde_json::json;
///
/// let engine = StorageEngine::init("app", "/var/lib/app/db")?;
/// engine.save("users", &[Document::new(json!({"name": "Alice"}))])?;
/// let users: Vec<Document> = engine.load("users")?;
/// # Ok::<(), fastdb_core::FastDbError>(())
/// ```
#[derive(Debug)]
pub struct StorageEngine {
    name: String,
    root: PathBuf,
    durability: DurabilityMode,
    /// One writer at a time per collection
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StorageEngine {
    /// Configure the storage root, creating it if needed
    ///
    /// Fails with `Configuration` if `name` or `root` is empty and with
    /// `Storage` if the directory cannot be created. Calling it again for
    /// the same root is harmless.
    pub fn init<P: AsRef<Path>>(name: &str, root: P) -> Result<Self> {
        Self::from_config(&StoreConfig::new(name, root.as_ref()))
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        ensure_dir(&config.root)?;

        log_debug!(
            "Storage '{}' ready at {} ({:?})",
            config.name,
            config.root.display(),
            config.durability
        );

        Ok(StorageEngine {
            name: config.name.clone(),
            root: config.root.clone(),
            durability: config.durability,
            write_locks: DashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    /// `<root>/<name>/`
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// `<root>/<name>/<name>.json`
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", collection))
    }

    fn write_lock(&self, collection: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(collection.to_string())
            .or_default()
            .clone()
    }
}

impl Storage for StorageEngine {
    fn load<T: Payload>(&self, collection: &str) -> Result<Vec<Document<T>>> {
        validate_collection_name(collection)?;
        let path = self.collection_path(collection);

        let bytes = read_file(&path)?;
        let documents = decode_documents(collection, &bytes).map_err(|e| {
            log_error!("Failed to load {}: {}", path.display(), e);
            e
        })?;

        log_debug!(
            "Loaded {} documents from {}",
            documents.len(),
            path.display()
        );
        Ok(documents)
    }

    fn save<T: Payload>(&self, collection: &str, documents: &[Document<T>]) -> Result<()> {
        validate_collection_name(collection)?;
        let bytes = encode_documents(documents)?;

        let lock = self.write_lock(collection);
        let _guard = lock.lock();

        let path = self.collection_path(collection);
        let result = ensure_dir(&self.collection_dir(collection))
            .and_then(|()| write_atomic(&path, &bytes, self.durability.fsync()));

        match &result {
            Ok(()) => log_trace!(
                "Saved {} documents ({} bytes) to {}",
                documents.len(),
                bytes.len(),
                path.display()
            ),
            Err(e) => log_error!("Failed to save {}: {}", path.display(), e),
        }
        result
    }

    fn exists(&self, collection: &str) -> Result<bool> {
        validate_collection_name(collection)?;
        Ok(self.collection_path(collection).is_file())
    }

    fn remove(&self, collection: &str) -> Result<()> {
        validate_collection_name(collection)?;

        let lock = self.write_lock(collection);
        let _guard = lock.lock();

        let dir = self.collection_dir(collection);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                log_debug!("Removed collection directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FastDbError::storage(dir, e)),
        }
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| FastDbError::storage(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FastDbError::storage(&self.root, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_collection_name(&name).is_ok() && self.collection_path(&name).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_init_requires_name_and_root() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            StorageEngine::init("", dir.path()),
            Err(FastDbError::Configuration(_))
        ));
        assert!(matches!(
            StorageEngine::init("app", ""),
            Err(FastDbError::Configuration(_))
        ));
    }

    #[test]
    fn test_init_creates_root_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("db");

        let first = StorageEngine::init("app", &root).unwrap();
        let second = StorageEngine::init("app", &root).unwrap();

        assert!(root.is_dir());
        assert_eq!(first.root(), second.root());
        assert_eq!(first.name(), "app");
    }

    #[test]
    fn test_init_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("occupied");
        std::fs::write(&root, b"not a directory").unwrap();

        let err = StorageEngine::init("app", &root).unwrap_err();
        assert!(matches!(err, FastDbError::Storage { .. }));
    }

    #[test]
    fn test_layout_on_disk() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::init("app", dir.path()).unwrap();
        engine
            .save("users", &[Document::new(json!({"name": "Alice"}))])
            .unwrap();

        let path = dir.path().join("users").join("users.json");
        assert_eq!(engine.collection_path("users"), path);

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entries = raw.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["data"]["name"], "Alice");
        assert!(entries[0]["deletedAt"].is_null());
    }

    #[test]
    fn test_load_missing_vs_corrupt() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::init("app", dir.path()).unwrap();

        let missing = engine.load::<Value>("ghosts").unwrap_err();
        assert!(missing.is_not_found());

        std::fs::create_dir_all(engine.collection_dir("broken")).unwrap();
        std::fs::write(engine.collection_path("broken"), b"[{\"id\":").unwrap();
        let corrupt = engine.load::<Value>("broken").unwrap_err();
        assert!(matches!(corrupt, FastDbError::Corruption(_)));
    }

    #[test]
    fn test_save_load_roundtrip_relaxed() {
        let dir = TempDir::new().unwrap();
        let config =
            StoreConfig::new("app", dir.path()).with_durability(DurabilityMode::Relaxed);
        let engine = StorageEngine::from_config(&config).unwrap();

        let docs: Vec<Document> = (0..3).map(|i| Document::new(json!({"i": i}))).collect();
        engine.save("nums", &docs).unwrap();

        assert_eq!(engine.load::<Value>("nums").unwrap(), docs);
        assert!(engine.exists("nums").unwrap());
    }

    #[test]
    fn test_remove_and_list() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::init("app", dir.path()).unwrap();
        let empty: Vec<Document> = Vec::new();

        engine.save("b", &empty).unwrap();
        engine.save("a", &empty).unwrap();
        std::fs::create_dir(dir.path().join("stray")).unwrap();

        assert_eq!(engine.list_collections().unwrap(), vec!["a", "b"]);

        engine.remove("a").unwrap();
        engine.remove("a").unwrap();
        assert!(!engine.exists("a").unwrap());
        assert_eq!(engine.list_collections().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::init("app", dir.path()).unwrap();
        let empty: Vec<Document> = Vec::new();

        assert!(matches!(
            engine.save("../escape", &empty),
            Err(FastDbError::Configuration(_))
        ));
        assert!(matches!(
            engine.load::<Value>(".."),
            Err(FastDbError::Configuration(_))
        ));
    }
}
