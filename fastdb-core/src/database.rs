// fastdb-core/src/database.rs
//! Database handle: owns one storage backend and opens collections on it.

use std::path::Path;
use std::sync::Arc;

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::document::Payload;
use crate::error::Result;
use crate::logging::set_log_level;
use crate::storage::{validate_collection_name, MemoryStorage, Storage, StorageEngine};
use crate::log_info;

/// FastDB database
///
/// Generic over Storage backend:
/// - `Database<StorageEngine>` - file-based storage (default)
/// - `Database<MemoryStorage>` - in-memory storage for tests
///
/// There is no process-wide default instance; every collection receives the
/// storage handle of the database that opened it, so independent databases
/// (e.g. one per test) never share state.
///
/// # Examples
///
/// ```no_run
/// use fastdb_core::{Database, Predicate};
/// use serde_json::json;
///
/// let db = Database::open_at("app", "/var/lib/app/db")?;
/// let users = db.collection::<serde_json::Value>("users")?;
/// users.insert_one(json!({"name": "Alice", "age": 30}))?;
///
/// let adults = users.find_many(&Predicate::new("age", "gte", json!(18)))?;
/// assert_eq!(adults.len(), 1);
/// # Ok::<(), fastdb_core::FastDbError>(())
/// ```
pub struct Database<S: Storage = StorageEngine> {
    name: String,
    storage: Arc<S>,
}

impl Database<StorageEngine> {
    /// Open (or create) a file-backed database described by `config`
    ///
    /// Applies `config.log_level` to the global logger when set.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(level) = config.log_level {
            set_log_level(level);
        }
        let engine = StorageEngine::from_config(config)?;
        log_info!(
            "Database '{}' opened at {}",
            config.name,
            config.root.display()
        );
        Ok(Database {
            name: config.name.clone(),
            storage: Arc::new(engine),
        })
    }

    /// Shorthand for `open` with default settings
    pub fn open_at<P: AsRef<Path>>(name: &str, root: P) -> Result<Self> {
        Self::open(&StoreConfig::new(name, root.as_ref()))
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }
}

impl Database<MemoryStorage> {
    pub fn in_memory(name: &str) -> Self {
        Database {
            name: name.to_string(),
            storage: Arc::new(MemoryStorage::new()),
        }
    }
}

impl<S: Storage> Database<S> {
    /// Wrap an existing storage handle
    pub fn with_storage(name: &str, storage: Arc<S>) -> Self {
        Database {
            name: name.to_string(),
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Open a collection; returns once its documents are loaded
    pub fn collection<T: Payload>(&self, name: &str) -> Result<Collection<T, S>> {
        Collection::open(name, Arc::clone(&self.storage))
    }

    /// Names of every collection with a stored snapshot
    pub fn list_collections(&self) -> Result<Vec<String>> {
        self.storage.list_collections()
    }

    /// Delete a collection's stored snapshot
    ///
    /// Handles already open for this name keep their in-memory documents and
    /// will write them back on their next mutation.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        self.storage.remove(name)
    }
}
