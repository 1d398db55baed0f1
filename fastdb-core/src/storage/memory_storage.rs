// storage/memory_storage.rs
//! Pure in-memory storage for fast tests
//!
//! Snapshots are kept as serialized JSON bytes, so loads go through exactly
//! the same decoding and corruption checks as the file engine.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{decode_documents, encode_documents, validate_collection_name, Storage};
use crate::document::{Document, Payload};
use crate::error::{FastDbError, Result};

/// In-memory storage backend (testing)
///
/// # Examples
///
/// ```rust
/// use fastdb_core::storage::{MemoryStorage, Storage};
/// use fastdb_core::Document;
/// use serde_json::{json, Value};
///
/// let storage = MemoryStorage::new();
/// storage.save("users", &[Document::new(json!({"name": "Alice"}))]).unwrap();
/// assert_eq!(storage.load::<Value>("users").unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Collection name -> serialized snapshot
    snapshots: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store arbitrary bytes as a collection snapshot
    pub fn insert_raw(&self, collection: &str, bytes: impl Into<Vec<u8>>) {
        self.snapshots
            .write()
            .insert(collection.to_string(), bytes.into());
    }

    /// Serialized snapshot as last saved
    pub fn raw(&self, collection: &str) -> Option<Vec<u8>> {
        self.snapshots.read().get(collection).cloned()
    }
}

impl Storage for MemoryStorage {
    fn load<T: Payload>(&self, collection: &str) -> Result<Vec<Document<T>>> {
        validate_collection_name(collection)?;
        let snapshots = self.snapshots.read();
        let bytes = snapshots.get(collection).ok_or_else(|| {
            FastDbError::NotFound(format!("Collection '{}' has no snapshot", collection))
        })?;
        decode_documents(collection, bytes)
    }

    fn save<T: Payload>(&self, collection: &str, documents: &[Document<T>]) -> Result<()> {
        validate_collection_name(collection)?;
        let bytes = encode_documents(documents)?;
        self.snapshots.write().insert(collection.to_string(), bytes);
        Ok(())
    }

    fn exists(&self, collection: &str) -> Result<bool> {
        validate_collection_name(collection)?;
        Ok(self.snapshots.read().contains_key(collection))
    }

    fn remove(&self, collection: &str) -> Result<()> {
        validate_collection_name(collection)?;
        self.snapshots.write().remove(collection);
        Ok(())
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.snapshots.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
