// src/storage/traits.rs
//! Storage abstraction for FastDB
//!
//! Collections talk to persistence only through this trait, which lets a
//! `Database` or `Collection` be handed any backend:
//!
//! ```text
//! Storage trait
//!   ├── StorageEngine (production, <root>/<name>/<name>.json)
//!   └── MemoryStorage (testing, serialized bytes in a HashMap)
//! ```

use crate::document::{Document, Payload};
use crate::error::Result;

/// Whole-collection load/save contract
///
/// A collection is always read and written as one complete snapshot.
/// Implementations must guarantee that a concurrent `load` never observes a
/// partially written snapshot, and that `save` calls for the same collection
/// are applied one at a time.
pub trait Storage: Send + Sync {
    /// Read every document of a collection, in stored order
    ///
    /// # Errors
    ///
    /// - `NotFound` if nothing was ever saved under this name
    /// - `Corruption` if the stored content is not a valid document array
    /// - `Storage` on I/O failure
    fn load<T: Payload>(&self, collection: &str) -> Result<Vec<Document<T>>>;

    /// Replace the stored snapshot of a collection
    ///
    /// Failures are always returned, never logged and dropped.
    fn save<T: Payload>(&self, collection: &str, documents: &[Document<T>]) -> Result<()>;

    /// Whether a snapshot exists for this collection
    fn exists(&self, collection: &str) -> Result<bool>;

    /// Delete the stored snapshot (missing is not an error)
    fn remove(&self, collection: &str) -> Result<()>;

    /// Names of all stored collections, sorted
    fn list_collections(&self) -> Result<Vec<String>>;
}
