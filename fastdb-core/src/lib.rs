// fastdb-core/src/lib.rs
//! Embedded, file-backed JSON document store.
//!
//! A [`Database`] owns a storage backend; [`Database::collection`] opens a
//! [`Collection`] whose documents are loaded before the call returns. Each
//! collection is persisted as one JSON array at
//! `<root>/<name>/<name>.json` and rewritten atomically after every mutation.

pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod storage;
pub mod value_utils;

// Public exports
pub use collection::Collection;
pub use config::{DurabilityMode, StoreConfig};
pub use database::Database;
pub use document::{Document, DocumentId, Payload};
pub use error::{FastDbError, Result};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use model::{FieldSpec, Model};
pub use query::{FieldFilter, Operator, Predicate};
pub use storage::{MemoryStorage, Storage, StorageEngine};
