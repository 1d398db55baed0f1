// src/storage/mod.rs
//! Persistence layer: one JSON array per collection.

mod file_storage;
mod io;
mod memory_storage;
mod traits;

use std::collections::HashSet;

use serde_json::Value;

use crate::document::{Document, Payload};
use crate::error::{FastDbError, Result};

pub use file_storage::StorageEngine;
pub use memory_storage::MemoryStorage;
pub use traits::Storage;

/// Reject names that cannot be used as a directory and file stem
///
/// Collection names become `<root>/<name>/<name>.json`, so they may not be
/// empty, `.`/`..`, or contain path separators or NUL.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FastDbError::Configuration(
            "Collection name is required".to_string(),
        ));
    }
    if name == "." || name == ".." {
        return Err(FastDbError::Configuration(format!(
            "Invalid collection name '{}'",
            name
        )));
    }
    if name.contains(|c| c == '/' || c == '\\' || c == '\0') {
        return Err(FastDbError::Configuration(format!(
            "Collection name '{}' must not contain path separators",
            name
        )));
    }
    Ok(())
}

/// Serialize a collection snapshot
pub(crate) fn encode_documents<T: Payload>(documents: &[Document<T>]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(documents)?)
}

/// Parse and check a collection snapshot
///
/// Anything that is not a JSON array of well-formed documents with unique ids
/// is reported as `Corruption`, never as a generic serialization failure.
pub(crate) fn decode_documents<T: Payload>(
    collection: &str,
    bytes: &[u8],
) -> Result<Vec<Document<T>>> {
    let raw: Value = serde_json::from_slice(bytes).map_err(|e| {
        FastDbError::Corruption(format!("Collection '{}' is not valid JSON: {}", collection, e))
    })?;

    let entries = match raw {
        Value::Array(entries) => entries,
        other => {
            return Err(FastDbError::Corruption(format!(
                "Collection '{}' must be a JSON array, found {}",
                collection,
                json_type_name(&other)
            )))
        }
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut documents = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let document: Document<T> = serde_json::from_value(entry).map_err(|e| {
            FastDbError::Corruption(format!(
                "Collection '{}' entry {} is malformed: {}",
                collection, position, e
            ))
        })?;
        document.check_invariants()?;
        if !seen.insert(*document.id()) {
            return Err(FastDbError::Corruption(format!(
                "Collection '{}' contains duplicate id {}",
                collection,
                document.id()
            )));
        }
        documents.push(document);
    }

    Ok(documents)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
