// fastdb-core/src/collection.rs
//
// Layout:
// ├── Constructor        open (load before returning)
// ├── Query operations   find_by_id, find_one, find_many, find_all, count
// ├── Insert operations  insert_one, insert_many
// ├── Update operations  update_by_id, update_one, update_many
// ├── Delete operations  delete_by_id, delete_one, delete_many, drop
// ├── Persistence        flush, is_dirty
// └── Private helpers    persist, matching_positions, merge_patch

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::document::{Document, DocumentId, Payload};
use crate::error::{FastDbError, Result};
use crate::query::{FieldFilter, Predicate};
use crate::storage::{validate_collection_name, Storage, StorageEngine};
use crate::value_utils::merge_shallow;
use crate::{log_debug, log_info, log_trace, log_warn};

struct CollectionState<T> {
    documents: Vec<Document<T>>,
    /// Set when the last save failed: memory is ahead of storage
    dirty: bool,
}

/// Named, ordered set of documents backed by a storage snapshot
///
/// Generic over the payload type and the storage backend:
/// - `Collection<Value, StorageEngine>` - schemaless, file-backed (defaults)
/// - `Collection<User, MemoryStorage>` - typed payload, in-memory storage
///
/// Reads are served from memory. Every mutation updates memory and then saves
/// the whole collection while still holding the write lock, so concurrent
/// mutations on one handle are applied and persisted one at a time, in the
/// same order.
///
/// Only one handle per collection name should exist at a time; two handles
/// would each persist their own view and overwrite each other.
pub struct Collection<T: Payload = Value, S: Storage = StorageEngine> {
    name: String,
    storage: Arc<S>,
    state: RwLock<CollectionState<T>>,
}

impl<T: Payload, S: Storage> Collection<T, S> {
    // ========== CONSTRUCTOR ==========

    /// Open a collection, returning only once its documents are loaded
    ///
    /// A collection that was never saved opens empty. A corrupt snapshot or an
    /// I/O failure is returned as an error.
    pub fn open(name: impl Into<String>, storage: Arc<S>) -> Result<Self> {
        let name = name.into();
        validate_collection_name(&name)?;

        let documents = match storage.load::<T>(&name) {
            Ok(documents) => documents,
            Err(FastDbError::NotFound(_)) => {
                log_debug!("Collection '{}' has no snapshot yet, starting empty", name);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        log_info!(
            "Collection '{}' opened with {} documents",
            name,
            documents.len()
        );

        Ok(Collection {
            name,
            storage,
            state: RwLock::new(CollectionState {
                documents,
                dirty: false,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Evaluate a predicate against one document's payload
    pub fn evaluate(document: &Document<T>, predicate: &Predicate) -> Result<bool> {
        Ok(predicate.matches(&document.data_value()?))
    }

    // ========== QUERY OPERATIONS ==========

    pub fn find_by_id(&self, id: &DocumentId) -> Result<Document<T>> {
        log_trace!("{}.find_by_id({})", self.name, id);
        let state = self.state.read();
        state
            .documents
            .iter()
            .find(|doc| doc.id() == id)
            .cloned()
            .ok_or_else(|| self.id_not_found(id))
    }

    /// First match in insertion order
    pub fn find_one(&self, predicate: &Predicate) -> Result<Document<T>> {
        log_trace!("{}.find_one({:?})", self.name, predicate);
        let state = self.state.read();
        for document in &state.documents {
            if Self::evaluate(document, predicate)? {
                return Ok(document.clone());
            }
        }
        Err(self.predicate_not_found(predicate))
    }

    /// Every match in insertion order; no match is an empty Vec, not an error
    pub fn find_many(&self, predicate: &Predicate) -> Result<Vec<Document<T>>> {
        log_trace!("{}.find_many({:?})", self.name, predicate);
        let state = self.state.read();
        let mut found = Vec::new();
        for document in &state.documents {
            if Self::evaluate(document, predicate)? {
                found.push(document.clone());
            }
        }
        Ok(found)
    }

    pub fn find_all(&self) -> Vec<Document<T>> {
        self.state.read().documents.clone()
    }

    /// In-memory document count; never touches storage
    pub fn count(&self) -> usize {
        self.state.read().documents.len()
    }

    // ========== INSERT OPERATIONS ==========

    pub fn insert_one(&self, data: T) -> Result<Document<T>> {
        let document = Document::new(data);
        log_trace!("{}.insert_one({})", self.name, document.id());

        let mut state = self.state.write();
        state.documents.push(document.clone());
        self.persist(&mut state)?;
        Ok(document)
    }

    /// Insert in order; an empty batch is a no-op
    pub fn insert_many(&self, data: Vec<T>) -> Result<Vec<Document<T>>> {
        log_trace!("{}.insert_many({} documents)", self.name, data.len());
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<Document<T>> = data.into_iter().map(Document::new).collect();

        let mut state = self.state.write();
        state.documents.extend(documents.iter().cloned());
        self.persist(&mut state)?;
        Ok(documents)
    }

    // ========== UPDATE OPERATIONS ==========

    /// Shallow-merge `patch` into the document's payload
    ///
    /// `patch` must be a JSON object; its keys overwrite the payload's keys,
    /// all other keys keep their values. The merged object must still
    /// deserialize into `T`, otherwise nothing changes.
    pub fn update_by_id(&self, id: &DocumentId, patch: &Value) -> Result<Document<T>> {
        log_trace!("{}.update_by_id({})", self.name, id);
        let patch = patch_object(patch)?;

        let mut state = self.state.write();
        let position = state
            .documents
            .iter()
            .position(|doc| doc.id() == id)
            .ok_or_else(|| self.id_not_found(id))?;

        let updated = self.apply_patch(&mut state, &[position], patch)?;
        self.persist(&mut state)?;
        Ok(first(updated))
    }

    /// Update the first document matching `predicate`
    pub fn update_one(&self, predicate: &Predicate, patch: &Value) -> Result<Document<T>> {
        log_trace!("{}.update_one({:?})", self.name, predicate);
        let patch = patch_object(patch)?;

        let mut state = self.state.write();
        let positions = self.matching_positions(&state.documents, predicate, true)?;
        if positions.is_empty() {
            return Err(self.predicate_not_found(predicate));
        }

        let updated = self.apply_patch(&mut state, &positions, patch)?;
        self.persist(&mut state)?;
        Ok(first(updated))
    }

    /// Update every document matching `predicate`; `NotFound` if none match
    pub fn update_many(&self, predicate: &Predicate, patch: &Value) -> Result<Vec<Document<T>>> {
        log_trace!("{}.update_many({:?})", self.name, predicate);
        let patch = patch_object(patch)?;

        let mut state = self.state.write();
        let positions = self.matching_positions(&state.documents, predicate, false)?;
        if positions.is_empty() {
            return Err(self.predicate_not_found(predicate));
        }

        let updated = self.apply_patch(&mut state, &positions, patch)?;
        self.persist(&mut state)?;
        Ok(updated)
    }

    // ========== DELETE OPERATIONS ==========

    pub fn delete_by_id(&self, id: &DocumentId) -> Result<Document<T>> {
        log_trace!("{}.delete_by_id({})", self.name, id);
        let mut state = self.state.write();
        let position = state
            .documents
            .iter()
            .position(|doc| doc.id() == id)
            .ok_or_else(|| self.id_not_found(id))?;

        let removed = state.documents.remove(position);
        self.persist(&mut state)?;
        Ok(removed)
    }

    /// Remove the first document whose fields equal every field of `filter`
    pub fn delete_one(&self, filter: &FieldFilter) -> Result<Document<T>> {
        log_trace!("{}.delete_one({:?})", self.name, filter);
        let mut state = self.state.write();

        let mut position = None;
        for (i, document) in state.documents.iter().enumerate() {
            if filter.matches(&document.data_value()?) {
                position = Some(i);
                break;
            }
        }
        let position = position.ok_or_else(|| self.filter_not_found(filter))?;

        let removed = state.documents.remove(position);
        self.persist(&mut state)?;
        Ok(removed)
    }

    /// Remove every matching document; `NotFound` if none match
    pub fn delete_many(&self, filter: &FieldFilter) -> Result<Vec<Document<T>>> {
        log_trace!("{}.delete_many({:?})", self.name, filter);
        let mut state = self.state.write();

        let hits = state
            .documents
            .iter()
            .map(|document| Ok(filter.matches(&document.data_value()?)))
            .collect::<Result<Vec<bool>>>()?;
        if !hits.contains(&true) {
            return Err(self.filter_not_found(filter));
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(hits.len());
        for (document, hit) in std::mem::take(&mut state.documents).into_iter().zip(hits) {
            if hit {
                removed.push(document);
            } else {
                kept.push(document);
            }
        }
        state.documents = kept;

        self.persist(&mut state)?;
        Ok(removed)
    }

    /// Remove every document and persist the empty collection
    pub fn drop(&self) -> Result<()> {
        log_debug!("Dropping all documents of '{}'", self.name);
        let mut state = self.state.write();
        state.documents.clear();
        self.persist(&mut state)
    }

    // ========== PERSISTENCE ==========

    /// Save the current in-memory state, e.g. after an `Unpersisted` error
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.write();
        self.persist(&mut state)
    }

    /// True when the last save failed and memory is ahead of storage
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    // ========== PRIVATE HELPERS ==========

    fn persist(&self, state: &mut CollectionState<T>) -> Result<()> {
        match self.storage.save(&self.name, &state.documents) {
            Ok(()) => {
                state.dirty = false;
                Ok(())
            }
            Err(source) => {
                state.dirty = true;
                log_warn!(
                    "Collection '{}' is ahead of storage after a failed save: {}",
                    self.name,
                    source
                );
                Err(FastDbError::Unpersisted {
                    collection: self.name.clone(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn matching_positions(
        &self,
        documents: &[Document<T>],
        predicate: &Predicate,
        first_only: bool,
    ) -> Result<Vec<usize>> {
        let mut positions = Vec::new();
        for (i, document) in documents.iter().enumerate() {
            if Self::evaluate(document, predicate)? {
                positions.push(i);
                if first_only {
                    break;
                }
            }
        }
        Ok(positions)
    }

    /// Merge `patch` into every listed document
    ///
    /// All merged payloads are built before any document changes, so a patch
    /// that does not fit `T` leaves the collection untouched.
    fn apply_patch(
        &self,
        state: &mut CollectionState<T>,
        positions: &[usize],
        patch: &Map<String, Value>,
    ) -> Result<Vec<Document<T>>> {
        let merged = positions
            .iter()
            .map(|&i| merge_patch(&state.documents[i], patch))
            .collect::<Result<Vec<T>>>()?;

        let mut updated = Vec::with_capacity(positions.len());
        for (&i, data) in positions.iter().zip(merged) {
            let document = &mut state.documents[i];
            document.replace_data(data);
            updated.push(document.clone());
        }
        Ok(updated)
    }

    fn id_not_found(&self, id: &DocumentId) -> FastDbError {
        FastDbError::NotFound(format!("Document {} not found in '{}'", id, self.name))
    }

    fn predicate_not_found(&self, predicate: &Predicate) -> FastDbError {
        FastDbError::NotFound(format!(
            "No document in '{}' matches {} {} {}",
            self.name, predicate.field, predicate.operator, predicate.value
        ))
    }

    fn filter_not_found(&self, filter: &FieldFilter) -> FastDbError {
        FastDbError::NotFound(format!(
            "No document in '{}' matches {:?}",
            self.name, filter
        ))
    }
}

fn patch_object(patch: &Value) -> Result<&Map<String, Value>> {
    patch.as_object().ok_or_else(|| {
        FastDbError::InvalidQuery(format!("Update patch must be a JSON object, got {}", patch))
    })
}

fn merge_patch<T: Payload>(document: &Document<T>, patch: &Map<String, Value>) -> Result<T> {
    let mut data = match document.data_value()? {
        Value::Object(map) => map,
        other => {
            return Err(FastDbError::InvalidQuery(format!(
                "Document {} payload is not an object ({}), cannot apply a field patch",
                document.id(),
                other
            )))
        }
    };
    merge_shallow(&mut data, patch);
    serde_json::from_value(Value::Object(data)).map_err(|e| {
        FastDbError::Serialization(format!(
            "Patched document {} no longer fits its payload type: {}",
            document.id(),
            e
        ))
    })
}

fn first<T>(mut documents: Vec<Document<T>>) -> Document<T> {
    documents.swap_remove(0)
}
