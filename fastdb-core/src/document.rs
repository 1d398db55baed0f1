// src/document.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FastDbError, Result};

/// Bound for caller payloads stored in a collection
///
/// Anything serde can round-trip through JSON qualifies; field-level
/// operations (predicates, patches, filters) additionally need the payload to
/// serialize as a JSON object.
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Clone + Send + Sync {}

/// Document identifier (UUID v4), stored on disk as a plain string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Fresh random identifier
    pub fn new() -> Self {
        DocumentId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for DocumentId {
    type Err = FastDbError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(DocumentId)
            .map_err(|e| FastDbError::InvalidQuery(format!("Invalid document id '{}': {}", s, e)))
    }
}

/// Identity and lifecycle envelope around a caller payload
///
/// Serialized with camelCase keys:
///
/// ```json
/// {"id": "…", "createdAt": "…", "updatedAt": "…", "deletedAt": null, "deleted": false, "data": {…}}
/// ```
///
/// `deletedAt`/`deleted` are carried for file compatibility only; documents
/// are removed outright by the delete operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Document<T = Value> {
    id: DocumentId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    deleted: bool,
    data: T,
}

impl<T> Document<T> {
    pub fn new(data: T) -> Self {
        let now = Utc::now();
        Document {
            id: DocumentId::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted: false,
            data,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    /// Swap in new data and bump `updatedAt`
    pub(crate) fn replace_data(&mut self, data: T) {
        self.data = data;
        self.touch();
    }

    /// `updatedAt` strictly increases even if the clock has not moved
    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }

    /// Envelope invariants that must hold for documents read back from disk
    pub(crate) fn check_invariants(&self) -> Result<()> {
        if self.created_at > self.updated_at {
            return Err(FastDbError::Corruption(format!(
                "Document {} has createdAt {} after updatedAt {}",
                self.id, self.created_at, self.updated_at
            )));
        }
        Ok(())
    }
}

impl<T: Serialize> Document<T> {
    /// Payload as a JSON value, the form predicates and filters evaluate against
    pub fn data_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_envelope() {
        let doc = Document::new(json!({"name": "Alice"}));
        assert_eq!(doc.created_at(), doc.updated_at());
        assert_eq!(doc.deleted_at(), None);
        assert!(!doc.is_deleted());
        assert_eq!(doc.data()["name"], "Alice");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Document::new(json!({}));
        let b = Document::new(json!({}));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_serialized_shape() {
        let doc = Document::new(json!({"n": 1}));
        let value = serde_json::to_value(&doc).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj["id"].is_string());
        assert!(obj["createdAt"].is_string());
        assert!(obj["updatedAt"].is_string());
        assert!(obj["deletedAt"].is_null());
        assert_eq!(obj["deleted"], json!(false));
        assert_eq!(obj["data"], json!({"n": 1}));
        assert_eq!(obj.len(), 6);
    }

    #[test]
    fn test_deserialize_external_file_entry() {
        let raw = json!({
            "id": "8b0d6f4e-3c1a-4f43-9d0e-5b7c2a1f9e10",
            "createdAt": "2023-05-01T12:00:00.000Z",
            "updatedAt": "2023-05-01T12:00:00.000Z",
            "deletedAt": null,
            "deleted": false,
            "data": {"name": "John", "age": 18}
        });
        let doc: Document = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.id().to_string(), "8b0d6f4e-3c1a-4f43-9d0e-5b7c2a1f9e10");
        assert_eq!(doc.data()["age"], 18);
        assert!(doc.check_invariants().is_ok());
    }

    #[test]
    fn test_replace_data_bumps_updated_at() {
        let mut doc = Document::new(json!({"v": 1}));
        let created = doc.created_at();
        let before = doc.updated_at();
        doc.replace_data(json!({"v": 2}));
        doc.replace_data(json!({"v": 3}));

        assert!(doc.updated_at() > before);
        assert_eq!(doc.created_at(), created);
        assert_eq!(doc.data()["v"], 3);
    }

    #[test]
    fn test_id_parse() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let err = "not-a-uuid".parse::<DocumentId>().unwrap_err();
        assert!(matches!(err, FastDbError::InvalidQuery(_)));
    }

    #[test]
    fn test_check_invariants_rejects_time_travel() {
        let raw = json!({
            "id": DocumentId::new(),
            "createdAt": "2024-02-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "deletedAt": null,
            "deleted": false,
            "data": {}
        });
        let doc: Document = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            doc.check_invariants(),
            Err(FastDbError::Corruption(_))
        ));
    }
}
