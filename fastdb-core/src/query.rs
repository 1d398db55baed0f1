// src/query.rs
//! Document filters
//!
//! Two filter shapes exist:
//!
//! - [`Predicate`]: a `{field, operator, value}` triple used by find and
//!   update operations. See [`operators`] for the operator table.
//! - [`FieldFilter`]: an equality-only filter (`{"field": value, ...}`) used
//!   by the delete operations. Every listed field must equal the given value.
//!
//! Both evaluate against a document's payload serialized as JSON, with dot
//! notation for nested fields.

pub mod operators;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FastDbError, Result};
use crate::value_utils::{get_nested_value, values_equal};

pub use operators::Operator;

/// `{field, operator, value}` triple
///
/// # Examples
///
/// ```rust
/// use fastdb_core::query::{Operator, Predicate};
/// use serde_json::json;
///
/// let adults = Predicate::new("age", Operator::Gte, json!(18));
/// assert!(adults.matches(&json!({"age": 30})));
///
/// let parsed: Predicate =
///     serde_json::from_value(json!({"field": "age", "operator": "gte", "value": 18})).unwrap();
/// assert_eq!(parsed, adults);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: impl Into<Operator>, value: Value) -> Self {
        Predicate {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Evaluate against a JSON payload
    pub fn matches(&self, data: &Value) -> bool {
        self.operator
            .matches(get_nested_value(data, &self.field), &self.value)
    }
}

/// Equality-only filter used by the delete operations
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldFilter {
    fields: Map<String, Value>,
}

impl FieldFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object such as `{"name": "Alice", "age": 30}`
    pub fn from_json(filter: &Value) -> Result<Self> {
        match filter {
            Value::Object(map) => Ok(FieldFilter {
                fields: map.clone(),
            }),
            other => Err(FastDbError::InvalidQuery(format!(
                "Delete filter must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.fields.iter().all(|(field, expected)| {
            get_nested_value(data, field)
                .map(|actual| values_equal(actual, expected))
                .unwrap_or(false)
        })
    }
}
