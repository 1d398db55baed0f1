//! Record builder with defaults and per-field validators
//!
//! A `Model` declares the fields of a record. `create` fills a partial record
//! from the declared defaults and checks supplied values against validators.
//! It is a pure function and never touches storage; run it before
//! `Collection::insert_one`.
//!
//! ```rust
//! use fastdb_core::model::{FieldSpec, Model};
//! use serde_json::json;
//!
//! let student = Model::new()
//!     .field("name", FieldSpec::new(json!("John")))
//!     .field("age", FieldSpec::new(json!(18)).with_validator(|v| v.as_i64().map_or(false, |n| n > 5)))
//!     .field("rollNo", FieldSpec::new(json!(1)));
//!
//! let record = student.create(&json!({"name": "Ann"})).unwrap();
//! assert_eq!(record, json!({"name": "Ann", "age": 18, "rollNo": 1}));
//!
//! assert!(student.create(&json!({"age": 3})).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{FastDbError, Result};

type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Default value plus optional validator for one field
#[derive(Clone)]
pub struct FieldSpec {
    default: Value,
    validator: Option<Validator>,
}

impl FieldSpec {
    pub fn new(default: Value) -> Self {
        FieldSpec {
            default,
            validator: None,
        }
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    fn accepts(&self, value: &Value) -> bool {
        self.validator.as_ref().map_or(true, |check| check(value))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("default", &self.default)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Ordered field declarations
#[derive(Debug, Clone, Default)]
pub struct Model {
    fields: Vec<(String, FieldSpec)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field; declaring the same name again replaces it
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Build a complete record from `partial`
    ///
    /// For each declared field, a present non-null value is validated and
    /// kept; an absent or null value is replaced by the default. Undeclared
    /// fields are dropped. `partial` must be an object or null.
    ///
    /// Falsy values (`0`, `""`, `false`) count as present: they are kept and
    /// run through the validator instead of falling back to the default. With
    /// an `age > 5` validator, `{"age": 0}` is rejected rather than becoming
    /// the default age.
    pub fn create(&self, partial: &Value) -> Result<Value> {
        let empty = Map::new();
        let provided = match partial {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(FastDbError::Validation(format!(
                    "Partial record must be an object, got {}",
                    other
                )))
            }
        };

        let mut record = Map::with_capacity(self.fields.len());
        for (name, spec) in &self.fields {
            let value = match provided.get(name) {
                Some(value) if !value.is_null() => {
                    if !spec.accepts(value) {
                        return Err(FastDbError::Validation(format!(
                            "Invalid value for {}",
                            name
                        )));
                    }
                    value.clone()
                }
                _ => spec.default.clone(),
            };
            record.insert(name.clone(), value);
        }
        Ok(Value::Object(record))
    }

    /// `create` followed by deserialization into a typed record
    pub fn create_as<T: DeserializeOwned>(&self, partial: &Value) -> Result<T> {
        let record = self.create(partial)?;
        serde_json::from_value(record).map_err(|e| {
            FastDbError::Validation(format!("Record does not fit target type: {}", e))
        })
    }
}
