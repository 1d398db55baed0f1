// src/query/operators.rs
//! Predicate operators and their matching rules.
//!
//! | operator    | matches when                                              |
//! |-------------|-----------------------------------------------------------|
//! | `eq`        | field present and equal to the operand                    |
//! | `neq`       | not `eq` (an absent field matches)                        |
//! | `gt` `gte` `lt` `lte` | field and operand are comparable and ordered accordingly |
//! | `in`        | operand is an array containing the field value            |
//! | `nin`       | operand is an array not containing the field value        |
//! | `contains`  | field string has operand as substring, or field array has operand as member |
//! | `ncontains` | field is a string/array that does not contain the operand |
//!
//! Any other operator name parses to [`Operator::Unknown`] and never matches.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_utils::{compare_values, values_equal};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    NContains,
    /// Unrecognized operator name, kept verbatim
    Unknown(String),
}

impl Operator {
    pub fn parse(name: &str) -> Operator {
        match name {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "nin" => Operator::Nin,
            "contains" => Operator::Contains,
            "ncontains" => Operator::NContains,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Contains => "contains",
            Operator::NContains => "ncontains",
            Operator::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Unknown(_))
    }

    /// Apply the operator to a field value (`None` when the field is absent)
    pub fn matches(&self, field: Option<&Value>, operand: &Value) -> bool {
        match self {
            Operator::Eq => eq(field, operand),
            Operator::Neq => !eq(field, operand),
            Operator::Gt => ordered(field, operand, |ord| ord == Ordering::Greater),
            Operator::Gte => ordered(field, operand, |ord| ord != Ordering::Less),
            Operator::Lt => ordered(field, operand, |ord| ord == Ordering::Less),
            Operator::Lte => ordered(field, operand, |ord| ord != Ordering::Greater),
            Operator::In => match (field, operand) {
                (Some(v), Value::Array(set)) => set.iter().any(|m| values_equal(v, m)),
                _ => false,
            },
            Operator::Nin => match (field, operand) {
                (Some(v), Value::Array(set)) => !set.iter().any(|m| values_equal(v, m)),
                (None, Value::Array(_)) => true,
                _ => false,
            },
            Operator::Contains => contains(field, operand).unwrap_or(false),
            Operator::NContains => contains(field, operand).map(|c| !c).unwrap_or(false),
            Operator::Unknown(_) => false,
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Operator::parse(&name)
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        Operator::parse(name)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn eq(field: Option<&Value>, operand: &Value) -> bool {
    field.map(|v| values_equal(v, operand)).unwrap_or(false)
}

fn ordered<F>(field: Option<&Value>, operand: &Value, predicate: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    field
        .and_then(|v| compare_values(v, operand))
        .map(predicate)
        .unwrap_or(false)
}

/// `None` when containment is undefined for the field type
fn contains(field: Option<&Value>, operand: &Value) -> Option<bool> {
    match field? {
        Value::String(haystack) => match operand {
            Value::String(needle) => Some(haystack.contains(needle.as_str())),
            _ => None,
        },
        Value::Array(items) => Some(items.iter().any(|item| values_equal(item, operand))),
        _ => None,
    }
}
