//! JSON value helpers used by the predicate evaluator and the patch merge.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Get nested value from JSON with dot notation support
///
/// Supports:
/// - Simple fields: "name"
/// - Nested objects: "address.city"
/// - Array indexing: "items.0.name"
///
/// A top-level key that literally contains dots (`"example.com"`) wins over
/// the nested reading of the same path.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use fastdb_core::value_utils::get_nested_value;
///
/// let doc = json!({"address": {"city": "NYC"}});
/// assert_eq!(get_nested_value(&doc, "address.city"), Some(&json!("NYC")));
/// ```
pub fn get_nested_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    if let Some(value) = doc.get(path) {
        return Some(value);
    }
    if !path.contains('.') {
        return None;
    }

    let mut value = doc;
    for part in path.split('.') {
        match value {
            Value::Object(map) => value = map.get(part)?,
            Value::Array(arr) => {
                let index = part.parse::<usize>().ok()?;
                value = arr.get(index)?;
            }
            _ => return None,
        }
    }
    Some(value)
}

/// Strict equality between two JSON values
///
/// Numbers compare by numeric value (`1` equals `1.0`); every other pair
/// compares structurally. Values of different JSON types are never equal.
///
/// ```
/// use serde_json::json;
/// use fastdb_core::value_utils::values_equal;
///
/// assert!(values_equal(&json!(1), &json!(1.0)));
/// assert!(!values_equal(&json!(1), &json!("1")));
/// ```
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => {
            if let (Some(i1), Some(i2)) = (n1.as_i64(), n2.as_i64()) {
                return i1 == i2;
            }
            if let (Some(u1), Some(u2)) = (n1.as_u64(), n2.as_u64()) {
                return u1 == u2;
            }
            match (n1.as_f64(), n2.as_f64()) {
                (Some(f1), Some(f2)) => f1 == f2,
                _ => false,
            }
        }
        (Value::Array(a1), Value::Array(a2)) => {
            a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(m1), Value::Object(m2)) => {
            m1.len() == m2.len()
                && m1
                    .iter()
                    .all(|(k, v)| m2.get(k).map(|other| values_equal(v, other)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// Compare two JSON values
///
/// Returns `Some(Ordering)` for comparable types (numbers, strings, booleans),
/// `None` for incompatible types (e.g., comparing string to number).
/// ISO-8601 timestamps in the same format order correctly as strings.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use std::cmp::Ordering;
/// use fastdb_core::value_utils::compare_values;
///
/// assert_eq!(compare_values(&json!(10), &json!(5)), Some(Ordering::Greater));
/// assert_eq!(compare_values(&json!("a"), &json!("b")), Some(Ordering::Less));
/// assert_eq!(compare_values(&json!("a"), &json!(1)), None);
/// ```
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => {
            if let (Some(i1), Some(i2)) = (n1.as_i64(), n2.as_i64()) {
                return Some(i1.cmp(&i2));
            }
            let f1 = n1.as_f64()?;
            let f2 = n2.as_f64()?;
            f1.partial_cmp(&f2)
        }
        (Value::String(s1), Value::String(s2)) => Some(s1.cmp(s2)),
        (Value::Bool(b1), Value::Bool(b2)) => Some(b1.cmp(b2)),
        _ => None,
    }
}

/// Shallow merge: every key of `patch` overwrites the same key in `base`
pub fn merge_shallow(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}
