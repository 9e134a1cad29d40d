// oakbase-core/src/document.rs
//! Document model helpers: ID generation, dotted-path access, structural
//! validation, and the total value order used for sorting.
//!
//! Documents are plain `serde_json::Value` trees. Every document handed to
//! a caller is a deep copy of the committed instance, and every committed
//! instance is shared by the indexes as a single `Arc<Value>`.

use crate::error::{OakbaseError, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

/// Name of the identifier field every persisted document carries
pub const ID_FIELD: &str = "_id";

/// Length of generated identifiers
pub const ID_LEN: usize = 16;

/// Generate a fresh 16-character opaque document identifier
pub fn generate_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..ID_LEN].to_string()
}

/// Read a document's `_id`
pub fn doc_id(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD)?.as_str()
}

/// Resolve a dotted path against a document.
///
/// Supports nested objects (`address.city`) and array indexing
/// (`items.0.name`).
pub fn get_dotted<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if !path.contains('.') {
        return doc.get(path);
    }

    let mut value = doc;
    for part in path.split('.') {
        match value {
            Value::Object(map) => value = map.get(part)?,
            Value::Array(arr) => {
                if let Ok(index) = part.parse::<usize>() {
                    value = arr.get(index)?;
                } else {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(value)
}

/// Set a value at a dotted path, creating intermediate objects as needed.
/// A non-container encountered on the path is replaced by an object.
pub fn set_dotted(doc: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    set_at_path(doc, &parts, value);
}

fn set_at_path(current: &mut Value, parts: &[&str], value: Value) {
    let head = match parts.first() {
        Some(head) => *head,
        None => {
            *current = value;
            return;
        }
    };

    match current {
        Value::Object(map) => {
            if parts.len() == 1 {
                map.insert(head.to_string(), value);
                return;
            }
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_at_path(entry, &parts[1..], value);
        }
        Value::Array(arr) => {
            if let Ok(index) = head.parse::<usize>() {
                if index < arr.len() {
                    if parts.len() == 1 {
                        arr[index] = value;
                    } else {
                        set_at_path(&mut arr[index], &parts[1..], value);
                    }
                }
            }
        }
        _ => {
            let mut nested = value;
            for part in parts.iter().rev() {
                let mut map = Map::new();
                map.insert(part.to_string(), nested);
                nested = Value::Object(map);
            }
            *current = nested;
        }
    }
}

/// Remove the value at a dotted path, returning it if present
pub fn remove_dotted(doc: &mut Value, path: &str) -> Option<Value> {
    let parts: Vec<&str> = path.split('.').collect();
    remove_at_path(doc, &parts)
}

fn remove_at_path(current: &mut Value, parts: &[&str]) -> Option<Value> {
    let head = *parts.first()?;
    match current {
        Value::Object(map) => {
            if parts.len() == 1 {
                map.remove(head)
            } else {
                remove_at_path(map.get_mut(head)?, &parts[1..])
            }
        }
        Value::Array(arr) => {
            let index = head.parse::<usize>().ok()?;
            if index >= arr.len() {
                return None;
            }
            if parts.len() == 1 {
                Some(arr.remove(index))
            } else {
                remove_at_path(&mut arr[index], &parts[1..])
            }
        }
        _ => None,
    }
}

/// Validate a document about to be committed.
///
/// Rejected: non-object top level, field names starting with `$`
/// (reserved for operators) and field names containing `.` (reserved for
/// path addressing), at any depth.
pub fn check_document(doc: &Value) -> Result<()> {
    if !doc.is_object() {
        return Err(OakbaseError::InvalidDocument(
            "document must be an object".to_string(),
        ));
    }
    check_value(doc)
}

fn check_value(value: &Value) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if key.starts_with('$') {
                    return Err(OakbaseError::InvalidDocument(format!(
                        "field name '{}' starts with the reserved character '$'",
                        key
                    )));
                }
                if key.contains('.') {
                    return Err(OakbaseError::InvalidDocument(format!(
                        "field name '{}' contains the reserved character '.'",
                        key
                    )));
                }
                check_value(nested)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                check_value(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// True for values the planner treats as equality keys: strings, numbers,
/// booleans and null. Arrays and objects are composites.
pub fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values, used by the sort comparator.
///
/// Values of different types order by type rank (null < bool < number <
/// string < array < object); within a type the natural order applies.
/// Objects compare equal to each other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let fx = x.as_f64().unwrap_or(0.0);
            let fy = y.as_f64().unwrap_or(0.0);
            fx.partial_cmp(&fy).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (ax, bx) in x.iter().zip(y.iter()) {
                let ord = compare_values(ax, bx);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(_), Value::Object(_)) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
