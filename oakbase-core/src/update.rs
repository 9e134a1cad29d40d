// oakbase-core/src/update.rs
//! Update-modifier application.
//!
//! [`modify`] is a pure function from (committed document, update
//! directive) to the new document. The engine needs both versions to drive
//! the index update protocol, so nothing here mutates in place.

use crate::document::{check_document, compare_values, get_dotted, remove_dotted, set_dotted, ID_FIELD};
use crate::error::{OakbaseError, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Compute the document that results from applying `update` to `doc`.
///
/// An update with no `$` operators is a whole-document replacement (the
/// `_id` is carried over). Operators and plain fields cannot be mixed, and
/// the `_id` cannot be changed either way.
pub fn modify(doc: &Value, update: &Value) -> Result<Value> {
    let update_obj = update
        .as_object()
        .ok_or_else(|| OakbaseError::InvalidParameter("update must be an object".to_string()))?;

    let operator_count = update_obj.keys().filter(|k| k.starts_with('$')).count();
    if operator_count > 0 && operator_count != update_obj.len() {
        return Err(OakbaseError::InvalidDocument(
            "cannot mix update operators and plain fields".to_string(),
        ));
    }

    if operator_count == 0 {
        replace_document(doc, update)
    } else {
        apply_operators(doc, update_obj)
    }
}

fn replace_document(doc: &Value, update: &Value) -> Result<Value> {
    let mut new_doc = update.clone();
    if let Some(old_id) = doc.get(ID_FIELD) {
        let obj = new_doc
            .as_object_mut()
            .ok_or_else(|| OakbaseError::InvalidParameter("update must be an object".to_string()))?;
        match obj.get(ID_FIELD) {
            None => {
                obj.insert(ID_FIELD.to_string(), old_id.clone());
            }
            Some(new_id) if new_id == old_id => {}
            Some(_) => {
                return Err(OakbaseError::InvalidDocument(
                    "cannot change a document's _id".to_string(),
                ))
            }
        }
    }
    check_document(&new_doc)?;
    Ok(new_doc)
}

fn apply_operators(doc: &Value, ops: &Map<String, Value>) -> Result<Value> {
    let mut new_doc = doc.clone();

    for (op, fields) in ops {
        let fields = fields.as_object().ok_or_else(|| {
            OakbaseError::InvalidParameter(format!("{} expects an object of fields", op))
        })?;

        for (path, operand) in fields {
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err(OakbaseError::InvalidDocument(
                    "cannot change a document's _id".to_string(),
                ));
            }
            match op.as_str() {
                "$set" => set_dotted(&mut new_doc, path, operand.clone()),
                "$unset" => {
                    remove_dotted(&mut new_doc, path);
                }
                "$inc" => apply_inc(&mut new_doc, path, operand)?,
                "$push" => apply_push(&mut new_doc, path, operand)?,
                "$addToSet" => apply_add_to_set(&mut new_doc, path, operand)?,
                "$pop" => apply_pop(&mut new_doc, path, operand)?,
                "$min" => apply_min_max(&mut new_doc, path, operand, Ordering::Less)?,
                "$max" => apply_min_max(&mut new_doc, path, operand, Ordering::Greater)?,
                other => {
                    return Err(OakbaseError::InvalidParameter(format!(
                        "unknown update operator {}",
                        other
                    )))
                }
            }
        }
    }

    check_document(&new_doc)?;
    Ok(new_doc)
}

fn apply_inc(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    if !operand.is_number() {
        return Err(OakbaseError::InvalidParameter(
            "$inc expects a number".to_string(),
        ));
    }
    match get_dotted(doc, path).cloned() {
        None => set_dotted(doc, path, operand.clone()),
        Some(Value::Number(current)) => {
            // integer arithmetic while both sides are integral
            let incremented = if let (Some(a), Some(b)) = (current.as_i64(), operand.as_i64()) {
                Value::from(a + b)
            } else {
                let a = current.as_f64().unwrap_or(0.0);
                let b = operand.as_f64().unwrap_or(0.0);
                Value::from(a + b)
            };
            set_dotted(doc, path, incremented);
        }
        Some(_) => {
            return Err(OakbaseError::InvalidParameter(format!(
                "$inc target '{}' is not a number",
                path
            )))
        }
    }
    Ok(())
}

/// Extract the items plus `$position`/`$slice` arguments of a `$push`
fn push_arguments(operand: &Value) -> Result<(Vec<Value>, Option<usize>, Option<i64>)> {
    if let Value::Object(modifiers) = operand {
        if let Some(each) = modifiers.get("$each") {
            let items = each
                .as_array()
                .cloned()
                .ok_or_else(|| OakbaseError::InvalidParameter("$each expects an array".to_string()))?;
            let position = modifiers
                .get("$position")
                .and_then(Value::as_u64)
                .map(|p| p as usize);
            let slice = modifiers.get("$slice").and_then(Value::as_i64);
            return Ok((items, position, slice));
        }
    }
    Ok((vec![operand.clone()], None, None))
}

fn target_array(doc: &Value, path: &str, op: &str) -> Result<Vec<Value>> {
    match get_dotted(doc, path).cloned() {
        Some(Value::Array(arr)) => Ok(arr),
        Some(_) => Err(OakbaseError::InvalidParameter(format!(
            "{} target '{}' is not an array",
            op, path
        ))),
        None => Ok(Vec::new()),
    }
}

fn apply_push(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    let (items, position, slice) = push_arguments(operand)?;
    let mut array = target_array(doc, path, "$push")?;

    if let Some(pos) = position {
        let at = pos.min(array.len());
        for (offset, item) in items.into_iter().enumerate() {
            array.insert(at + offset, item);
        }
    } else {
        array.extend(items);
    }

    if let Some(keep) = slice {
        if keep < 0 {
            let keep = (-keep) as usize;
            if array.len() > keep {
                array.drain(..array.len() - keep);
            }
        } else {
            array.truncate(keep as usize);
        }
    }

    set_dotted(doc, path, Value::Array(array));
    Ok(())
}

fn apply_add_to_set(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    let (items, _, _) = push_arguments(operand)?;
    let mut array = target_array(doc, path, "$addToSet")?;
    for item in items {
        if !array.contains(&item) {
            array.push(item);
        }
    }
    set_dotted(doc, path, Value::Array(array));
    Ok(())
}

fn apply_pop(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    let direction = operand.as_i64();
    if direction != Some(1) && direction != Some(-1) {
        return Err(OakbaseError::InvalidParameter(
            "$pop expects 1 or -1".to_string(),
        ));
    }
    let mut array = match get_dotted(doc, path).cloned() {
        Some(Value::Array(arr)) => arr,
        Some(_) => {
            return Err(OakbaseError::InvalidParameter(format!(
                "$pop target '{}' is not an array",
                path
            )))
        }
        None => return Ok(()),
    };
    if array.is_empty() {
        return Ok(());
    }
    if direction == Some(1) {
        array.pop();
    } else {
        array.remove(0);
    }
    set_dotted(doc, path, Value::Array(array));
    Ok(())
}

fn apply_min_max(doc: &mut Value, path: &str, operand: &Value, keep_when: Ordering) -> Result<()> {
    match get_dotted(doc, path).cloned() {
        None => set_dotted(doc, path, operand.clone()),
        Some(current) => {
            if compare_values(operand, &current) == keep_when {
                set_dotted(doc, path, operand.clone());
            }
        }
    }
    Ok(())
}
