// oakbase-core/src/aggregation.rs
//! Sort / skip / limit over a candidate list.
//!
//! An [`AggregateSpec`] is parsed from a `{$sort, $skip, $limit}` object
//! and lives on the collection until the next `aggregate` call replaces
//! it. `find` and the mutation paths slice; `find_one` only sorts.

use crate::document::{compare_values, get_dotted};
use crate::error::{OakbaseError, Result};
use serde_json::Value;
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Validated aggregation state
#[derive(Debug, Clone, Default)]
pub struct AggregateSpec {
    sort: Vec<(String, i64)>,
    skip: Option<usize>,
    limit: Option<usize>,
}

impl AggregateSpec {
    /// Parse and validate an aggregation object.
    ///
    /// `$skip` and `$limit` must be absent or non-negative integers.
    /// `$sort` is either a bare path name (ascending) or a list of
    /// single-entry `{path: direction}` objects with direction +1 or -1.
    pub fn parse(spec: &Value) -> Result<AggregateSpec> {
        let obj = spec.as_object().ok_or_else(|| {
            OakbaseError::InvalidParameter("aggregate spec must be an object".to_string())
        })?;

        let mut parsed = AggregateSpec::default();

        if let Some(skip) = obj.get("$skip") {
            parsed.skip = Some(non_negative(skip, "$skip")?);
        }
        if let Some(limit) = obj.get("$limit") {
            parsed.limit = Some(non_negative(limit, "$limit")?);
        }
        if let Some(sort) = obj.get("$sort") {
            parsed.sort = parse_sort(sort)?;
        }

        Ok(parsed)
    }

    /// Sort the candidates (stable), then slice to
    /// `[skip, skip + limit)` when `apply_limit_skip` is set.
    pub fn apply<T: Borrow<Value>>(&self, mut docs: Vec<T>, apply_limit_skip: bool) -> Vec<T> {
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| self.compare_docs(a.borrow(), b.borrow()));
        }
        if !apply_limit_skip {
            return docs;
        }
        let skip = self.skip.unwrap_or(0);
        match self.limit {
            Some(limit) => docs.into_iter().skip(skip).take(limit).collect(),
            None if skip > 0 => docs.into_iter().skip(skip).collect(),
            None => docs,
        }
    }

    /// Clause comparator: both sides defined compare by value, a defined
    /// side outranks an undefined one under ascending order, and an
    /// exhausted clause list means equal.
    fn compare_docs(&self, a: &Value, b: &Value) -> Ordering {
        for (path, direction) in &self.sort {
            let va = get_dotted(a, path);
            let vb = get_dotted(b, path);
            let ord = match (va, vb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y),
            };
            if ord != Ordering::Equal {
                return if *direction >= 0 { ord } else { ord.reverse() };
            }
        }
        Ordering::Equal
    }
}

fn non_negative(value: &Value, name: &str) -> Result<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| {
            OakbaseError::InvalidParameter(format!("{} must be a non-negative integer", name))
        })
}

fn parse_sort(sort: &Value) -> Result<Vec<(String, i64)>> {
    match sort {
        Value::String(path) => Ok(vec![(path.clone(), 1)]),
        Value::Array(clauses) => {
            let mut parsed = Vec::with_capacity(clauses.len());
            for clause in clauses {
                let obj = clause.as_object().ok_or_else(|| {
                    OakbaseError::InvalidParameter(
                        "$sort clauses must be {path: direction} objects".to_string(),
                    )
                })?;
                if obj.len() != 1 {
                    return Err(OakbaseError::InvalidParameter(
                        "$sort clauses must hold exactly one path".to_string(),
                    ));
                }
                for (path, direction) in obj {
                    match direction.as_i64() {
                        Some(1) => parsed.push((path.clone(), 1)),
                        Some(-1) => parsed.push((path.clone(), -1)),
                        _ => {
                            return Err(OakbaseError::InvalidParameter(format!(
                                "$sort direction for '{}' must be 1 or -1",
                                path
                            )))
                        }
                    }
                }
            }
            Ok(parsed)
        }
        _ => Err(OakbaseError::InvalidParameter(
            "$sort must be a path name or a list of clauses".to_string(),
        )),
    }
}
