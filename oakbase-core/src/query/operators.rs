// oakbase-core/src/query/operators.rs
//! Query operator implementations.
//!
//! Each operator is a unit struct implementing [`OperatorMatcher`]; dispatch
//! goes through a registry keyed by operator name. Candidate retrieval only
//! narrows the document set; correctness of the final result rests entirely
//! on [`matches_query`].

use crate::document::get_dotted;
use crate::error::{OakbaseError, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Trait for all query operators
pub trait OperatorMatcher: Send + Sync {
    /// Operator name, e.g. `$gt`
    fn name(&self) -> &'static str;

    /// Evaluate the operator.
    ///
    /// `doc_value` is the value at the queried path (`None` when the path
    /// is undefined); `operand` is the operator's argument from the query;
    /// `doc` is the full document, needed by logical operators that
    /// recurse.
    fn matches(
        &self,
        doc_value: Option<&Value>,
        operand: &Value,
        doc: Option<&Value>,
    ) -> Result<bool>;
}

// ============================================================================
// COMPARISON OPERATORS
// ============================================================================

/// Ordering comparisons apply only within a comparable type pair; mixed
/// types never match.
fn partial_compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let fx = x.as_f64()?;
            let fy = y.as_f64()?;
            fx.partial_cmp(&fy)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub struct EqOperator;

impl OperatorMatcher for EqOperator {
    fn name(&self) -> &'static str {
        "$eq"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        Ok(doc_value.map_or(false, |v| v == operand))
    }
}

/// `$ne` matches when the field is absent
pub struct NeOperator;

impl OperatorMatcher for NeOperator {
    fn name(&self) -> &'static str {
        "$ne"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        Ok(doc_value.map_or(true, |v| v != operand))
    }
}

pub struct GtOperator;

impl OperatorMatcher for GtOperator {
    fn name(&self) -> &'static str {
        "$gt"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => Ok(partial_compare(v, operand) == Some(std::cmp::Ordering::Greater)),
        }
    }
}

pub struct GteOperator;

impl OperatorMatcher for GteOperator {
    fn name(&self) -> &'static str {
        "$gte"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => Ok(matches!(
                partial_compare(v, operand),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            )),
        }
    }
}

pub struct LtOperator;

impl OperatorMatcher for LtOperator {
    fn name(&self) -> &'static str {
        "$lt"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => Ok(partial_compare(v, operand) == Some(std::cmp::Ordering::Less)),
        }
    }
}

pub struct LteOperator;

impl OperatorMatcher for LteOperator {
    fn name(&self) -> &'static str {
        "$lte"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => Ok(matches!(
                partial_compare(v, operand),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            )),
        }
    }
}

// ============================================================================
// MEMBERSHIP OPERATORS
// ============================================================================

pub struct InOperator;

impl OperatorMatcher for InOperator {
    fn name(&self) -> &'static str {
        "$in"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        let values = operand.as_array().ok_or_else(|| {
            OakbaseError::InvalidParameter("$in expects an array".to_string())
        })?;
        Ok(doc_value.map_or(false, |v| values.contains(v)))
    }
}

/// `$nin` matches when the field is absent
pub struct NinOperator;

impl OperatorMatcher for NinOperator {
    fn name(&self) -> &'static str {
        "$nin"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        let values = operand.as_array().ok_or_else(|| {
            OakbaseError::InvalidParameter("$nin expects an array".to_string())
        })?;
        Ok(doc_value.map_or(true, |v| !values.contains(v)))
    }
}

// ============================================================================
// ELEMENT OPERATORS
// ============================================================================

pub struct ExistsOperator;

impl OperatorMatcher for ExistsOperator {
    fn name(&self) -> &'static str {
        "$exists"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        let should_exist = operand.as_bool().ok_or_else(|| {
            OakbaseError::InvalidParameter("$exists expects a boolean".to_string())
        })?;
        Ok(doc_value.is_some() == should_exist)
    }
}

pub struct RegexOperator;

lazy_static! {
    // Regex compilation is expensive; keep a small compiled-pattern cache.
    static ref REGEX_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

fn compiled(pattern: &str) -> Result<Regex> {
    let mut cache = REGEX_CACHE.lock();
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|e| {
        OakbaseError::InvalidParameter(format!("invalid $regex pattern: {}", e))
    })?;
    if cache.len() >= 128 {
        cache.clear();
    }
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

impl OperatorMatcher for RegexOperator {
    fn name(&self) -> &'static str {
        "$regex"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, _doc: Option<&Value>) -> Result<bool> {
        let pattern = operand.as_str().ok_or_else(|| {
            OakbaseError::InvalidParameter("$regex expects a string pattern".to_string())
        })?;
        match doc_value {
            Some(Value::String(s)) => Ok(compiled(pattern)?.is_match(s)),
            _ => Ok(false),
        }
    }
}

// ============================================================================
// LOGICAL OPERATORS
// ============================================================================

fn require_doc<'a>(doc: Option<&'a Value>, op: &str) -> Result<&'a Value> {
    doc.ok_or_else(|| {
        OakbaseError::InvalidParameter(format!("{} requires document context", op))
    })
}

fn subqueries<'a>(operand: &'a Value, op: &str) -> Result<&'a [Value]> {
    operand
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| OakbaseError::InvalidParameter(format!("{} expects an array of queries", op)))
}

pub struct AndOperator;

impl OperatorMatcher for AndOperator {
    fn name(&self) -> &'static str {
        "$and"
    }

    fn matches(&self, _doc_value: Option<&Value>, operand: &Value, doc: Option<&Value>) -> Result<bool> {
        let doc = require_doc(doc, "$and")?;
        for query in subqueries(operand, "$and")? {
            if !matches_query(doc, query)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub struct OrOperator;

impl OperatorMatcher for OrOperator {
    fn name(&self) -> &'static str {
        "$or"
    }

    fn matches(&self, _doc_value: Option<&Value>, operand: &Value, doc: Option<&Value>) -> Result<bool> {
        let doc = require_doc(doc, "$or")?;
        for query in subqueries(operand, "$or")? {
            if matches_query(doc, query)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub struct NorOperator;

impl OperatorMatcher for NorOperator {
    fn name(&self) -> &'static str {
        "$nor"
    }

    fn matches(&self, _doc_value: Option<&Value>, operand: &Value, doc: Option<&Value>) -> Result<bool> {
        let doc = require_doc(doc, "$nor")?;
        for query in subqueries(operand, "$nor")? {
            if matches_query(doc, query)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `{field: {$not: {...}}}` inverts the inner clause on the same field
pub struct NotOperator;

impl OperatorMatcher for NotOperator {
    fn name(&self) -> &'static str {
        "$not"
    }

    fn matches(&self, doc_value: Option<&Value>, operand: &Value, doc: Option<&Value>) -> Result<bool> {
        let doc = require_doc(doc, "$not")?;
        Ok(!matches_clause(doc_value, operand, doc)?)
    }
}

// ============================================================================
// OPERATOR REGISTRY
// ============================================================================

lazy_static! {
    /// Registry of all query operators, keyed by name. Initialized once,
    /// immutable thereafter.
    pub static ref OPERATOR_REGISTRY: HashMap<&'static str, Box<dyn OperatorMatcher>> = {
        let mut registry: HashMap<&'static str, Box<dyn OperatorMatcher>> = HashMap::new();

        registry.insert("$eq", Box::new(EqOperator));
        registry.insert("$ne", Box::new(NeOperator));
        registry.insert("$gt", Box::new(GtOperator));
        registry.insert("$gte", Box::new(GteOperator));
        registry.insert("$lt", Box::new(LtOperator));
        registry.insert("$lte", Box::new(LteOperator));

        registry.insert("$in", Box::new(InOperator));
        registry.insert("$nin", Box::new(NinOperator));

        registry.insert("$exists", Box::new(ExistsOperator));
        registry.insert("$regex", Box::new(RegexOperator));

        registry.insert("$and", Box::new(AndOperator));
        registry.insert("$or", Box::new(OrOperator));
        registry.insert("$nor", Box::new(NorOperator));
        registry.insert("$not", Box::new(NotOperator));

        registry
    };
}

fn lookup(name: &str) -> Result<&'static dyn OperatorMatcher> {
    OPERATOR_REGISTRY
        .get(name)
        .map(|b| b.as_ref())
        .ok_or_else(|| OakbaseError::InvalidParameter(format!("unknown query operator {}", name)))
}

/// Evaluate one field clause: an operator object applies each operator in
/// turn, anything else is structural equality.
fn matches_clause(doc_value: Option<&Value>, operand: &Value, doc: &Value) -> Result<bool> {
    if let Value::Object(ops) = operand {
        if ops.keys().any(|k| k.starts_with('$')) {
            for (name, op_value) in ops {
                if !lookup(name)?.matches(doc_value, op_value, Some(doc))? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    Ok(doc_value == Some(operand))
}

/// Check a document against a query. An empty query matches everything.
pub fn matches_query(doc: &Value, query: &Value) -> Result<bool> {
    let clauses = query
        .as_object()
        .ok_or_else(|| OakbaseError::InvalidParameter("query must be an object".to_string()))?;

    for (key, operand) in clauses {
        if key.starts_with('$') {
            if !lookup(key)?.matches(None, operand, Some(doc))? {
                return Ok(false);
            }
        } else {
            let doc_value = get_dotted(doc, key);
            if !matches_clause(doc_value, operand, doc)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
