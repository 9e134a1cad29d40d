// oakbase-core/src/query.rs
//! Query value classification.
//!
//! A query is a JSON object mapping dotted field paths to either a
//! primitive (implicit equality), an operator object, or a composite
//! value. The planner never probes operator fields dynamically; it matches
//! on the tags produced here.

pub mod operators;

pub use operators::matches_query;

use crate::document::is_primitive;
use crate::index::KeyBounds;
use serde_json::Value;

/// Tagged view of one top-level query value
#[derive(Debug)]
pub enum QueryValue<'a> {
    /// A primitive: implicit equality on the field
    Primitive(&'a Value),
    /// A `{$in: [...]}` membership test
    In(&'a [Value]),
    /// At least one of `$lt`/`$lte`/`$gt`/`$gte`
    Range(KeyBounds),
    /// Anything else: other operators, nested objects, arrays
    Composite,
}

/// Classify a query value. `$in` wins over range operators when both are
/// present, mirroring the planner's rule order.
pub fn classify(value: &Value) -> QueryValue<'_> {
    if is_primitive(value) {
        return QueryValue::Primitive(value);
    }
    if let Value::Object(ops) = value {
        if let Some(Value::Array(values)) = ops.get("$in") {
            return QueryValue::In(values);
        }
        if let Some(bounds) = KeyBounds::from_operators(ops) {
            return QueryValue::Range(bounds);
        }
    }
    QueryValue::Composite
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_primitive() {
        assert!(matches!(classify(&json!("a")), QueryValue::Primitive(_)));
        assert!(matches!(classify(&json!(3)), QueryValue::Primitive(_)));
        assert!(matches!(classify(&json!(null)), QueryValue::Primitive(_)));
        assert!(matches!(classify(&json!(true)), QueryValue::Primitive(_)));
    }

    #[test]
    fn test_classify_in() {
        let value = json!({"$in": [1, 2, 3]});
        match classify(&value) {
            QueryValue::In(values) => assert_eq!(values.len(), 3),
            other => panic!("expected In, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_range() {
        assert!(matches!(
            classify(&json!({"$gte": 1, "$lt": 10})),
            QueryValue::Range(_)
        ));
        assert!(matches!(classify(&json!({"$lte": 5})), QueryValue::Range(_)));
    }

    #[test]
    fn test_classify_in_wins_over_range() {
        let value = json!({"$in": [1], "$lt": 10});
        assert!(matches!(classify(&value), QueryValue::In(_)));
    }

    #[test]
    fn test_classify_composite() {
        assert!(matches!(classify(&json!({"$ne": 1})), QueryValue::Composite));
        assert!(matches!(classify(&json!({"a": 1})), QueryValue::Composite));
        assert!(matches!(classify(&json!([1, 2])), QueryValue::Composite));
    }
}
