// oakbase-core/src/query_planner.rs
//! Candidate selection.
//!
//! The planner picks at most one index to produce candidates and never
//! combines indexes; when nothing applies it falls back to a full
//! enumeration through the `_id` index. Candidates are a superset of the
//! true match set - the matcher owns correctness.

use crate::index::{IndexKey, IndexSet, SharedDoc};
use crate::query::{classify, QueryValue};
use serde_json::Value;

/// Produce the candidate list for `query`.
///
/// Rules, first applicable wins, each scanning the query's top-level keys
/// in enumeration order:
/// 1. a primitive value on an indexed field: exact key lookup
/// 2. a `$in` value on an indexed field: multi-key lookup
/// 3. a range (`$lt`/`$lte`/`$gt`/`$gte`) on an indexed field: bounds scan
/// 4. otherwise: every live document
pub fn candidates(indexes: &IndexSet, query: &Value) -> Vec<SharedDoc> {
    if let Value::Object(clauses) = query {
        for (path, value) in clauses {
            if let QueryValue::Primitive(v) = classify(value) {
                if let Some(index) = indexes.get(path) {
                    return index.get_matching(&IndexKey::from(v));
                }
            }
        }
        for (path, value) in clauses {
            if let QueryValue::In(values) = classify(value) {
                if let Some(index) = indexes.get(path) {
                    let keys: Vec<IndexKey> = values.iter().map(IndexKey::from).collect();
                    return index.get_matching_many(&keys);
                }
            }
        }
        for (path, value) in clauses {
            if let QueryValue::Range(bounds) = classify(value) {
                if let Some(index) = indexes.get(path) {
                    return index.get_between_bounds(&bounds);
                }
            }
        }
    }
    indexes.all_docs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, IndexSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn populated_set() -> IndexSet {
        let mut set = IndexSet::new();
        set.add_index(Index::new(IndexSpec::new("x")));
        for i in 0..5 {
            let doc = Arc::new(json!({"_id": format!("d{}", i), "x": i, "y": i * 10}));
            set.add_to_indexes(&doc).unwrap();
        }
        set
    }

    fn values(docs: &[SharedDoc], field: &str) -> Vec<i64> {
        let mut out: Vec<i64> = docs
            .iter()
            .filter_map(|d| d.get(field).and_then(|v| v.as_i64()))
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_equality_uses_index() {
        let set = populated_set();
        let hits = candidates(&set, &json!({"x": 3}));
        assert_eq!(values(&hits, "x"), vec![3]);
    }

    #[test]
    fn test_in_uses_index() {
        let set = populated_set();
        let hits = candidates(&set, &json!({"x": {"$in": [1, 4, 99]}}));
        assert_eq!(values(&hits, "x"), vec![1, 4]);
    }

    #[test]
    fn test_range_uses_index() {
        let set = populated_set();
        let hits = candidates(&set, &json!({"x": {"$gte": 1, "$lt": 4}}));
        assert_eq!(values(&hits, "x"), vec![1, 2, 3]);
    }

    #[test]
    fn test_equality_wins_over_range() {
        let set = populated_set();
        // x equality is picked even though a range clause appears first
        // over an unindexed field
        let hits = candidates(&set, &json!({"y": {"$gt": 0}, "x": 2}));
        assert_eq!(values(&hits, "x"), vec![2]);
    }

    #[test]
    fn test_unindexed_field_falls_back_to_scan() {
        let set = populated_set();
        let hits = candidates(&set, &json!({"y": 30}));
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_empty_query_scans() {
        let set = populated_set();
        assert_eq!(candidates(&set, &json!({})).len(), 5);
    }

    #[test]
    fn test_id_equality_uses_id_index() {
        let set = populated_set();
        let hits = candidates(&set, &json!({"_id": "d2"}));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_candidates_are_a_superset() {
        let set = populated_set();
        // a range candidate list may contain non-matching docs for a
        // composite query; the matcher narrows it later
        let hits = candidates(&set, &json!({"x": {"$gt": 0}, "y": 10}));
        assert_eq!(hits.len(), 4);
    }
}
