// oakbase-core/src/index.rs
//! Per-field ordered indexes and the index set.
//!
//! An [`Index`] is an ordered container over one dotted field path. Entries
//! are shared document instances (`Arc<Value>`); the same instance is held
//! by every index, and identity is pointer identity. The [`IndexSet`] owns
//! all indexes of a collection and implements the cross-index atomic
//! mutation protocols: a failure in any index rolls the others back so the
//! set is identical to its pre-call state.

use crate::document::get_dotted;
use crate::error::{OakbaseError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// A committed document, shared across all indexes
pub type SharedDoc = Arc<Value>;

/// Index key - the value types an index can order
#[derive(Debug, Clone)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
}

// Equality must agree with the ordering: Int(2) and Float(2.0) are the
// same key.
impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for IndexKey {}

/// OrderedFloat wrapper for f64 to enable Ord
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => self
                .0
                .partial_cmp(&other.0)
                .unwrap_or(std::cmp::Ordering::Equal),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Null, _) => std::cmp::Ordering::Less,
            (_, Null) => std::cmp::Ordering::Greater,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Bool(_), _) => std::cmp::Ordering::Less,
            (_, Bool(_)) => std::cmp::Ordering::Greater,

            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Float(a), Int(b)) => a.cmp(&OrderedFloat(*b as f64)),
            (Int(_), _) => std::cmp::Ordering::Less,
            (_, Int(_)) => std::cmp::Ordering::Greater,

            (Float(a), Float(b)) => a.cmp(b),
            (Float(_), _) => std::cmp::Ordering::Less,
            (_, Float(_)) => std::cmp::Ordering::Greater,

            (String(a), String(b)) => a.cmp(b),
        }
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::Float(OrderedFloat(f))
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            // Arrays and objects are not orderable keys
            _ => IndexKey::Null,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Null => write!(f, "null"),
            IndexKey::Bool(b) => write!(f, "{}", b),
            IndexKey::Int(i) => write!(f, "{}", i),
            IndexKey::Float(x) => write!(f, "{}", x.0),
            IndexKey::String(s) => write!(f, "'{}'", s),
        }
    }
}

/// Bounds for a range scan, built from `$lt`/`$lte`/`$gt`/`$gte`
#[derive(Debug, Clone)]
pub struct KeyBounds {
    pub lower: Bound<IndexKey>,
    pub upper: Bound<IndexKey>,
}

impl Default for KeyBounds {
    fn default() -> Self {
        KeyBounds {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }
}

impl KeyBounds {
    /// Build bounds from an operator object. Returns `None` when no range
    /// operator is present.
    pub fn from_operators(ops: &serde_json::Map<String, Value>) -> Option<KeyBounds> {
        let mut bounds = KeyBounds::default();
        let mut any = false;
        if let Some(v) = ops.get("$gt") {
            bounds.lower = Bound::Excluded(IndexKey::from(v));
            any = true;
        }
        if let Some(v) = ops.get("$gte") {
            bounds.lower = Bound::Included(IndexKey::from(v));
            any = true;
        }
        if let Some(v) = ops.get("$lt") {
            bounds.upper = Bound::Excluded(IndexKey::from(v));
            any = true;
        }
        if let Some(v) = ops.get("$lte") {
            bounds.upper = Bound::Included(IndexKey::from(v));
            any = true;
        }
        if any {
            Some(bounds)
        } else {
            None
        }
    }

    /// True when no key can satisfy the bounds (lower past upper)
    fn is_empty(&self) -> bool {
        let lower = match &self.lower {
            Bound::Included(k) | Bound::Excluded(k) => k,
            Bound::Unbounded => return false,
        };
        let upper = match &self.upper {
            Bound::Included(k) | Bound::Excluded(k) => k,
            Bound::Unbounded => return false,
        };
        if lower > upper {
            return true;
        }
        if lower == upper {
            // a half-open or open interval over one point is empty
            return matches!(self.lower, Bound::Excluded(_))
                || matches!(self.upper, Bound::Excluded(_));
        }
        false
    }
}

/// Declared shape of an index, also the payload of the `$$indexCreated`
/// persistence marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
}

impl IndexSpec {
    pub fn new(field_name: &str) -> IndexSpec {
        IndexSpec {
            field_name: field_name.to_string(),
            unique: false,
            sparse: false,
        }
    }

    pub fn unique(mut self) -> IndexSpec {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> IndexSpec {
        self.sparse = true;
        self
    }
}

/// One update step: the committed document before and after modification
#[derive(Debug, Clone)]
pub struct Modification {
    pub old: SharedDoc,
    pub new: SharedDoc,
}

/// Ordered index over one dotted field path.
///
/// A document whose key path is undefined is skipped when the index is
/// sparse, and keyed as `Null` otherwise (so a unique non-sparse index
/// admits at most one document without the field).
pub struct Index {
    spec: IndexSpec,
    tree: BTreeMap<IndexKey, Vec<SharedDoc>>,
}

impl Index {
    pub fn new(spec: IndexSpec) -> Index {
        Index {
            spec,
            tree: BTreeMap::new(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.spec.field_name
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    fn key_for(&self, doc: &Value) -> Option<IndexKey> {
        match get_dotted(doc, &self.spec.field_name) {
            Some(value) => Some(IndexKey::from(value)),
            None if self.spec.sparse => None,
            None => Some(IndexKey::Null),
        }
    }

    /// Insert one document. Fails with `UniqueViolation` when the key is
    /// already taken in a unique index; the index is unchanged on failure.
    pub fn insert(&mut self, doc: &SharedDoc) -> Result<()> {
        let key = match self.key_for(doc) {
            Some(key) => key,
            None => return Ok(()), // sparse skip
        };
        if self.spec.unique {
            if let Some(existing) = self.tree.get(&key) {
                if !existing.is_empty() {
                    return Err(OakbaseError::UniqueViolation {
                        field: self.spec.field_name.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }
        self.tree.entry(key).or_default().push(Arc::clone(doc));
        Ok(())
    }

    /// Remove one document by pointer identity. Infallible: removing an
    /// absent document is a no-op.
    pub fn remove(&mut self, doc: &SharedDoc) {
        let key = match self.key_for(doc) {
            Some(key) => key,
            None => return,
        };
        if let Some(slot) = self.tree.get_mut(&key) {
            slot.retain(|entry| !Arc::ptr_eq(entry, doc));
            if slot.is_empty() {
                self.tree.remove(&key);
            }
        }
    }

    /// Apply a modification batch atomically with respect to unique-key
    /// violations: on failure the index is restored to its pre-call state
    /// before the error surfaces.
    pub fn update(&mut self, mods: &[Modification]) -> Result<()> {
        for (applied, m) in mods.iter().enumerate() {
            self.remove(&m.old);
            if let Err(err) = self.insert(&m.new) {
                // put the current pair back, then unwind the applied ones
                self.restore(&m.old);
                for done in mods[..applied].iter().rev() {
                    self.remove(&done.new);
                    self.restore(&done.old);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Inverse of [`Index::update`]; total by construction (every key being
    /// restored was present before the forward batch ran).
    pub fn revert_update(&mut self, mods: &[Modification]) {
        for m in mods.iter().rev() {
            self.remove(&m.new);
            self.restore(&m.old);
        }
    }

    // Reinsertion of a key that was present before the batch cannot
    // collide, so the error case is unreachable.
    fn restore(&mut self, doc: &SharedDoc) {
        if let Err(err) = self.insert(doc) {
            crate::log_error!(
                "index '{}': rollback reinsert failed: {}",
                self.spec.field_name,
                err
            );
        }
    }

    /// All documents whose key equals `key`
    pub fn get_matching(&self, key: &IndexKey) -> Vec<SharedDoc> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// All documents whose key equals any of `keys`
    pub fn get_matching_many(&self, keys: &[IndexKey]) -> Vec<SharedDoc> {
        let mut out = Vec::new();
        for key in keys {
            if let Some(slot) = self.tree.get(key) {
                out.extend(slot.iter().cloned());
            }
        }
        out
    }

    /// All documents whose key falls within `bounds`, in key order
    pub fn get_between_bounds(&self, bounds: &KeyBounds) -> Vec<SharedDoc> {
        if bounds.is_empty() {
            return Vec::new();
        }
        self.tree
            .range((bounds.lower.clone(), bounds.upper.clone()))
            .flat_map(|(_, docs)| docs.iter().cloned())
            .collect()
    }

    /// Every indexed document, in key order
    pub fn get_all(&self) -> Vec<SharedDoc> {
        self.tree
            .values()
            .flat_map(|docs| docs.iter().cloned())
            .collect()
    }

    /// Drop all entries and rebuild from `docs`, preserving name and flags
    pub fn reset(&mut self, docs: &[SharedDoc]) -> Result<()> {
        self.tree.clear();
        for doc in docs {
            self.insert(doc)?;
        }
        Ok(())
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// All indexes of a collection, iterated in creation order.
///
/// The `_id` index exists from construction, is always unique, and is the
/// authoritative enumeration of live documents.
pub struct IndexSet {
    indexes: HashMap<String, Index>,
    order: Vec<String>,
}

impl IndexSet {
    pub fn new() -> IndexSet {
        let mut set = IndexSet {
            indexes: HashMap::new(),
            order: Vec::new(),
        };
        set.add_index(Index::new(IndexSpec::new(crate::document::ID_FIELD).unique()));
        set
    }

    pub fn get(&self, field_name: &str) -> Option<&Index> {
        self.indexes.get(field_name)
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.indexes.contains_key(field_name)
    }

    /// Declared shapes of all indexes, in creation order
    pub fn specs(&self) -> Vec<IndexSpec> {
        self.order
            .iter()
            .filter_map(|name| self.indexes.get(name))
            .map(|index| index.spec().clone())
            .collect()
    }

    /// Install a (possibly pre-populated) index. The caller guarantees the
    /// field is not indexed yet.
    pub fn add_index(&mut self, index: Index) {
        let name = index.field_name().to_string();
        self.order.push(name.clone());
        self.indexes.insert(name, index);
    }

    /// Delete an index unconditionally; deleting an absent index is a no-op
    pub fn remove_index(&mut self, field_name: &str) {
        self.indexes.remove(field_name);
        self.order.retain(|name| name != field_name);
    }

    /// Insert protocol: indexes in creation order, rollback on failure.
    /// Post-condition on failure: the set equals its pre-call state.
    pub fn add_to_indexes(&mut self, doc: &SharedDoc) -> Result<()> {
        let order = self.order.clone();
        for (applied, name) in order.iter().enumerate() {
            let failed = match self.indexes.get_mut(name) {
                Some(index) => index.insert(doc).err(),
                None => None,
            };
            if let Some(err) = failed {
                for done in order[..applied].iter().rev() {
                    if let Some(index) = self.indexes.get_mut(done) {
                        index.remove(doc);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Bulk insert protocol: each document through the single-doc protocol
    /// in order; a failure at document j removes documents 0..j from all
    /// indexes before surfacing.
    pub fn add_many_to_indexes(&mut self, docs: &[SharedDoc]) -> Result<()> {
        for (inserted, doc) in docs.iter().enumerate() {
            if let Err(err) = self.add_to_indexes(doc) {
                for done in docs[..inserted].iter().rev() {
                    self.remove_from_indexes(done);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Removes are infallible once the document is present and are not
    /// rolled back.
    pub fn remove_from_indexes(&mut self, doc: &SharedDoc) {
        let order = self.order.clone();
        for name in &order {
            if let Some(index) = self.indexes.get_mut(name) {
                index.remove(doc);
            }
        }
    }

    /// Update protocol: per-index atomic batches in creation order; a
    /// failure at index k reverts indexes 0..k before surfacing.
    pub fn update_indexes(&mut self, mods: &[Modification]) -> Result<()> {
        let order = self.order.clone();
        for (applied, name) in order.iter().enumerate() {
            let failed = match self.indexes.get_mut(name) {
                Some(index) => index.update(mods).err(),
                None => None,
            };
            if let Some(err) = failed {
                for done in order[..applied].iter().rev() {
                    if let Some(index) = self.indexes.get_mut(done) {
                        index.revert_update(mods);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Rebuild every index from `docs`, preserving names and flags.
    /// Used only during replay.
    pub fn reset_indexes(&mut self, docs: &[SharedDoc]) -> Result<()> {
        let order = self.order.clone();
        for name in &order {
            if let Some(index) = self.indexes.get_mut(name) {
                index.reset(docs)?;
            }
        }
        Ok(())
    }

    /// The live document set, enumerated through the `_id` index
    pub fn all_docs(&self) -> Vec<SharedDoc> {
        self.indexes
            .get(crate::document::ID_FIELD)
            .map(Index::get_all)
            .unwrap_or_default()
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shared(value: Value) -> SharedDoc {
        Arc::new(value)
    }

    #[test]
    fn test_index_key_ordering() {
        assert!(IndexKey::Null < IndexKey::Bool(false));
        assert!(IndexKey::Bool(true) < IndexKey::Int(0));
        assert!(IndexKey::Int(5) < IndexKey::Int(10));
        assert!(IndexKey::Int(10) < IndexKey::Float(OrderedFloat(10.5)));
        assert!(IndexKey::Float(OrderedFloat(10.5)) < IndexKey::String("a".to_string()));
        assert!(IndexKey::String("a".to_string()) < IndexKey::String("b".to_string()));
    }

    #[test]
    fn test_index_key_int_float_interleave() {
        assert_eq!(
            IndexKey::Int(2).cmp(&IndexKey::Float(OrderedFloat(2.0))),
            std::cmp::Ordering::Equal
        );
        assert!(IndexKey::Float(OrderedFloat(1.5)) < IndexKey::Int(2));
    }

    #[test]
    fn test_insert_and_get_matching() {
        let mut index = Index::new(IndexSpec::new("x"));
        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "b", "x": 2}));
        index.insert(&a).unwrap();
        index.insert(&b).unwrap();

        let hits = index.get_matching(&IndexKey::Int(1));
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0], &a));
        assert!(index.get_matching(&IndexKey::Int(9)).is_empty());
    }

    #[test]
    fn test_unique_violation() {
        let mut index = Index::new(IndexSpec::new("x").unique());
        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "b", "x": 1}));
        index.insert(&a).unwrap();
        let err = index.insert(&b).unwrap_err();
        assert!(matches!(err, OakbaseError::UniqueViolation { .. }));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sparse_skips_missing_key() {
        let mut index = Index::new(IndexSpec::new("x").sparse());
        let doc = shared(json!({"_id": "a"}));
        index.insert(&doc).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_non_sparse_keys_missing_as_null() {
        let mut index = Index::new(IndexSpec::new("x").unique());
        let a = shared(json!({"_id": "a"}));
        let b = shared(json!({"_id": "b"}));
        index.insert(&a).unwrap();
        assert!(index.insert(&b).is_err());
    }

    #[test]
    fn test_remove_by_identity() {
        let mut index = Index::new(IndexSpec::new("x"));
        let a = shared(json!({"_id": "a", "x": 1}));
        let twin = shared(json!({"_id": "a", "x": 1}));
        index.insert(&a).unwrap();

        // structural equality is not enough to remove
        index.remove(&twin);
        assert_eq!(index.len(), 1);

        index.remove(&a);
        assert!(index.is_empty());
    }

    #[test]
    fn test_get_between_bounds() {
        let mut index = Index::new(IndexSpec::new("x"));
        for i in 0..10 {
            index
                .insert(&shared(json!({"_id": format!("d{}", i), "x": i})))
                .unwrap();
        }
        let bounds = KeyBounds {
            lower: Bound::Included(IndexKey::Int(3)),
            upper: Bound::Excluded(IndexKey::Int(7)),
        };
        let hits = index.get_between_bounds(&bounds);
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn test_get_between_bounds_inverted_is_empty() {
        let mut index = Index::new(IndexSpec::new("x"));
        index.insert(&shared(json!({"_id": "a", "x": 5}))).unwrap();
        let bounds = KeyBounds {
            lower: Bound::Excluded(IndexKey::Int(7)),
            upper: Bound::Excluded(IndexKey::Int(3)),
        };
        assert!(index.get_between_bounds(&bounds).is_empty());

        let point = KeyBounds {
            lower: Bound::Excluded(IndexKey::Int(5)),
            upper: Bound::Excluded(IndexKey::Int(5)),
        };
        assert!(index.get_between_bounds(&point).is_empty());
    }

    #[test]
    fn test_update_batch_rolls_back_on_failure() {
        let mut index = Index::new(IndexSpec::new("x").unique());
        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "b", "x": 2}));
        index.insert(&a).unwrap();
        index.insert(&b).unwrap();

        // second pair collides with the untouched key 2
        let mods = vec![
            Modification {
                old: Arc::clone(&a),
                new: shared(json!({"_id": "a", "x": 10})),
            },
            Modification {
                old: Arc::clone(&b),
                new: shared(json!({"_id": "b", "x": 10})),
            },
        ];
        assert!(index.update(&mods).is_err());

        // pre-call state restored
        assert_eq!(index.get_matching(&IndexKey::Int(1)).len(), 1);
        assert_eq!(index.get_matching(&IndexKey::Int(2)).len(), 1);
        assert!(index.get_matching(&IndexKey::Int(10)).is_empty());
    }

    #[test]
    fn test_revert_update_restores_state() {
        let mut index = Index::new(IndexSpec::new("x"));
        let a = shared(json!({"_id": "a", "x": 1}));
        index.insert(&a).unwrap();

        let mods = vec![Modification {
            old: Arc::clone(&a),
            new: shared(json!({"_id": "a", "x": 2})),
        }];
        index.update(&mods).unwrap();
        assert_eq!(index.get_matching(&IndexKey::Int(2)).len(), 1);

        index.revert_update(&mods);
        assert_eq!(index.get_matching(&IndexKey::Int(1)).len(), 1);
        assert!(index.get_matching(&IndexKey::Int(2)).is_empty());
    }

    #[test]
    fn test_index_set_has_id_index() {
        let set = IndexSet::new();
        let specs = set.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].field_name, "_id");
        assert!(specs[0].unique);
    }

    #[test]
    fn test_index_set_insert_rollback() {
        let mut set = IndexSet::new();
        set.add_index(Index::new(IndexSpec::new("x").unique()));

        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "b", "x": 1}));
        set.add_to_indexes(&a).unwrap();

        // x collides; _id must be rolled back too
        assert!(set.add_to_indexes(&b).is_err());
        assert_eq!(set.all_docs().len(), 1);
        assert_eq!(set.get("x").unwrap().len(), 1);
    }

    #[test]
    fn test_index_set_duplicate_id_rejected() {
        let mut set = IndexSet::new();
        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "a", "x": 2}));
        set.add_to_indexes(&a).unwrap();
        let err = set.add_to_indexes(&b).unwrap_err();
        assert!(matches!(err, OakbaseError::UniqueViolation { .. }));
        assert_eq!(set.all_docs().len(), 1);
    }

    #[test]
    fn test_index_set_bulk_rollback() {
        let mut set = IndexSet::new();
        let docs = vec![
            shared(json!({"_id": "a", "x": 1})),
            shared(json!({"_id": "b", "x": 2})),
            shared(json!({"_id": "a", "x": 3})), // duplicate _id
        ];
        assert!(set.add_many_to_indexes(&docs).is_err());
        assert!(set.all_docs().is_empty());
    }

    #[test]
    fn test_index_set_update_rollback_across_indexes() {
        let mut set = IndexSet::new();
        set.add_index(Index::new(IndexSpec::new("x").unique()));

        let a = shared(json!({"_id": "a", "x": 1}));
        let b = shared(json!({"_id": "b", "x": 2}));
        set.add_to_indexes(&a).unwrap();
        set.add_to_indexes(&b).unwrap();

        // the _id index accepts the change, the x index rejects it
        let mods = vec![Modification {
            old: Arc::clone(&a),
            new: shared(json!({"_id": "a", "x": 2})),
        }];
        assert!(set.update_indexes(&mods).is_err());

        // both indexes back to pre-call state
        assert_eq!(set.all_docs().len(), 2);
        let x = set.get("x").unwrap();
        assert_eq!(x.get_matching(&IndexKey::Int(1)).len(), 1);
        assert_eq!(x.get_matching(&IndexKey::Int(2)).len(), 1);
    }

    #[test]
    fn test_reset_indexes() {
        let mut set = IndexSet::new();
        set.add_index(Index::new(IndexSpec::new("tag")));
        let docs = vec![
            shared(json!({"_id": "a", "tag": "t1"})),
            shared(json!({"_id": "b", "tag": "t2"})),
        ];
        set.reset_indexes(&docs).unwrap();
        assert_eq!(set.all_docs().len(), 2);
        assert_eq!(set.get("tag").unwrap().len(), 2);

        set.reset_indexes(&[]).unwrap();
        assert!(set.all_docs().is_empty());
    }
}
