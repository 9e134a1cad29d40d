// oakbase-core/src/persistence.rs
//! The append-log persistence contract.
//!
//! The log is a sequence of line-delimited JSON records, each one of:
//! - a committed document (live state)
//! - a tombstone `{"$$deleted": true, "_id": ...}`
//! - an index marker `{"$$indexCreated": {...}}` / `{"$$indexRemoved": "..."}`
//!
//! The log is append-only; on load it is folded in file order, newer
//! entries superseding older ones by `_id`.

use crate::document::ID_FIELD;
use crate::error::{OakbaseError, Result};
use crate::index::IndexSpec;
use crate::storage::Storage;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Result of folding the log: the live document set and the declared
/// non-`_id` indexes
#[derive(Default, Debug)]
pub struct LoadedState {
    pub docs: Vec<Value>,
    pub indexes: Vec<IndexSpec>,
}

/// Persistence collaborator for one collection. In-memory collections get
/// a backend-less instance whose operations are no-ops.
pub struct Persistence {
    storage: Option<Box<dyn Storage>>,
}

impl Persistence {
    pub fn new(storage: Box<dyn Storage>) -> Persistence {
        Persistence {
            storage: Some(storage),
        }
    }

    pub fn in_memory() -> Persistence {
        Persistence { storage: None }
    }

    pub fn is_in_memory(&self) -> bool {
        self.storage.is_none()
    }

    /// Read and fold the whole log.
    ///
    /// Fold rules, in file order: a document entry supersedes prior
    /// entries with the same `_id`; a tombstone removes the `_id`; index
    /// markers mutate the declared-index set. A line that is not valid
    /// JSON is a corruption error.
    pub fn load(&mut self) -> Result<LoadedState> {
        let storage = match self.storage.as_mut() {
            Some(storage) => storage,
            None => return Ok(LoadedState::default()),
        };

        let raw = storage.read_all()?;
        let mut docs: HashMap<String, Value> = HashMap::new();
        let mut index_specs: HashMap<String, IndexSpec> = HashMap::new();

        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: Value = serde_json::from_str(line)
                .map_err(|err| OakbaseError::Corruption(format!("unreadable log entry: {}", err)))?;

            if entry
                .get("$$deleted")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                if let Some(id) = entry.get(ID_FIELD).and_then(Value::as_str) {
                    docs.remove(id);
                }
            } else if let Some(spec_value) = entry.get("$$indexCreated") {
                let spec: IndexSpec = serde_json::from_value(spec_value.clone()).map_err(|err| {
                    OakbaseError::Corruption(format!("malformed index marker: {}", err))
                })?;
                index_specs.insert(spec.field_name.clone(), spec);
            } else if let Some(field) = entry.get("$$indexRemoved").and_then(Value::as_str) {
                index_specs.remove(field);
            } else if let Some(id) = entry.get(ID_FIELD).and_then(Value::as_str) {
                docs.insert(id.to_string(), entry);
            } else {
                return Err(OakbaseError::Corruption(
                    "log entry carries no _id".to_string(),
                ));
            }
        }

        Ok(LoadedState {
            docs: docs.into_values().collect(),
            indexes: index_specs.into_values().collect(),
        })
    }

    /// Append a batch of entries, one JSON line each, with a single write.
    /// All-or-nothing per call; a no-op without a backend.
    pub fn persist_new_state<'a, I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let storage = match self.storage.as_mut() {
            Some(storage) => storage,
            None => return Ok(()),
        };

        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }
        if buf.is_empty() {
            return Ok(());
        }
        storage.append(buf.as_bytes())
    }

    pub fn deleted_entry(id: &str) -> Value {
        json!({ "$$deleted": true, "_id": id })
    }

    pub fn index_created_entry(spec: &IndexSpec) -> Value {
        json!({ "$$indexCreated": spec })
    }

    pub fn index_removed_entry(field_name: &str) -> Value {
        json!({ "$$indexRemoved": field_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn persisted(entries: &[Value]) -> Persistence {
        let mut persistence = Persistence::new(Box::new(MemoryStorage::new()));
        persistence.persist_new_state(entries.iter()).unwrap();
        persistence
    }

    #[test]
    fn test_in_memory_is_a_noop() {
        let mut persistence = Persistence::in_memory();
        assert!(persistence.is_in_memory());
        persistence
            .persist_new_state([&json!({"_id": "a"})])
            .unwrap();
        let state = persistence.load().unwrap();
        assert!(state.docs.is_empty());
        assert!(state.indexes.is_empty());
    }

    #[test]
    fn test_fold_supersedes_by_id() {
        let mut persistence = persisted(&[
            json!({"_id": "a", "x": 1}),
            json!({"_id": "b", "x": 2}),
            json!({"_id": "a", "x": 9}),
        ]);
        let state = persistence.load().unwrap();
        assert_eq!(state.docs.len(), 2);
        let a = state.docs.iter().find(|d| d["_id"] == "a").unwrap();
        assert_eq!(a["x"], json!(9));
    }

    #[test]
    fn test_fold_tombstone_removes() {
        let mut persistence = persisted(&[
            json!({"_id": "a", "x": 1}),
            Persistence::deleted_entry("a"),
        ]);
        let state = persistence.load().unwrap();
        assert!(state.docs.is_empty());
    }

    #[test]
    fn test_tombstone_for_unknown_id_is_harmless() {
        let mut persistence = persisted(&[Persistence::deleted_entry("ghost")]);
        assert!(persistence.load().unwrap().docs.is_empty());
    }

    #[test]
    fn test_fold_index_markers() {
        let tag = IndexSpec::new("tag").sparse();
        let mut persistence = persisted(&[
            Persistence::index_created_entry(&tag),
            Persistence::index_created_entry(&IndexSpec::new("email").unique()),
            Persistence::index_removed_entry("email"),
        ]);
        let state = persistence.load().unwrap();
        assert_eq!(state.indexes.len(), 1);
        assert_eq!(state.indexes[0].field_name, "tag");
        assert!(state.indexes[0].sparse);
    }

    #[test]
    fn test_recreated_index_takes_latest_flags() {
        let mut persistence = persisted(&[
            Persistence::index_created_entry(&IndexSpec::new("tag")),
            Persistence::index_removed_entry("tag"),
            Persistence::index_created_entry(&IndexSpec::new("tag").unique()),
        ]);
        let state = persistence.load().unwrap();
        assert_eq!(state.indexes.len(), 1);
        assert!(state.indexes[0].unique);
    }

    #[test]
    fn test_unparsable_line_is_corruption() {
        let mut storage = MemoryStorage::new();
        storage.append(b"{\"_id\": \"a\"}\nnot json at all\n").unwrap();
        let mut persistence = Persistence::new(Box::new(storage));
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, OakbaseError::Corruption(_)));
    }

    #[test]
    fn test_entry_without_id_is_corruption() {
        let mut persistence = persisted(&[json!({"x": 1})]);
        assert!(matches!(
            persistence.load(),
            Err(OakbaseError::Corruption(_))
        ));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut storage = MemoryStorage::new();
        storage.append(b"\n{\"_id\": \"a\"}\n\n").unwrap();
        let mut persistence = Persistence::new(Box::new(storage));
        assert_eq!(persistence.load().unwrap().docs.len(), 1);
    }

    #[test]
    fn test_marker_constructors_roundtrip() {
        let entry = Persistence::index_created_entry(&IndexSpec::new("x").unique());
        let spec: IndexSpec =
            serde_json::from_value(entry["$$indexCreated"].clone()).unwrap();
        assert_eq!(spec.field_name, "x");
        assert!(spec.unique);

        let tomb = Persistence::deleted_entry("a");
        assert_eq!(tomb["$$deleted"], json!(true));
        assert_eq!(tomb["_id"], json!("a"));
    }
}
