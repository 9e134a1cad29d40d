// oakbase-core/src/collection.rs
//! The collection facade.
//!
//! Every public operation wraps an internal implementation and runs it
//! through the serial executor; the executor is the only mutual-exclusion
//! mechanism. The internal state (index set, aggregation state,
//! persistence) is one `Core` behind a mutex that only executor commands
//! touch - plus the synchronous `get_all_data` snapshot.

use crate::aggregation::AggregateSpec;
use crate::document::{self, check_document, generate_id, ID_FIELD};
use crate::error::{OakbaseError, Result};
use crate::executor::Executor;
use crate::index::{Index, IndexSet, IndexSpec, Modification, SharedDoc};
use crate::persistence::Persistence;
use crate::query::matches_query;
use crate::query_planner;
use crate::storage::FileStorage;
use crate::update;
use crate::{log_debug, log_trace};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Constructor options
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Datafile path; absent or empty means in-memory
    pub filename: Option<PathBuf>,
    /// Force in-memory mode even when a filename is given
    pub in_memory_only: bool,
    /// Run `load_database` from the constructor
    pub autoload: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Modify every matching document instead of the first
    pub multi: bool,
    /// Insert (query template + update) when nothing matches
    pub upsert: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Remove every matching document instead of the first
    pub multi: bool,
}

/// An embedded document collection.
///
/// In-memory collections are usable immediately. Persistent collections
/// buffer every command until `load_database` has replayed the datafile
/// (the constructor does this itself with `autoload`).
pub struct Collection {
    core: Arc<Mutex<Core>>,
    executor: Arc<Executor>,
}

impl Collection {
    pub fn new(options: CollectionOptions) -> Result<Collection> {
        let in_memory = options.in_memory_only
            || options
                .filename
                .as_ref()
                .map_or(true, |p| p.as_os_str().is_empty());

        let persistence = if in_memory {
            Persistence::in_memory()
        } else {
            // in-memory short-circuits above, so filename is present here
            let filename = options.filename.clone().unwrap_or_default();
            Persistence::new(Box::new(FileStorage::new(filename)))
        };

        let collection = Collection {
            core: Arc::new(Mutex::new(Core {
                indexes: IndexSet::new(),
                aggregate: AggregateSpec::default(),
                persistence,
            })),
            executor: Arc::new(Executor::new(in_memory)?),
        };

        if options.autoload {
            collection.load_database()?;
        }
        Ok(collection)
    }

    /// Shorthand for an in-memory collection
    pub fn in_memory() -> Result<Collection> {
        Collection::new(CollectionOptions::default())
    }

    /// Replay the datafile and rebuild the index set. Submitted with the
    /// executor's bypass flag; completing it marks the executor ready and
    /// releases any buffered commands.
    pub fn load_database(&self) -> Result<()> {
        let core = Arc::clone(&self.core);
        let executor = Arc::clone(&self.executor);
        self.executor.submit(true, move || {
            let result = core.lock().load_database();
            if result.is_ok() {
                executor.set_ready();
            }
            result
        })
    }

    /// Insert one document, returning the committed copy (with its `_id`)
    pub fn insert(&self, doc: Value) -> Result<Value> {
        let core = Arc::clone(&self.core);
        self.executor.submit(false, move || core.lock().insert_one(doc))
    }

    /// Insert a batch atomically with respect to the index set
    pub fn insert_many(&self, docs: Vec<Value>) -> Result<Vec<Value>> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().insert_batch(docs))
    }

    /// All matching documents, shaped by the configured aggregation state
    pub fn find(&self, query: Value) -> Result<Vec<Value>> {
        let core = Arc::clone(&self.core);
        self.executor.submit(false, move || core.lock().find(&query))
    }

    /// One matching document, or `None`
    pub fn find_one(&self, query: Value) -> Result<Option<Value>> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().find_one(&query))
    }

    /// Number of matching documents
    pub fn count(&self, query: Value) -> Result<usize> {
        let core = Arc::clone(&self.core);
        self.executor.submit(false, move || core.lock().count(&query))
    }

    /// Apply `update_query` to matching documents. Returns the number of
    /// replaced documents and whether an upsert happened.
    pub fn update(
        &self,
        query: Value,
        update_query: Value,
        options: UpdateOptions,
    ) -> Result<(usize, bool)> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().update(&query, &update_query, options))
    }

    /// Remove matching documents, returning how many were removed
    pub fn remove(&self, query: Value, options: RemoveOptions) -> Result<usize> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().remove(&query, options))
    }

    /// Create an index over a dotted field path. Creating an index that
    /// already exists is a no-op.
    pub fn ensure_index(&self, spec: IndexSpec) -> Result<()> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().ensure_index(spec))
    }

    /// Delete an index unconditionally
    pub fn remove_index(&self, field_name: &str) -> Result<()> {
        let core = Arc::clone(&self.core);
        let field_name = field_name.to_string();
        self.executor
            .submit(false, move || core.lock().remove_index(&field_name))
    }

    /// Validate and store aggregation state (`$sort`, `$skip`, `$limit`)
    /// consumed by subsequent queries. The state is collection-wide and
    /// stays until the next `aggregate` call replaces it.
    pub fn aggregate(&self, spec: Value) -> Result<()> {
        let core = Arc::clone(&self.core);
        self.executor
            .submit(false, move || core.lock().set_aggregate(&spec))
    }

    /// Synchronous snapshot of every live document, via the `_id` index
    pub fn get_all_data(&self) -> Vec<Value> {
        let core = self.core.lock();
        core.indexes
            .all_docs()
            .iter()
            .map(|doc| (**doc).clone())
            .collect()
    }

    /// Declared shapes of all indexes, `_id` included
    pub fn list_indexes(&self) -> Vec<IndexSpec> {
        self.core.lock().indexes.specs()
    }
}

struct Core {
    indexes: IndexSet,
    aggregate: AggregateSpec,
    persistence: Persistence,
}

impl Core {
    fn load_database(&mut self) -> Result<()> {
        let state = self.persistence.load()?;
        let docs: Vec<SharedDoc> = state.docs.into_iter().map(Arc::new).collect();

        // rebuild from scratch: the `_id` index plus every declared index
        self.indexes = IndexSet::new();
        for spec in state.indexes {
            if spec.field_name != ID_FIELD && !self.indexes.contains(&spec.field_name) {
                self.indexes.add_index(Index::new(spec));
            }
        }
        self.indexes.reset_indexes(&docs)?;

        log_debug!(
            "loaded {} documents, {} indexes",
            docs.len(),
            self.indexes.specs().len()
        );
        Ok(())
    }

    /// Assign an `_id` when absent and validate the structure. The
    /// returned document is the instance that gets committed.
    fn prepare_document(&self, mut doc: Value) -> Result<Value> {
        let obj = doc.as_object_mut().ok_or_else(|| {
            OakbaseError::InvalidDocument("document must be an object".to_string())
        })?;
        match obj.get(ID_FIELD) {
            None => {
                obj.insert(ID_FIELD.to_string(), Value::String(generate_id()));
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(OakbaseError::InvalidDocument(
                    "_id must be a string".to_string(),
                ))
            }
        }
        check_document(&doc)?;
        Ok(doc)
    }

    fn insert_one(&mut self, doc: Value) -> Result<Value> {
        let prepared = Arc::new(self.prepare_document(doc)?);
        self.indexes.add_to_indexes(&prepared)?;
        // the in-memory state stays committed even when the append fails
        self.persistence.persist_new_state([prepared.as_ref()])?;
        log_trace!("inserted {:?}", document::doc_id(&prepared));
        Ok((*prepared).clone())
    }

    fn insert_batch(&mut self, docs: Vec<Value>) -> Result<Vec<Value>> {
        let mut prepared: Vec<SharedDoc> = Vec::with_capacity(docs.len());
        for doc in docs {
            prepared.push(Arc::new(self.prepare_document(doc)?));
        }
        self.indexes.add_many_to_indexes(&prepared)?;
        self.persistence
            .persist_new_state(prepared.iter().map(|doc| doc.as_ref()))?;
        Ok(prepared.iter().map(|doc| (**doc).clone()).collect())
    }

    fn matching_candidates(&self, query: &Value) -> Result<Vec<SharedDoc>> {
        let mut matched = Vec::new();
        for doc in query_planner::candidates(&self.indexes, query) {
            if matches_query(&doc, query)? {
                matched.push(doc);
            }
        }
        Ok(matched)
    }

    fn count(&self, query: &Value) -> Result<usize> {
        Ok(self.matching_candidates(query)?.len())
    }

    fn find(&self, query: &Value) -> Result<Vec<Value>> {
        let matches: Vec<Value> = self
            .matching_candidates(query)?
            .iter()
            .map(|doc| (**doc).clone())
            .collect();
        Ok(self.aggregate.apply(matches, true))
    }

    // Sort applies to the candidate domain before matching, skip/limit
    // never apply, and the last match wins.
    fn find_one(&self, query: &Value) -> Result<Option<Value>> {
        let candidates = self
            .aggregate
            .apply(query_planner::candidates(&self.indexes, query), false);
        let mut found = None;
        for doc in &candidates {
            if matches_query(doc, query)? {
                found = Some((**doc).clone());
            }
        }
        Ok(found)
    }

    fn update(
        &mut self,
        query: &Value,
        update_query: &Value,
        options: UpdateOptions,
    ) -> Result<(usize, bool)> {
        if options.upsert && self.find_one(query)?.is_none() {
            // treat the query as a template for the new document
            let upserted = update::modify(query, update_query)?;
            self.insert_one(upserted)?;
            return Ok((1, true));
        }

        let selected = self
            .aggregate
            .apply(self.matching_candidates(query)?, options.multi);
        let take = if options.multi {
            selected.len()
        } else {
            selected.len().min(1)
        };

        let mut mods = Vec::with_capacity(take);
        for old in selected.into_iter().take(take) {
            let new_doc = update::modify(&old, update_query)?;
            mods.push(Modification {
                old,
                new: Arc::new(new_doc),
            });
        }

        self.indexes.update_indexes(&mods)?;
        self.persistence
            .persist_new_state(mods.iter().map(|m| m.new.as_ref()))?;
        Ok((mods.len(), false))
    }

    fn remove(&mut self, query: &Value, options: RemoveOptions) -> Result<usize> {
        let selected = self
            .aggregate
            .apply(self.matching_candidates(query)?, options.multi);
        let take = if options.multi {
            selected.len()
        } else {
            selected.len().min(1)
        };

        let mut tombstones = Vec::with_capacity(take);
        for doc in selected.iter().take(take) {
            if let Some(id) = document::doc_id(doc) {
                tombstones.push(Persistence::deleted_entry(id));
            }
            self.indexes.remove_from_indexes(doc);
        }

        self.persistence.persist_new_state(tombstones.iter())?;
        Ok(take)
    }

    fn ensure_index(&mut self, spec: IndexSpec) -> Result<()> {
        if spec.field_name.is_empty() {
            return Err(OakbaseError::MissingFieldName);
        }
        if self.indexes.contains(&spec.field_name) {
            return Ok(());
        }

        // fill before install: a constraint violation leaves the set
        // without the new index
        let mut index = Index::new(spec.clone());
        index.reset(&self.indexes.all_docs())?;
        self.indexes.add_index(index);

        log_debug!("created index on '{}'", spec.field_name);
        self.persistence
            .persist_new_state([&Persistence::index_created_entry(&spec)])
    }

    fn remove_index(&mut self, field_name: &str) -> Result<()> {
        self.indexes.remove_index(field_name);
        self.persistence
            .persist_new_state([&Persistence::index_removed_entry(field_name)])
    }

    fn set_aggregate(&mut self, spec: &Value) -> Result<()> {
        self.aggregate = AggregateSpec::parse(spec)?;
        Ok(())
    }
}
