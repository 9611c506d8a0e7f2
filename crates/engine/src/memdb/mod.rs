//! Copy-on-write multi-index table engine
//!
//! The engine holds one [`Table`] per registered kind; a table holds one
//! ordered byte-keyed tree per index, all pointing at the same `Arc`'d
//! objects. The committed state is a single [`DbRoot`] behind an `Arc`:
//!
//! - a read transaction clones the root `Arc` (O(1)) and observes a frozen
//!   point-in-time view;
//! - a write transaction holds the writer mutex, copies tables lazily on
//!   first mutation (tree clones share the stored objects), and publishes a
//!   new root with one pointer swap on commit.
//!
//! Readers never block and are never blocked; at most one writer is in
//! flight. The engine knows nothing about versions or events - that
//! discipline lives in the transaction layer above.
//!
//! ## Index keys
//!
//! Unique indexes store the indexer output verbatim (NUL terminator
//! included). Non-unique indexes append the object id to the terminated
//! value key, so one value maps to many rows and an exact probe becomes a
//! range scan over the terminated value prefix, yielding rows in key order.

mod txn;

pub(crate) use txn::{ReadTxn, TableView, WriteTxn};

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use berth_core::schema::{IndexSchema, PREFIX};
use berth_core::{strip_terminator, Object, Schema, StoreError, StoreResult, TableConfig};
use parking_lot::{Mutex, RwLock};

/// Rows of one index: encoded key to shared object.
type IndexTree = BTreeMap<Vec<u8>, Arc<dyn Object>>;

/// One table: its descriptor plus one ordered tree per declared index.
#[derive(Clone)]
pub(crate) struct Table {
    config: Arc<TableConfig>,
    /// Parallel to `config.indexes`.
    indexes: Vec<IndexTree>,
}

impl Table {
    fn new(config: Arc<TableConfig>) -> Self {
        let indexes = config.indexes.iter().map(|_| IndexTree::new()).collect();
        Table { config, indexes }
    }

    pub(crate) fn config(&self) -> &TableConfig {
        &self.config
    }

    fn slot(&self, index: &str) -> StoreResult<(&IndexSchema, &IndexTree)> {
        self.config
            .indexes
            .iter()
            .zip(&self.indexes)
            .find(|(schema, _)| schema.name == index)
            .ok_or_else(|| StoreError::NoSuchIndex {
                table: self.config.name.to_string(),
                index: index.to_string(),
            })
    }

    /// Storage key for `obj` under one index, or `None` when the object is
    /// not indexable there.
    fn storage_key(schema: &IndexSchema, obj: &dyn Object) -> Option<Vec<u8>> {
        let mut key = schema.indexer.from_object(obj)?;
        if !schema.unique {
            key.extend_from_slice(obj.id().as_bytes());
        }
        Some(key)
    }

    /// Fetch the stored object with this id, if any.
    pub(crate) fn get(&self, id: &str) -> Option<&Arc<dyn Object>> {
        let (schema, tree) = self
            .slot(berth_core::INDEX_ID)
            .expect("schema registration guarantees an id index");
        tree.get(&schema.indexer.from_args(id))
    }

    /// Exact or prefix lookup on any index. An index name ending in
    /// `_prefix` selects the prefix pseudo-index of its base index.
    /// Returns the first match in key order.
    pub(crate) fn lookup(&self, index: &str, arg: &str) -> StoreResult<Option<&Arc<dyn Object>>> {
        if let Some(base) = index.strip_suffix(PREFIX) {
            return Ok(self.iter_prefix(base, arg)?.next());
        }
        let (schema, tree) = self.slot(index)?;
        let key = schema.indexer.from_args(arg);
        if schema.unique {
            Ok(tree.get(&key))
        } else {
            // Terminated value key is a prefix of every compound key
            // carrying that value.
            Ok(scan(tree, key).next())
        }
    }

    /// First row stored under an already-encoded index value key.
    ///
    /// Used by the transaction layer to probe uniqueness with the exact
    /// byte form an insert would produce.
    pub(crate) fn first_by_value_key(
        &self,
        index: &str,
        key: Vec<u8>,
    ) -> StoreResult<Option<&Arc<dyn Object>>> {
        let (schema, tree) = self.slot(index)?;
        if schema.unique {
            Ok(tree.get(&key))
        } else {
            Ok(scan(tree, key).next())
        }
    }

    /// All rows under an exact index value, in key order.
    pub(crate) fn iter_exact<'a>(
        &'a self,
        index: &str,
        arg: &str,
    ) -> StoreResult<Box<dyn Iterator<Item = &'a Arc<dyn Object>> + 'a>> {
        let (schema, tree) = self.slot(index)?;
        let key = schema.indexer.from_args(arg);
        if schema.unique {
            Ok(Box::new(tree.get(&key).into_iter()))
        } else {
            Ok(Box::new(scan(tree, key)))
        }
    }

    /// All rows whose index value starts with `arg`, in key order.
    pub(crate) fn iter_prefix<'a>(
        &'a self,
        index: &str,
        arg: &str,
    ) -> StoreResult<impl Iterator<Item = &'a Arc<dyn Object>> + 'a> {
        let (schema, tree) = self.slot(index)?;
        let prefix = strip_terminator(schema.indexer.from_args(arg));
        Ok(scan(tree, prefix))
    }

    /// Full scan over the primary index, in id order.
    pub(crate) fn iter_all(&self) -> impl Iterator<Item = &Arc<dyn Object>> {
        let (_, tree) = self
            .slot(berth_core::INDEX_ID)
            .expect("schema registration guarantees an id index");
        tree.values()
    }

    /// Number of stored rows.
    pub(crate) fn len(&self) -> usize {
        let (_, tree) = self
            .slot(berth_core::INDEX_ID)
            .expect("schema registration guarantees an id index");
        tree.len()
    }

    /// Add `obj` to every index, replacing any stored row with the same id.
    pub(crate) fn insert(&mut self, obj: Box<dyn Object>) {
        // A replaced row may carry different secondary keys; drop the old
        // entries before adding the new ones.
        self.remove(obj.id());
        let obj: Arc<dyn Object> = Arc::from(obj);
        for (schema, tree) in self.config.indexes.iter().zip(&mut self.indexes) {
            if let Some(key) = Table::storage_key(schema, obj.as_ref()) {
                tree.insert(key, Arc::clone(&obj));
            }
        }
    }

    /// Remove the row with this id from every index. Returns the removed
    /// object, if any.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Arc<dyn Object>> {
        let old = self.get(id).cloned()?;
        for (schema, tree) in self.config.indexes.iter().zip(&mut self.indexes) {
            if let Some(key) = Table::storage_key(schema, old.as_ref()) {
                tree.remove(&key);
            }
        }
        Some(old)
    }
}

fn scan(tree: &IndexTree, prefix: Vec<u8>) -> impl Iterator<Item = &Arc<dyn Object>> {
    tree.range(prefix.clone()..)
        .take_while(move |(key, _)| key.starts_with(&prefix))
        .map(|(_, obj)| obj)
}

/// The committed state: every table behind one pointer.
pub(crate) struct DbRoot {
    tables: HashMap<&'static str, Arc<Table>>,
}

impl DbRoot {
    pub(crate) fn table(&self, name: &str) -> StoreResult<&Table> {
        self.tables
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn table_arc(&self, name: &str) -> StoreResult<&Arc<Table>> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))
    }
}

/// The table engine: a swappable committed root plus the writer lock.
pub(crate) struct MemDb {
    root: RwLock<Arc<DbRoot>>,
    writer: Mutex<()>,
}

impl MemDb {
    /// Build an empty engine holding one table per schema entry.
    pub(crate) fn new(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .map(|config| (config.name, Arc::new(Table::new(Arc::clone(config)))))
            .collect();
        MemDb {
            root: RwLock::new(Arc::new(DbRoot { tables })),
            writer: Mutex::new(()),
        }
    }

    /// Snapshot the committed root for a reader.
    pub(crate) fn read_txn(&self) -> ReadTxn {
        ReadTxn::new(Arc::clone(&self.root.read()))
    }

    /// Take the exclusive write handle. Blocks while another writer is in
    /// flight.
    pub(crate) fn write_txn(&self) -> WriteTxn<'_> {
        let guard = self.writer.lock();
        let base = Arc::clone(&self.root.read());
        WriteTxn::new(self, guard, base)
    }

    pub(crate) fn swap_root(&self, root: DbRoot) {
        *self.root.write() = Arc::new(root);
    }
}
