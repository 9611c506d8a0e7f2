//! Schema registry and index key encoding
//!
//! A [`Schema`] describes every table the engine will hold: one
//! [`TableConfig`] per object kind, each listing its [`IndexSchema`]
//! descriptors. The schema is built once, before any store is constructed,
//! and is frozen afterwards; registration mistakes are programmer errors and
//! panic.
//!
//! ## Key encoding
//!
//! Index keys are ordered byte sequences terminated by a NUL byte. The
//! terminator is what makes equality and prefix lookups coexist on one
//! ordered map: an equality probe uses the full terminated key, while the
//! companion pseudo-index `X_prefix` strips the terminator and range-scans.
//! Identifiers and indexed values must therefore not contain NUL themselves.

use std::collections::HashMap;
use std::sync::Arc;

use crate::object::Object;

/// Name of the mandatory unique primary index.
pub const INDEX_ID: &str = "id";

/// Conventional name index; tables that carry it get name-uniqueness
/// enforcement in the transaction layer.
pub const INDEX_NAME: &str = "name";

/// Conventional foreign-key index pointing at an owning container.
pub const INDEX_CONTAINER_ID: &str = "container_id";

/// Suffix selecting the prefix pseudo-index of a named index.
pub const PREFIX: &str = "_prefix";

/// Terminator appended to every encoded index key.
pub const KEY_TERMINATOR: u8 = 0;

/// Encode a lookup value as a terminated index key.
///
/// Produces the same byte form indexers emit from objects, so equality
/// lookups match insertions.
pub fn encode_key(value: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(value.len() + 1);
    key.extend_from_slice(value.as_bytes());
    key.push(KEY_TERMINATOR);
    key
}

/// Strip the terminator from an encoded key, leaving the prefix form.
pub fn strip_terminator(mut key: Vec<u8>) -> Vec<u8> {
    if key.last() == Some(&KEY_TERMINATOR) {
        key.pop();
    }
    key
}

/// Extracts ordered byte keys from objects and from lookup arguments.
pub trait Indexer: Send + Sync {
    /// Key for `obj` under this index, or `None` when the object is not
    /// indexable here. The returned key includes the terminator.
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>>;

    /// Encode a lookup argument. Must return the same byte form as
    /// `from_object`, terminator included.
    fn from_args(&self, arg: &str) -> Vec<u8>;
}

/// Descriptor for a single index on a table.
pub struct IndexSchema {
    /// Index name; `id` is reserved for the unique primary index.
    pub name: &'static str,
    /// Whether two rows may share a key under this index.
    pub unique: bool,
    /// Key extraction for this index.
    pub indexer: Box<dyn Indexer>,
}

/// Descriptor for one table: its indexes plus per-table policy.
pub struct TableConfig {
    /// Table name, unique within the schema.
    pub name: &'static str,
    /// Index descriptors. Must contain a unique `id` index.
    pub indexes: Vec<IndexSchema>,
    /// Whether updates enforce the optimistic version check. Tables that
    /// elect out (the exec table) accept updates regardless of the version
    /// carried by the caller's object.
    pub check_version: bool,
}

impl TableConfig {
    /// Look up an index descriptor by name.
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|ix| ix.name == name)
    }

    /// Whether the table declares an index with this name.
    pub fn has_index(&self, name: &str) -> bool {
        self.index(name).is_some()
    }
}

/// Registry of table descriptors, append-only and fully populated before
/// any store is constructed.
///
/// Descriptors are handed out as `Arc`s so the engine's copy-on-write
/// tables can share them without cloning indexers.
#[derive(Default)]
pub struct Schema {
    tables: HashMap<&'static str, Arc<TableConfig>>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Schema::default()
    }

    /// Register a table.
    ///
    /// # Panics
    ///
    /// Panics when the table name is already taken, when the `id` index is
    /// missing or not unique, when two indexes share a name, or when an
    /// index name ends in the reserved `_prefix` suffix. All of these are
    /// initialization-time programmer errors.
    pub fn register(&mut self, config: TableConfig) {
        let mut seen = Vec::with_capacity(config.indexes.len());
        for ix in &config.indexes {
            if ix.name.ends_with(PREFIX) {
                panic!(
                    "index '{}' on table '{}' uses the reserved '{}' suffix",
                    ix.name, config.name, PREFIX
                );
            }
            if seen.contains(&ix.name) {
                panic!(
                    "index '{}' registered twice on table '{}'",
                    ix.name, config.name
                );
            }
            seen.push(ix.name);
        }
        match config.index(INDEX_ID) {
            Some(ix) if ix.unique => {}
            Some(_) => panic!("'id' index on table '{}' must be unique", config.name),
            None => panic!("table '{}' is missing the 'id' index", config.name),
        }
        if self.tables.insert(config.name, Arc::new(config)).is_some() {
            panic!("table registered twice in schema");
        }
    }

    /// Look up a table descriptor.
    pub fn table(&self, name: &str) -> Option<&Arc<TableConfig>> {
        self.tables.get(name)
    }

    /// Iterate over all registered tables.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableConfig>> {
        self.tables.values()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
