//! Engine-level transaction handles
//!
//! `ReadTxn` is a frozen snapshot of the committed root. `WriteTxn` owns
//! the writer lock and a lazily-populated dirty set; commit folds the dirty
//! tables back into a fresh root and swaps it in, abort is just `drop`.

use std::collections::HashMap;
use std::sync::Arc;

use berth_core::{StoreError, StoreResult};
use parking_lot::MutexGuard;

use super::{DbRoot, MemDb, Table};

/// Read access to a set of tables, satisfied by both transaction shapes.
///
/// A `WriteTxn` sees its own uncommitted mutations; a `ReadTxn` sees the
/// committed state as of its creation.
pub(crate) trait TableView {
    /// Resolve a table by name.
    fn table(&self, name: &str) -> StoreResult<&Table>;
}

/// Point-in-time snapshot for readers. Cheap to create, never blocks.
pub(crate) struct ReadTxn {
    root: Arc<DbRoot>,
}

impl ReadTxn {
    pub(crate) fn new(root: Arc<DbRoot>) -> Self {
        ReadTxn { root }
    }

    #[cfg(test)]
    pub(crate) fn table_arc(&self, name: &str) -> berth_core::StoreResult<&Arc<super::Table>> {
        self.root.table_arc(name)
    }
}

impl TableView for ReadTxn {
    fn table(&self, name: &str) -> StoreResult<&Table> {
        self.root.table(name)
    }
}

/// Exclusive write handle over the engine.
///
/// Tables are copied into the dirty set on first mutation; the copy shares
/// every stored object with the base, so the clone is proportional to the
/// tree structure, not the data.
pub(crate) struct WriteTxn<'a> {
    db: &'a MemDb,
    _guard: MutexGuard<'a, ()>,
    base: Arc<DbRoot>,
    dirty: HashMap<&'static str, Table>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(db: &'a MemDb, guard: MutexGuard<'a, ()>, base: Arc<DbRoot>) -> Self {
        WriteTxn {
            db,
            _guard: guard,
            base,
            dirty: HashMap::new(),
        }
    }

    /// Mutable access to a table, copying it into the dirty set on first
    /// touch.
    pub(crate) fn table_mut(&mut self, name: &str) -> StoreResult<&mut Table> {
        let (key, base_table) = self
            .base
            .tables
            .get_key_value(name)
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))?;
        Ok(self
            .dirty
            .entry(*key)
            .or_insert_with(|| (**base_table).clone()))
    }

    /// Publish the dirty tables as the new committed root and release the
    /// writer lock.
    pub(crate) fn commit(mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let mut tables = self.base.tables.clone();
        for (name, table) in self.dirty.drain() {
            tables.insert(name, Arc::new(table));
        }
        self.db.swap_root(DbRoot { tables });
    }
}

impl TableView for WriteTxn<'_> {
    fn table(&self, name: &str) -> StoreResult<&Table> {
        if let Some(table) = self.dirty.get(name) {
            return Ok(table);
        }
        self.base.table(name)
    }
}
