//! Typed transaction layer
//!
//! [`ReadTx`] and [`Tx`] wrap the engine handles with object semantics:
//! id-uniqueness on create, optimistic version checks on update, existence
//! checks on delete, name-uniqueness for tables carrying a `name` index,
//! and a per-transaction change list of events that the store publishes
//! once the transaction commits.
//!
//! Every object that crosses the boundary is a deep copy - stored state on
//! the way in, an independent copy on the way out.

use std::collections::HashSet;
use std::sync::Arc;

use berth_core::schema::{INDEX_CONTAINER_ID, INDEX_ID, INDEX_NAME};
use berth_core::{By, EventRef, Object, StoreError, StoreResult};

use crate::memdb::{ReadTxn, Table, TableView, WriteTxn};

/// Per-table selector validation, as declared by the table's adapter.
///
/// Generic selectors (`All`, `Or`) bypass the callback; `Or` children are
/// validated individually.
pub type CheckType = fn(&By) -> StoreResult<()>;

/// Read surface shared by both transaction shapes.
///
/// Adapters write their typed lookups against this trait so the same
/// helper serves `view` callbacks and the read side of `update` callbacks.
pub trait ReadOps {
    /// Exact lookup by id. Returns a deep copy, or `None` when absent.
    fn get(&self, table: &str, id: &str) -> Option<Box<dyn Object>>;

    /// Exact lookup on any index; `X_prefix` selects the prefix
    /// pseudo-index of `X`.
    fn lookup(&self, table: &str, index: &str, key: &str) -> StoreResult<Option<Box<dyn Object>>>;

    /// Select objects and hand a deep copy of each to `append_result`.
    fn find(
        &self,
        table: &str,
        by: &By,
        check_type: CheckType,
        append_result: &mut dyn FnMut(Box<dyn Object>),
    ) -> StoreResult<()>;
}

/// A read transaction: a consistent snapshot that cannot be affected by
/// concurrent writers.
pub struct ReadTx {
    txn: ReadTxn,
}

impl ReadTx {
    pub(crate) fn new(txn: ReadTxn) -> Self {
        ReadTx { txn }
    }

    /// Exact lookup by id. Returns a deep copy, or `None` when absent.
    pub fn get(&self, table: &str, id: &str) -> Option<Box<dyn Object>> {
        get_in(&self.txn, table, id)
    }

    /// Exact lookup on any index; `X_prefix` selects the prefix
    /// pseudo-index of `X`. Non-unique indexes return the first match in
    /// key order.
    pub fn lookup(&self, table: &str, index: &str, key: &str) -> StoreResult<Option<Box<dyn Object>>> {
        lookup_in(&self.txn, table, index, key)
    }

    /// Select objects and hand a deep copy of each to `append_result`.
    /// Results are deduplicated by id; ordering follows the underlying
    /// index of each resolved selector.
    pub fn find(
        &self,
        table: &str,
        by: &By,
        check_type: CheckType,
        append_result: &mut dyn FnMut(Box<dyn Object>),
    ) -> StoreResult<()> {
        find_in(&self.txn, table, by, check_type, append_result)
    }
}

/// A read/write transaction. Mutations are invisible to other transactions
/// until the enclosing `update` commits, at which point the accumulated
/// change list is published in mutation order.
pub struct Tx<'a> {
    txn: WriteTxn<'a>,
    change_list: Vec<EventRef>,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(txn: WriteTxn<'a>) -> Self {
        Tx {
            txn,
            change_list: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (WriteTxn<'a>, Vec<EventRef>) {
        (self.txn, self.change_list)
    }

    /// Exact lookup by id, observing this transaction's own writes.
    pub fn get(&self, table: &str, id: &str) -> Option<Box<dyn Object>> {
        get_in(&self.txn, table, id)
    }

    /// Exact lookup on any index, observing this transaction's own writes.
    pub fn lookup(&self, table: &str, index: &str, key: &str) -> StoreResult<Option<Box<dyn Object>>> {
        lookup_in(&self.txn, table, index, key)
    }

    /// Select objects, observing this transaction's own writes.
    pub fn find(
        &self,
        table: &str,
        by: &By,
        check_type: CheckType,
        append_result: &mut dyn FnMut(Box<dyn Object>),
    ) -> StoreResult<()> {
        find_in(&self.txn, table, by, check_type, append_result)
    }

    /// Add a new object.
    ///
    /// Fails with [`StoreError::Exist`] when the id is taken, and with
    /// [`StoreError::NameConflict`] when the table carries a `name` index
    /// and another row owns the same name key.
    pub fn create(&mut self, table: &str, o: &dyn Object) -> StoreResult<()> {
        debug_assert!(!o.id().is_empty(), "object id must be non-empty");
        {
            let t = self.txn.table(table)?;
            if t.get(o.id()).is_some() {
                return Err(StoreError::Exist);
            }
            if name_collision(t, o)?.is_some() {
                return Err(StoreError::NameConflict);
            }
        }
        let copy = o.copy_object();
        let event = copy.event_create();
        self.txn.table_mut(table)?.insert(copy);
        self.change_list.push(Arc::from(event));
        Ok(())
    }

    /// Replace an existing object.
    ///
    /// Fails with [`StoreError::NotExist`] when the id is unknown and with
    /// [`StoreError::SequenceConflict`] when the table enforces versions
    /// and the supplied version disagrees with the stored one. On success
    /// the stored copy's version is bumped by one and written back to `o`,
    /// so the caller can chain further updates.
    pub fn update(&mut self, table: &str, o: &mut dyn Object) -> StoreResult<()> {
        {
            let t = self.txn.table(table)?;
            let stored = t.get(o.id()).ok_or(StoreError::NotExist)?;
            if t.config().check_version && o.version() != stored.version() {
                return Err(StoreError::SequenceConflict);
            }
            if let Some(existing) = name_collision(t, o)? {
                if existing.id() != o.id() {
                    return Err(StoreError::NameConflict);
                }
            }
        }
        let mut copy = o.copy_object();
        copy.set_version(copy.version() + 1);
        let new_version = copy.version();
        let event = copy.event_update();
        self.txn.table_mut(table)?.insert(copy);
        o.set_version(new_version);
        self.change_list.push(Arc::from(event));
        Ok(())
    }

    /// Remove an object by id.
    ///
    /// Fails with [`StoreError::NotExist`] when absent. The delete event is
    /// captured from the stored copy before removal.
    pub fn delete(&mut self, table: &str, id: &str) -> StoreResult<()> {
        let event = {
            let t = self.txn.table(table)?;
            let stored = t.get(id).ok_or(StoreError::NotExist)?;
            stored.event_delete()
        };
        self.txn.table_mut(table)?.remove(id);
        self.change_list.push(Arc::from(event));
        Ok(())
    }
}

impl ReadOps for ReadTx {
    fn get(&self, table: &str, id: &str) -> Option<Box<dyn Object>> {
        ReadTx::get(self, table, id)
    }
    fn lookup(&self, table: &str, index: &str, key: &str) -> StoreResult<Option<Box<dyn Object>>> {
        ReadTx::lookup(self, table, index, key)
    }
    fn find(
        &self,
        table: &str,
        by: &By,
        check_type: CheckType,
        append_result: &mut dyn FnMut(Box<dyn Object>),
    ) -> StoreResult<()> {
        ReadTx::find(self, table, by, check_type, append_result)
    }
}

impl ReadOps for Tx<'_> {
    fn get(&self, table: &str, id: &str) -> Option<Box<dyn Object>> {
        Tx::get(self, table, id)
    }
    fn lookup(&self, table: &str, index: &str, key: &str) -> StoreResult<Option<Box<dyn Object>>> {
        Tx::lookup(self, table, index, key)
    }
    fn find(
        &self,
        table: &str,
        by: &By,
        check_type: CheckType,
        append_result: &mut dyn FnMut(Box<dyn Object>),
    ) -> StoreResult<()> {
        Tx::find(self, table, by, check_type, append_result)
    }
}

/// Row already holding `o`'s name key, when the table indexes names and
/// `o` is name-indexable.
fn name_collision<'t>(
    table: &'t Table,
    o: &dyn Object,
) -> StoreResult<Option<&'t Arc<dyn Object>>> {
    let Some(name_ix) = table.config().index(INDEX_NAME) else {
        return Ok(None);
    };
    let Some(key) = name_ix.indexer.from_object(o) else {
        return Ok(None);
    };
    table.first_by_value_key(INDEX_NAME, key)
}

fn get_in<V: TableView>(view: &V, table: &str, id: &str) -> Option<Box<dyn Object>> {
    let table = view.table(table).ok()?;
    table.get(id).map(|obj| obj.copy_object())
}

fn lookup_in<V: TableView>(
    view: &V,
    table: &str,
    index: &str,
    key: &str,
) -> StoreResult<Option<Box<dyn Object>>> {
    let table = view.table(table)?;
    Ok(table.lookup(index, key)?.map(|obj| obj.copy_object()))
}

fn find_in<V: TableView>(
    view: &V,
    table: &str,
    by: &By,
    check_type: CheckType,
    append_result: &mut dyn FnMut(Box<dyn Object>),
) -> StoreResult<()> {
    let table = view.table(table)?;
    let mut seen = HashSet::new();
    collect(table, by, check_type, &mut seen, append_result)
}

fn collect(
    table: &Table,
    by: &By,
    check_type: CheckType,
    seen: &mut HashSet<String>,
    append_result: &mut dyn FnMut(Box<dyn Object>),
) -> StoreResult<()> {
    if !by.is_generic() {
        check_type(by)?;
    }
    fn push(
        obj: &Arc<dyn Object>,
        seen: &mut HashSet<String>,
        append: &mut dyn FnMut(Box<dyn Object>),
    ) {
        if seen.insert(obj.id().to_string()) {
            append(obj.copy_object());
        }
    }
    match by {
        By::All => {
            for obj in table.iter_all() {
                push(obj, seen, append_result);
            }
        }
        By::Or(bys) => {
            for sub in bys {
                collect(table, sub, check_type, seen, append_result)?;
            }
        }
        By::Name(name) => {
            for obj in table.iter_exact(INDEX_NAME, name)? {
                push(obj, seen, append_result);
            }
        }
        By::NamePrefix(prefix) => {
            for obj in table.iter_prefix(INDEX_NAME, prefix)? {
                push(obj, seen, append_result);
            }
        }
        By::IdPrefix(prefix) => {
            for obj in table.iter_prefix(INDEX_ID, prefix)? {
                push(obj, seen, append_result);
            }
        }
        By::ContainerId(container_id) => {
            for obj in table.iter_exact(INDEX_CONTAINER_ID, container_id)? {
                push(obj, seen, append_result);
            }
        }
    }
    Ok(())
}
