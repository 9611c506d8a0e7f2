//! Store facade
//!
//! [`MemoryStore`] stitches the table engine, the transaction layer, and
//! the watch bus into the transactional contract:
//!
//! - `view` runs a callback against a consistent snapshot;
//! - `update` runs a callback against the exclusive write handle, commits
//!   and publishes on `Ok`, aborts and publishes nothing on `Err`;
//! - `batch` counts successful inner updates inside one write handle;
//! - `subscribe_events` registers a topic-filtered watcher;
//! - `close` shuts the bus down.
//!
//! The publish lock is acquired before a commit and held through
//! publication, so subscribers observe events in commit order across
//! transactions; within one transaction events keep mutation order. A
//! non-empty change list is followed by a synthetic [`EventCommit`].

use std::any::Any;
use std::sync::Arc;

use berth_core::{Event, Schema};
use parking_lot::Mutex;

use crate::memdb::MemDb;
use crate::tx::{ReadTx, Tx};
use crate::watch::{Filter, Publisher, Subscription, WatchConfig};

/// Emitted after the events of a committed transaction whose change list
/// was non-empty. Watchers that re-read via `view` on commit boundaries
/// subscribe to this instead of every object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCommit;

impl Event for EventCommit {
    fn matches(&self, observed: &dyn Event) -> bool {
        observed.as_any().is::<EventCommit>()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Tuning knobs for a store instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Delivery policy of the watch bus.
    pub watch: WatchConfig,
}

/// A concurrency-safe, transactional, in-memory object store.
///
/// Readers run against copy-on-write snapshots and never block; at most
/// one write transaction is in flight at a time. Committed mutations fan
/// out as typed events through the watch bus.
pub struct MemoryStore {
    db: MemDb,
    publisher: Publisher,
    /// Serializes commit + publish so event order equals commit order.
    publish_lock: Mutex<()>,
}

impl MemoryStore {
    /// Create a store holding one table per schema entry.
    pub fn new(schema: &Schema) -> Self {
        MemoryStore::with_config(schema, StoreConfig::default())
    }

    /// Create a store with explicit tuning.
    pub fn with_config(schema: &Schema, config: StoreConfig) -> Self {
        MemoryStore {
            db: MemDb::new(schema),
            publisher: Publisher::new(config.watch),
            publish_lock: Mutex::new(()),
        }
    }

    /// Execute a read transaction. The callback must not retain the
    /// transaction beyond its return.
    pub fn view<R>(&self, cb: impl FnOnce(&ReadTx) -> R) -> R {
        let tx = ReadTx::new(self.db.read_txn());
        cb(&tx)
    }

    /// Execute a read/write transaction.
    ///
    /// When the callback returns `Ok`, the transaction commits and its
    /// change list is published in order; on `Err` the transaction aborts,
    /// nothing becomes visible, and nothing is published. The callback's
    /// error is returned verbatim.
    pub fn update<E>(&self, cb: impl FnOnce(&mut Tx<'_>) -> Result<(), E>) -> Result<(), E> {
        let mut tx = Tx::new(self.db.write_txn());
        cb(&mut tx)?;
        let (txn, changes) = tx.into_parts();
        self.commit_and_publish(txn, changes);
        Ok(())
    }

    /// Apply a batch of updates through one write handle.
    ///
    /// Each [`Batch::update`] call that succeeds is counted; the returned
    /// count is the number of inner callbacks whose effects committed. An
    /// error from the outer callback aborts the whole batch, so the count
    /// is zero alongside the error.
    pub fn batch<E>(
        &self,
        cb: impl FnOnce(&mut Batch<'_>) -> Result<(), E>,
    ) -> (usize, Result<(), E>) {
        let mut batch = Batch {
            tx: Tx::new(self.db.write_txn()),
            applied: 0,
        };
        if let Err(err) = cb(&mut batch) {
            return (0, Err(err));
        }
        let (txn, changes) = batch.tx.into_parts();
        self.commit_and_publish(txn, changes);
        (batch.applied, Ok(()))
    }

    /// Subscribe to committed events matching any of `topics`; an empty
    /// topic list delivers every event.
    pub fn subscribe_events(&self, topics: Vec<Box<dyn Event>>) -> Subscription {
        self.publisher.subscribe(topic_filter(topics))
    }

    /// Like [`MemoryStore::subscribe_events`] with an explicit channel
    /// capacity, for watchers that must not miss a burst between
    /// registration and their first receive.
    pub fn subscribe_events_with_buffer(
        &self,
        buffer: usize,
        topics: Vec<Box<dyn Event>>,
    ) -> Subscription {
        self.publisher.subscribe_with_buffer(buffer, topic_filter(topics))
    }

    /// Close the watch bus. Outstanding transactions still complete;
    /// subsequent subscriptions receive a closed channel.
    pub fn close(&self) {
        self.publisher.close();
    }

    fn commit_and_publish(&self, txn: crate::memdb::WriteTxn<'_>, changes: Vec<berth_core::EventRef>) {
        let _publish = self.publish_lock.lock();
        txn.commit();
        let committed = !changes.is_empty();
        for change in changes {
            self.publisher.publish(change);
        }
        if committed {
            self.publisher.publish(Arc::new(EventCommit));
        }
    }
}

fn topic_filter(topics: Vec<Box<dyn Event>>) -> Filter {
    Box::new(move |observed| {
        topics.is_empty() || topics.iter().any(|topic| topic.matches(observed))
    })
}

/// Handle passed to the [`MemoryStore::batch`] callback.
pub struct Batch<'a> {
    tx: Tx<'a>,
    applied: usize,
}

impl Batch<'_> {
    /// Apply one change to the batch. Atomic per call: an error leaves the
    /// count untouched and is returned to the outer callback.
    pub fn update<E>(&mut self, cb: impl FnOnce(&mut Tx<'_>) -> Result<(), E>) -> Result<(), E> {
        cb(&mut self.tx)?;
        self.applied += 1;
        Ok(())
    }
}
