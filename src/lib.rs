//! # berth
//!
//! A concurrency-safe, transactional, in-memory object store with
//! secondary indexes, optimistic versioning, typed change events, and a
//! topic-filtered watch bus: the substrate a container daemon uses to
//! hold its authoritative records while serving reads, writes, and
//! watchers concurrently.
//!
//! # Quick Start
//!
//! ```
//! use berth::{Container, ContainerStore, ExitStatus};
//!
//! let containers = ContainerStore::new();
//!
//! let mut c = Container::new("1a2bc3", "hello");
//! c.set_running(42);
//! containers.add(&c).unwrap();
//!
//! // Readers always see a consistent snapshot and get deep copies.
//! assert!(containers.get("1a2bc3").unwrap().is_running());
//!
//! // Writes go through optimistic-versioned update transactions.
//! c.set_stopped(&ExitStatus { exit_code: 0, oom_killed: false });
//! containers.commit(&mut c).unwrap();
//! assert!(!containers.get("1a2bc3").unwrap().is_running());
//! # containers.store().close();
//! ```
//!
//! # Guarantees
//!
//! - A reader inside `view` observes one frozen snapshot; writers never
//!   block readers.
//! - An `update` either commits atomically or leaves no trace; its events
//!   publish only after commit, in mutation order, with transactions
//!   ordered by commit.
//! - A subscriber sees exactly the events matching its topics; slow
//!   subscribers lose events rather than stalling the store.
//!
//! # Architecture
//!
//! The workspace layers three crates, re-exported here as one surface:
//! `berth-core` (contracts), `berth-engine` (table engine, transactions,
//! watch bus), and `berth-daemon` (container/exec records and adapters).

pub use berth_core::{
    encode_key, By, Event, EventRef, IndexSchema, Indexer, Object, Schema, StoreError,
    StoreResult, TableConfig, INDEX_CONTAINER_ID, INDEX_ID, INDEX_NAME,
};
pub use berth_engine::{
    Batch, EventCommit, MemoryStore, ReadOps, ReadTx, StoreConfig, Subscription, Tx, WatchConfig,
};

pub use berth_daemon::{
    create_container, create_exec, delete_container, delete_exec, find_containers, find_execs,
    get_container, get_exec, match_container_id, match_exec_id, new_store, new_store_with_config,
    schema, update_container, update_exec, CancelToken, Container, ContainerCheck, ContainerStore,
    DaemonError, EventContainerCreate, EventContainerDelete, EventContainerUpdate, EventExecCreate,
    EventExecDelete, EventExecUpdate, ExecCheck, ExecConfig, ExecStore, ExitStatus, State,
    TABLE_CONTAINER, TABLE_EXEC,
};
