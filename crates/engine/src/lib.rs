//! Table engine, transactions, and watch bus for the berth object store
//!
//! This crate owns the moving parts of the store:
//! - `memdb` (private): the copy-on-write multi-index table engine
//! - [`tx`]: read and read/write transactions with typed object semantics
//! - [`watch`]: the topic-filtered broadcast bus
//! - [`store`]: the `MemoryStore` facade tying the three together
//!
//! Object kinds and their table registrations live in `berth-daemon`; this
//! crate is generic over anything implementing the `berth-core` contracts.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod memdb;
pub mod store;
pub mod tx;
pub mod watch;

pub use store::{Batch, EventCommit, MemoryStore, StoreConfig};
pub use tx::{CheckType, ReadOps, ReadTx, Tx};
pub use watch::{Filter, Publisher, Subscription, WatchConfig};

#[cfg(test)]
pub(crate) mod testutil;
