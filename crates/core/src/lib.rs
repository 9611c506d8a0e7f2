//! Core contracts for the berth object store
//!
//! This crate defines the foundational types shared by the engine and the
//! daemon adapters:
//! - `Object`: the capability set every stored kind implements
//! - `Event`: typed change notifications doubling as subscription topics
//! - `Schema`, `TableConfig`, `IndexSchema`, `Indexer`: the table registry
//! - `By`: the sealed query selector
//! - `StoreError`: the unified error taxonomy
//!
//! Nothing here holds data; the table engine and store facade live in
//! `berth-engine`, the concrete record kinds in `berth-daemon`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod by;
pub mod error;
pub mod object;
pub mod schema;

pub use by::By;
pub use error::{StoreError, StoreResult};
pub use object::{Event, EventRef, Object};
pub use schema::{
    encode_key, strip_terminator, IndexSchema, Indexer, Schema, TableConfig, INDEX_CONTAINER_ID,
    INDEX_ID, INDEX_NAME, KEY_TERMINATOR, PREFIX,
};
