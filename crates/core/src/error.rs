//! Error types for the berth store
//!
//! This module defines the unified error type returned by all store APIs.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Error Classification
//!
//! - **Temporal failures (`SequenceConflict`)**: the caller raced another
//!   writer. These are retryable - re-read the object and apply again.
//! - **Structural failures (`Exist`, `NotExist`, `NameConflict`,
//!   `InvalidFindBy`)**: the request itself cannot succeed without a
//!   different input.
//! - **Internal failures (`NoSuchTable`, `NoSuchIndex`)**: a table or index
//!   name reached the engine that the schema never registered. These point at
//!   a bug in an adapter, not at caller data.

use thiserror::Error;

/// Convenience alias for results produced by the store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Unified error type for store operations
///
/// Transaction callbacks abort with the error they return; nothing is
/// published for an aborted transaction. `find` errors short-circuit the
/// result stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A create collided with an existing row on the primary id.
    #[error("object exists")]
    Exist,

    /// An update or delete targeted a row that is not in the table.
    #[error("object does not exist")]
    NotExist,

    /// A create or update would cause two rows to share a name key.
    #[error("name is in use")]
    NameConflict,

    /// The version supplied with an update disagrees with the stored
    /// version. The object was changed between the caller reading it and
    /// writing it back; re-read and retry.
    #[error("update out of sequence")]
    SequenceConflict,

    /// A selector was passed to a table whose `check_type` does not allow it.
    #[error("invalid find selector")]
    InvalidFindBy,

    /// No table with this name was registered in the schema.
    #[error("no table registered under '{0}'")]
    NoSuchTable(String),

    /// The table exists but carries no index with this name.
    #[error("no index '{index}' on table '{table}'")]
    NoSuchIndex {
        /// Table the lookup targeted
        table: String,
        /// Index name that failed to resolve
        index: String,
    },
}

impl StoreError {
    /// Whether retrying the operation against fresh data can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::SequenceConflict)
    }

    /// Whether this error indicates a bug in an adapter rather than bad
    /// caller data.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            StoreError::NoSuchTable(_) | StoreError::NoSuchIndex { .. }
        )
    }
}
