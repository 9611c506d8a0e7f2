//! Daemon-level error type
//!
//! Wraps the store taxonomy and adds the failures only the adapters can
//! produce: persistence-hook I/O and wait cancellation.

use berth_core::StoreError;
use thiserror::Error;

/// Errors surfaced by the container and exec adapters.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// An underlying store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persistence hook could not write the container record. The
    /// in-memory update already committed; callers decide whether to
    /// retry the flush.
    #[error("error writing container state to disk")]
    Persist(#[from] std::io::Error),

    /// The persistence hook could not encode the container record.
    #[error("error encoding container state")]
    Encode(#[from] serde_json::Error),

    /// A wait helper was cancelled (deadline reached or store closed)
    /// before the watched container stopped.
    #[error("wait cancelled before the container stopped")]
    WaitCancelled,
}

impl DaemonError {
    /// The store error inside, when this is a store failure.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            DaemonError::Store(err) => Some(err),
            _ => None,
        }
    }
}
