//! The container record
//!
//! [`Container`] is the authoritative in-memory record of one container:
//! identity, image, runtime state, and the optimistic version the store
//! maintains. The record is a plain owned struct - `Clone` is the deep
//! copy the store contract requires.

mod state;

pub use state::{ExitStatus, State};

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Authoritative record for one container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Container {
    /// Stable identifier, unique across the container table.
    pub id: String,
    /// Human-assigned name, unique case-insensitively.
    pub name: String,
    /// Image the container was created from.
    pub image: String,
    /// Runtime state.
    #[serde(default)]
    pub state: State,
    /// Version maintained by the store's optimistic concurrency check.
    /// Callers never set this directly; updates written through the store
    /// bump it and write it back.
    pub current_version: u64,
    /// Where [`Container::to_disk`] persists the record. Runtime wiring,
    /// not part of the persisted form.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Container {
    /// Create a record with the given identity and an empty state.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Container {
            id: id.into(),
            name: name.into(),
            ..Container::default()
        }
    }

    /// Whether the container process is alive.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Mark the container as running under `pid`.
    pub fn set_running(&mut self, pid: u32) {
        self.state.set_running(pid);
    }

    /// Mark the container as stopped with the given exit status.
    pub fn set_stopped(&mut self, exit: &ExitStatus) {
        self.state.set_stopped(exit);
    }

    /// Persistence hook invoked by the container store after a successful
    /// commit. Writes the serialized record to `config_path`; a record
    /// without a configured path persists nowhere and succeeds trivially.
    ///
    /// Failures surface to the caller but never roll back the in-memory
    /// update that preceded them.
    pub fn to_disk(&self) -> Result<(), DaemonError> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        let encoded = serde_json::to_vec_pretty(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }
}
