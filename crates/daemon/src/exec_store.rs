//! Exec store adapter
//!
//! [`ExecStore`] tracks exec sessions, running and finished, keyed by id
//! and queryable by owning container.

use std::collections::HashMap;
use std::sync::Arc;

use berth_core::By;
use berth_engine::MemoryStore;
use tracing::error;

use crate::error::DaemonError;
use crate::exec::ExecConfig;
use crate::tables::execs::{create_exec, delete_exec, find_execs, get_exec, update_exec};
use crate::tables::new_store;

/// The daemon-facing exec store.
///
/// Cheap to clone; clones share the underlying transactional store.
#[derive(Clone)]
pub struct ExecStore {
    store: Arc<MemoryStore>,
}

impl Default for ExecStore {
    fn default() -> Self {
        ExecStore::new()
    }
}

impl ExecStore {
    /// Create an adapter over a fresh store.
    pub fn new() -> Self {
        ExecStore {
            store: Arc::new(new_store()),
        }
    }

    /// Create an adapter over an existing store, so containers and execs
    /// can share one transactional domain.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        ExecStore { store }
    }

    /// Every stored exec, keyed by id.
    pub fn commands(&self) -> HashMap<String, ExecConfig> {
        self.all()
            .into_iter()
            .map(|exec| (exec.id.clone(), exec))
            .collect()
    }

    /// Append a new exec session.
    pub fn add(&self, exec: &ExecConfig) -> Result<(), DaemonError> {
        self.store.update(|tx| create_exec(tx, exec))
    }

    /// Fetch an exec by id. Returns `None` when absent.
    pub fn get(&self, id: &str) -> Option<ExecConfig> {
        self.store.view(|tx| get_exec(tx, id))
    }

    /// Every exec belonging to a container, in id order.
    pub fn commands_by_container_id(&self, container_id: &str) -> Result<Vec<ExecConfig>, DaemonError> {
        self.store
            .view(|tx| find_execs(tx, &By::ContainerId(container_id.to_string())))
    }

    /// Write an updated exec back to the store.
    pub fn commit(&self, exec: &mut ExecConfig) -> Result<(), DaemonError> {
        self.store.update(|tx| update_exec(tx, exec))
    }

    /// Remove an exec by id.
    pub fn delete(&self, id: &str) -> Result<(), DaemonError> {
        self.store.update(|tx| delete_exec(tx, id))
    }

    /// Ids of every stored exec, in id order.
    pub fn list(&self) -> Vec<String> {
        self.all().into_iter().map(|exec| exec.id).collect()
    }

    fn all(&self) -> Vec<ExecConfig> {
        match self.store.view(|tx| find_execs(tx, &By::All)) {
            Ok(execs) => execs,
            Err(err) => {
                error!(%err, "error listing execs");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_commit_delete() {
        let store = ExecStore::new();
        let mut exec = ExecConfig::new("e1", "c1");
        store.add(&exec).unwrap();

        assert_eq!(store.get("e1").unwrap().container_id, "c1");

        exec.running = true;
        store.commit(&mut exec).unwrap();
        assert!(store.get("e1").unwrap().running);

        store.delete("e1").unwrap();
        assert!(store.get("e1").is_none());
    }

    #[test]
    fn test_commands_and_list() {
        let store = ExecStore::new();
        store.add(&ExecConfig::new("e2", "c1")).unwrap();
        store.add(&ExecConfig::new("e1", "c2")).unwrap();

        assert_eq!(store.list(), ["e1", "e2"]);
        let commands = store.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands["e1"].container_id, "c2");
    }

    #[test]
    fn test_commands_by_container_id() {
        let store = ExecStore::new();
        store.add(&ExecConfig::new("e1", "c1")).unwrap();
        store.add(&ExecConfig::new("e2", "c1")).unwrap();
        store.add(&ExecConfig::new("e3", "c2")).unwrap();

        let hits = store.commands_by_container_id("c1").unwrap();
        let ids: Vec<_> = hits.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e1", "e2"]);
        assert!(store.commands_by_container_id("c9").unwrap().is_empty());
    }
}
