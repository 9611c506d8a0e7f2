//! Container store adapter
//!
//! [`ContainerStore`] is the surface the daemon calls: plain CRUD over the
//! container table, bulk application of a reducer, a commit that chains
//! the persistence hook, and the wait-for-stop helpers built on the watch
//! bus.

use std::sync::Arc;

use berth_core::By;
use berth_engine::{MemoryStore, Subscription};
use crossbeam_channel::select;
use tracing::error;

use crate::container::Container;
use crate::error::DaemonError;
use crate::tables::containers::{
    create_container, delete_container, find_containers, get_container, match_container_id,
    update_container, ContainerCheck, EventContainerUpdate,
};
use crate::tables::new_store;
use crate::wait::CancelToken;

/// Matches when the observed event concerns the watched container and the
/// observed copy is no longer running.
fn match_container_stop(topic: &Container, observed: &Container) -> bool {
    match_container_id(topic, observed) && !observed.is_running()
}

/// The daemon-facing container store.
///
/// Cheap to clone; clones share the underlying transactional store.
#[derive(Clone)]
pub struct ContainerStore {
    store: Arc<MemoryStore>,
}

impl Default for ContainerStore {
    fn default() -> Self {
        ContainerStore::new()
    }
}

impl ContainerStore {
    /// Create an adapter over a fresh store.
    pub fn new() -> Self {
        ContainerStore {
            store: Arc::new(new_store()),
        }
    }

    /// Create an adapter over an existing store, so containers and execs
    /// can share one transactional domain.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        ContainerStore { store }
    }

    /// The underlying transactional store, for subscriptions and
    /// cross-kind transactions.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Append a new container.
    pub fn add(&self, container: &Container) -> Result<(), DaemonError> {
        self.store.update(|tx| create_container(tx, container))
    }

    /// Fetch a container by id or name (or an unambiguous prefix of
    /// either). Returns `None` when nothing matches.
    pub fn get(&self, id: &str) -> Option<Container> {
        self.store.view(|tx| get_container(tx, id))
    }

    /// Remove a container by id.
    pub fn delete(&self, id: &str) -> Result<(), DaemonError> {
        self.store.update(|tx| delete_container(tx, id))
    }

    /// All containers, in id order.
    pub fn list(&self) -> Vec<Container> {
        match self.store.view(|tx| find_containers(tx, &By::All)) {
            Ok(containers) => containers,
            Err(err) => {
                error!(%err, "error listing containers");
                Vec::new()
            }
        }
    }

    /// Number of stored containers.
    pub fn size(&self) -> usize {
        self.list().len()
    }

    /// First container satisfying `filter`, in id order.
    pub fn first(&self, filter: impl Fn(&Container) -> bool) -> Option<Container> {
        self.list().into_iter().find(|container| filter(container))
    }

    /// Apply `reducer` to every container, each inside its own update.
    ///
    /// The list is read outside any transaction; the reducer must only
    /// mutate the container passed to it. Per-container failures are
    /// logged and skipped so one bad row cannot starve the rest.
    pub fn apply_all(&self, reducer: impl Fn(&mut Container)) {
        let containers = self.list();
        let (_, result) = self.store.batch(|batch| {
            for mut container in containers {
                let id = container.id.clone();
                if let Err(err) = batch.update(|tx| {
                    reducer(&mut container);
                    update_container(tx, &mut container)
                }) {
                    error!(container = %id, %err, "error applying update to container");
                }
            }
            Ok::<(), DaemonError>(())
        });
        if let Err(err) = result {
            error!(%err, "error committing batched container updates");
        }
    }

    /// Write `container` back to the store, then invoke its persistence
    /// hook. A hook failure surfaces to the caller but the in-memory
    /// update stays committed.
    pub fn commit(&self, container: &mut Container) -> Result<(), DaemonError> {
        self.store.update(|tx| update_container(tx, container))?;
        container.to_disk()
    }

    /// Wait until `container` stops and return the stored copy from the
    /// stop event.
    ///
    /// Returns immediately when the caller's copy or the stored copy is
    /// already stopped. The stored-copy check runs after the subscription
    /// is registered, so a stop landing in between is observed either way.
    pub fn wait_stop(
        &self,
        token: &CancelToken,
        container: &Container,
    ) -> Result<Container, DaemonError> {
        if !container.is_running() {
            return Ok(container.clone());
        }
        let sub = self.subscribe_stop(container);
        if let Some(stored) = self.get(&container.id) {
            if !stored.is_running() {
                return Ok(stored);
            }
        }
        self.await_stop(sub, token)
    }

    /// Wait for the next stop event of `container`, even when it is
    /// already stopped. Used by the attach path, which serves stopped
    /// containers too.
    pub fn wait_attach_stop(
        &self,
        token: &CancelToken,
        container: &Container,
    ) -> Result<Container, DaemonError> {
        let sub = self.subscribe_stop(container);
        self.await_stop(sub, token)
    }

    fn subscribe_stop(&self, container: &Container) -> Subscription {
        // Buffer of one: the event may land between registration and the
        // caller reaching its receive.
        let checks: Vec<ContainerCheck> = vec![match_container_stop];
        self.store.subscribe_events_with_buffer(
            1,
            vec![Box::new(EventContainerUpdate {
                container: container.clone(),
                checks,
            })],
        )
    }

    fn await_stop(
        &self,
        sub: Subscription,
        token: &CancelToken,
    ) -> Result<Container, DaemonError> {
        select! {
            recv(sub.receiver()) -> event => match event {
                Ok(event) => {
                    let update = event
                        .as_any()
                        .downcast_ref::<EventContainerUpdate>()
                        .expect("stop subscription only matches container updates");
                    Ok(update.container.clone())
                }
                // The store was closed while we waited.
                Err(_) => Err(DaemonError::WaitCancelled),
            },
            recv(token.receiver()) -> _ => Err(DaemonError::WaitCancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ExitStatus;
    use std::thread;
    use std::time::Duration;

    fn running(id: &str, name: &str) -> Container {
        let mut container = Container::new(id, name);
        container.set_running(1);
        container
    }

    #[test]
    fn test_add_get_delete() {
        let store = ContainerStore::new();
        store.add(&running("c1", "one")).unwrap();
        assert!(store.get("c1").unwrap().is_running());
        store.delete("c1").unwrap();
        assert!(store.get("c1").is_none());
    }

    #[test]
    fn test_list_size_first() {
        let store = ContainerStore::new();
        store.add(&running("b", "two")).unwrap();
        store.add(&running("a", "one")).unwrap();
        store.add(&Container::new("c", "three")).unwrap();

        let ids: Vec<_> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(store.size(), 3);

        let stopped = store.first(|c| !c.is_running()).unwrap();
        assert_eq!(stopped.id, "c");
        assert!(store.first(|c| c.name == "none").is_none());
    }

    #[test]
    fn test_apply_all_persists_reducer_changes() {
        let store = ContainerStore::new();
        store.add(&running("c1", "one")).unwrap();
        store.add(&running("c2", "two")).unwrap();

        store.apply_all(|container| {
            container.image = "patched".to_string();
        });

        for id in ["c1", "c2"] {
            assert_eq!(store.get(id).unwrap().image, "patched");
        }
    }

    #[test]
    fn test_commit_updates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContainerStore::new();
        let mut container = running("c1", "one");
        container.config_path = Some(dir.path().join("c1.json"));
        store.add(&container).unwrap();

        container.set_stopped(&ExitStatus {
            exit_code: 0,
            oom_killed: false,
        });
        store.commit(&mut container).unwrap();

        assert!(!store.get("c1").unwrap().is_running());
        assert_eq!(container.current_version, 1);
        assert!(dir.path().join("c1.json").exists());
    }

    #[test]
    fn test_wait_stop_returns_immediately_when_stopped() {
        let store = ContainerStore::new();
        let container = Container::new("c1", "one");
        let got = store.wait_stop(&CancelToken::never(), &container).unwrap();
        assert_eq!(got.id, "c1");
    }

    #[test]
    fn test_wait_stop_returns_stored_copy_when_already_stopped() {
        let store = ContainerStore::new();
        let mut container = running("c1", "one");
        store.add(&container).unwrap();

        // The caller still believes the container runs; the store knows
        // better.
        let mut stored = store.get("c1").unwrap();
        stored.set_stopped(&ExitStatus {
            exit_code: 3,
            oom_killed: false,
        });
        store.commit(&mut stored).unwrap();

        container.set_running(1);
        let got = store.wait_stop(&CancelToken::never(), &container).unwrap();
        assert_eq!(got.state.exit_code, 3);
    }

    #[test]
    fn test_wait_stop_observes_concurrent_stop() {
        let store = ContainerStore::new();
        let container = running("c1", "one");
        store.add(&container).unwrap();

        let watcher = {
            let store = store.clone();
            let container = container.clone();
            thread::spawn(move || store.wait_stop(&CancelToken::never(), &container))
        };

        // Give the watcher a moment to register, then stop the container.
        thread::sleep(Duration::from_millis(20));
        let mut stored = store.get("c1").unwrap();
        stored.set_stopped(&ExitStatus {
            exit_code: 1,
            oom_killed: false,
        });
        store.commit(&mut stored).unwrap();

        let got = watcher.join().unwrap().unwrap();
        assert!(!got.is_running());
        assert_eq!(got.state.exit_code, 1);
    }

    #[test]
    fn test_wait_stop_cancellation() {
        let store = ContainerStore::new();
        let container = running("c1", "one");
        store.add(&container).unwrap();

        let err = store
            .wait_stop(&CancelToken::after(Duration::from_millis(20)), &container)
            .unwrap_err();
        assert!(matches!(err, DaemonError::WaitCancelled));
    }

    #[test]
    fn test_wait_attach_stop_waits_even_when_stopped() {
        let store = ContainerStore::new();
        let container = Container::new("c1", "one");
        store.add(&container).unwrap();

        // Already stopped, but the attach path still waits for an event.
        let err = store
            .wait_attach_stop(&CancelToken::after(Duration::from_millis(20)), &container)
            .unwrap_err();
        assert!(matches!(err, DaemonError::WaitCancelled));
    }

    #[test]
    fn test_wait_unblocks_when_store_closes() {
        let store = ContainerStore::new();
        let container = running("c1", "one");
        store.add(&container).unwrap();

        let watcher = {
            let store = store.clone();
            let container = container.clone();
            thread::spawn(move || store.wait_stop(&CancelToken::never(), &container))
        };
        thread::sleep(Duration::from_millis(20));
        store.store().close();

        let err = watcher.join().unwrap().unwrap_err();
        assert!(matches!(err, DaemonError::WaitCancelled));
    }
}
