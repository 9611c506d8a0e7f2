//! Container table: registration, events, and typed operations
//!
//! The `container` table indexes rows uniquely by id and, case-insensitively,
//! by name. Updates enforce the optimistic version check.

use std::any::Any;

use berth_core::schema::{INDEX_ID, INDEX_NAME, PREFIX};
use berth_core::{encode_key, By, Event, IndexSchema, Indexer, Object, Schema, StoreError, StoreResult, TableConfig};
use berth_engine::{ReadOps, Tx};

use crate::container::Container;
use crate::error::DaemonError;

/// Name of the container table.
pub const TABLE_CONTAINER: &str = "container";

pub(crate) fn register(schema: &mut Schema) {
    schema.register(TableConfig {
        name: TABLE_CONTAINER,
        indexes: vec![
            IndexSchema {
                name: INDEX_ID,
                unique: true,
                indexer: Box::new(ContainerIndexerById),
            },
            IndexSchema {
                name: INDEX_NAME,
                unique: true,
                indexer: Box::new(ContainerIndexerByName),
            },
        ],
        check_version: true,
    });
}

impl Object for Container {
    fn id(&self) -> &str {
        &self.id
    }
    fn copy_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }
    fn event_create(&self) -> Box<dyn Event> {
        Box::new(EventContainerCreate {
            container: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_update(&self) -> Box<dyn Event> {
        Box::new(EventContainerUpdate {
            container: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_delete(&self) -> Box<dyn Event> {
        Box::new(EventContainerDelete {
            container: self.clone(),
            checks: Vec::new(),
        })
    }
    fn version(&self) -> u64 {
        self.current_version
    }
    fn set_version(&mut self, version: u64) {
        self.current_version = version;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ContainerIndexerById;

impl Indexer for ContainerIndexerById {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        Some(encode_key(obj.id()))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(arg)
    }
}

struct ContainerIndexerByName;

impl Indexer for ContainerIndexerByName {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        let container = as_container_ref(obj);
        Some(encode_key(&container.name.to_lowercase()))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(&arg.to_lowercase())
    }
}

fn as_container_ref(obj: &dyn Object) -> &Container {
    obj.as_any()
        .downcast_ref::<Container>()
        .expect("container table stores Container records")
}

fn as_container(obj: Box<dyn Object>) -> Container {
    as_container_ref(obj.as_ref()).clone()
}

/// Filter predicate applied to (topic payload, observed payload) pairs of
/// a container event topic.
pub type ContainerCheck = fn(&Container, &Container) -> bool;

/// Matches when both events concern the same container id.
pub fn match_container_id(topic: &Container, observed: &Container) -> bool {
    topic.id == observed.id
}

macro_rules! container_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            /// The committed container copy (or, on a topic, the container
            /// the checks compare against).
            pub container: Container,
            /// Check predicates applied with AND logic when this value is
            /// used as a subscription topic.
            pub checks: Vec<ContainerCheck>,
        }

        impl Event for $name {
            fn matches(&self, observed: &dyn Event) -> bool {
                let Some(typed) = observed.as_any().downcast_ref::<$name>() else {
                    return false;
                };
                self.checks
                    .iter()
                    .all(|check| check(&self.container, &typed.container))
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

container_event! {
    /// Emitted when a container is created in the store.
    EventContainerCreate
}
container_event! {
    /// Emitted when a container is updated in the store.
    EventContainerUpdate
}
container_event! {
    /// Emitted when a container is deleted from the store.
    EventContainerDelete
}

/// Create a new container row.
pub fn create_container(tx: &mut Tx<'_>, container: &Container) -> Result<(), DaemonError> {
    tx.create(TABLE_CONTAINER, container)?;
    Ok(())
}

/// Write an updated container back to the store. The committed version is
/// written into `container` so the caller can chain further updates.
pub fn update_container(tx: &mut Tx<'_>, container: &mut Container) -> Result<(), DaemonError> {
    tx.update(TABLE_CONTAINER, container)?;
    Ok(())
}

/// Remove a container row by id.
pub fn delete_container(tx: &mut Tx<'_>, id: &str) -> Result<(), DaemonError> {
    tx.delete(TABLE_CONTAINER, id)?;
    Ok(())
}

/// Look up a container by id or name, falling back to unambiguous
/// prefixes of either. Returns `None` when nothing matches.
pub fn get_container(tx: &impl ReadOps, id: &str) -> Option<Container> {
    if let Some(obj) = tx.get(TABLE_CONTAINER, id) {
        return Some(as_container(obj));
    }
    // Daemon-created names carry a leading slash; normalize before the
    // name probes so a bare name never satisfies an id lookup.
    let name = if id.starts_with('/') {
        id.to_string()
    } else {
        format!("/{id}")
    };
    for (index, key) in [
        (INDEX_NAME.to_string(), name.as_str()),
        (format!("{INDEX_ID}{PREFIX}"), id),
        (format!("{INDEX_NAME}{PREFIX}"), name.as_str()),
    ] {
        if let Ok(Some(obj)) = tx.lookup(TABLE_CONTAINER, &index, key) {
            return Some(as_container(obj));
        }
    }
    None
}

/// Select containers. The container table accepts name, name-prefix, and
/// id-prefix selectors besides the generic ones.
pub fn find_containers(tx: &impl ReadOps, by: &By) -> Result<Vec<Container>, DaemonError> {
    fn check_type(by: &By) -> StoreResult<()> {
        match by {
            By::Name(_) | By::NamePrefix(_) | By::IdPrefix(_) => Ok(()),
            _ => Err(StoreError::InvalidFindBy),
        }
    }

    let mut containers = Vec::new();
    tx.find(TABLE_CONTAINER, by, check_type, &mut |obj| {
        containers.push(as_container(obj))
    })?;
    Ok(containers)
}
