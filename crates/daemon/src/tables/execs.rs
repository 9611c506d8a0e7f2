//! Exec table: registration, events, and typed operations
//!
//! The `exec` table indexes rows uniquely by id and non-uniquely by the
//! owning container id. Exec rows elect out of optimistic version checks:
//! the record reports version zero and updates always apply.

use std::any::Any;

use berth_core::schema::{INDEX_CONTAINER_ID, INDEX_ID};
use berth_core::{encode_key, By, Event, IndexSchema, Indexer, Object, Schema, StoreError, StoreResult, TableConfig};
use berth_engine::{ReadOps, Tx};

use crate::error::DaemonError;
use crate::exec::ExecConfig;

/// Name of the exec table.
pub const TABLE_EXEC: &str = "exec";

pub(crate) fn register(schema: &mut Schema) {
    schema.register(TableConfig {
        name: TABLE_EXEC,
        indexes: vec![
            IndexSchema {
                name: INDEX_ID,
                unique: true,
                indexer: Box::new(ExecIndexerById),
            },
            IndexSchema {
                name: INDEX_CONTAINER_ID,
                unique: false,
                indexer: Box::new(ExecIndexerByContainerId),
            },
        ],
        check_version: false,
    });
}

impl Object for ExecConfig {
    fn id(&self) -> &str {
        &self.id
    }
    fn copy_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }
    fn event_create(&self) -> Box<dyn Event> {
        Box::new(EventExecCreate {
            config: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_update(&self) -> Box<dyn Event> {
        Box::new(EventExecUpdate {
            config: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_delete(&self) -> Box<dyn Event> {
        Box::new(EventExecDelete {
            config: self.clone(),
            checks: Vec::new(),
        })
    }
    // Exec rows carry no version; the table's registration also disables
    // the optimistic check.
    fn version(&self) -> u64 {
        0
    }
    fn set_version(&mut self, _version: u64) {}
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ExecIndexerById;

impl Indexer for ExecIndexerById {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        Some(encode_key(obj.id()))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(arg)
    }
}

struct ExecIndexerByContainerId;

impl Indexer for ExecIndexerByContainerId {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        Some(encode_key(&as_exec_ref(obj).container_id))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(arg)
    }
}

fn as_exec_ref(obj: &dyn Object) -> &ExecConfig {
    obj.as_any()
        .downcast_ref::<ExecConfig>()
        .expect("exec table stores ExecConfig records")
}

fn as_exec(obj: Box<dyn Object>) -> ExecConfig {
    as_exec_ref(obj.as_ref()).clone()
}

/// Filter predicate applied to (topic payload, observed payload) pairs of
/// an exec event topic.
pub type ExecCheck = fn(&ExecConfig, &ExecConfig) -> bool;

/// Matches when both events concern the same exec id.
pub fn match_exec_id(topic: &ExecConfig, observed: &ExecConfig) -> bool {
    topic.id == observed.id
}

macro_rules! exec_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            /// The committed exec copy (or, on a topic, the exec the
            /// checks compare against).
            pub config: ExecConfig,
            /// Check predicates applied with AND logic when this value is
            /// used as a subscription topic.
            pub checks: Vec<ExecCheck>,
        }

        impl Event for $name {
            fn matches(&self, observed: &dyn Event) -> bool {
                let Some(typed) = observed.as_any().downcast_ref::<$name>() else {
                    return false;
                };
                self.checks
                    .iter()
                    .all(|check| check(&self.config, &typed.config))
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

exec_event! {
    /// Emitted when an exec is created in the store.
    EventExecCreate
}
exec_event! {
    /// Emitted when an exec is updated in the store.
    EventExecUpdate
}
exec_event! {
    /// Emitted when an exec is deleted from the store.
    EventExecDelete
}

/// Create a new exec row.
pub fn create_exec(tx: &mut Tx<'_>, exec: &ExecConfig) -> Result<(), DaemonError> {
    tx.create(TABLE_EXEC, exec)?;
    Ok(())
}

/// Write an updated exec back to the store.
pub fn update_exec(tx: &mut Tx<'_>, exec: &mut ExecConfig) -> Result<(), DaemonError> {
    tx.update(TABLE_EXEC, exec)?;
    Ok(())
}

/// Remove an exec row by id.
pub fn delete_exec(tx: &mut Tx<'_>, id: &str) -> Result<(), DaemonError> {
    tx.delete(TABLE_EXEC, id)?;
    Ok(())
}

/// Look up an exec by id. Returns `None` when absent.
pub fn get_exec(tx: &impl ReadOps, id: &str) -> Option<ExecConfig> {
    tx.get(TABLE_EXEC, id).map(as_exec)
}

/// Select execs. The exec table accepts the container-id selector besides
/// the generic ones.
pub fn find_execs(tx: &impl ReadOps, by: &By) -> Result<Vec<ExecConfig>, DaemonError> {
    fn check_type(by: &By) -> StoreResult<()> {
        match by {
            By::ContainerId(_) => Ok(()),
            _ => Err(StoreError::InvalidFindBy),
        }
    }

    let mut execs = Vec::new();
    tx.find(TABLE_EXEC, by, check_type, &mut |obj| {
        execs.push(as_exec(obj))
    })?;
    Ok(execs)
}
