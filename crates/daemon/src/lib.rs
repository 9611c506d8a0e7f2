//! Container and exec stores over the berth engine
//!
//! This crate holds everything a container daemon consumes:
//! - the [`Container`] and [`ExecConfig`] records,
//! - their table registrations (schema, indexers, typed events),
//! - the [`ContainerStore`] and [`ExecStore`] adapters,
//! - the wait-for-stop helpers with [`CancelToken`] cancellation.
//!
//! The adapters are thin: every operation is a `view`/`update`/`batch`
//! over the transactional core, so the core's isolation, ordering, and
//! event guarantees carry through unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod container_store;
pub mod error;
pub mod exec;
pub mod exec_store;
pub mod tables;
pub mod wait;

pub use container::{Container, ExitStatus, State};
pub use container_store::ContainerStore;
pub use error::DaemonError;
pub use exec::ExecConfig;
pub use exec_store::ExecStore;
pub use tables::containers::{
    create_container, delete_container, find_containers, get_container, match_container_id,
    update_container, ContainerCheck, EventContainerCreate, EventContainerDelete,
    EventContainerUpdate, TABLE_CONTAINER,
};
pub use tables::execs::{
    create_exec, delete_exec, find_execs, get_exec, match_exec_id, update_exec, EventExecCreate,
    EventExecDelete, EventExecUpdate, ExecCheck, TABLE_EXEC,
};
pub use tables::{new_store, new_store_with_config, schema};
pub use wait::CancelToken;
