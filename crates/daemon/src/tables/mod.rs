//! Table registrations for the daemon's object kinds
//!
//! The process-wide schema is assembled once, on first use, and frozen
//! afterwards. Registration mistakes (duplicate tables, missing id index)
//! panic during that first use, never later.

pub mod containers;
pub mod execs;

use berth_core::Schema;
use berth_engine::{MemoryStore, StoreConfig};
use once_cell::sync::Lazy;

static SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let mut schema = Schema::new();
    containers::register(&mut schema);
    execs::register(&mut schema);
    schema
});

/// The daemon's schema: the `container` and `exec` tables.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

/// Create a store holding the daemon's tables.
pub fn new_store() -> MemoryStore {
    MemoryStore::new(schema())
}

/// Create a store holding the daemon's tables, with explicit tuning.
pub fn new_store_with_config(config: StoreConfig) -> MemoryStore {
    MemoryStore::with_config(schema(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_registers_both_tables() {
        let schema = schema();
        assert_eq!(schema.len(), 2);

        let container = schema.table(containers::TABLE_CONTAINER).unwrap();
        assert!(container.check_version);
        assert!(container.has_index(berth_core::INDEX_ID));
        assert!(container.has_index(berth_core::INDEX_NAME));

        let exec = schema.table(execs::TABLE_EXEC).unwrap();
        assert!(!exec.check_version);
        assert!(exec.has_index(berth_core::INDEX_CONTAINER_ID));
    }
}
