//! Test fixtures: a minimal object kind with the full index spread.

use std::any::Any;

use berth_core::schema::{INDEX_CONTAINER_ID, INDEX_ID, INDEX_NAME};
use berth_core::{encode_key, By, Event, IndexSchema, Indexer, Object, Schema, StoreResult, TableConfig};

pub(crate) const TABLE_RECORD: &str = "record";
pub(crate) const TABLE_TASK: &str = "task";

/// Versioned record with a case-insensitive name and an owning parent id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Record {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub version: u64,
    pub payload: String,
}

impl Record {
    pub(crate) fn new(id: &str, name: &str, parent: &str) -> Self {
        Record {
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            ..Record::default()
        }
    }
}

pub(crate) type RecordCheck = fn(&Record, &Record) -> bool;

pub(crate) fn match_record_id(a: &Record, b: &Record) -> bool {
    a.id == b.id
}

macro_rules! record_event {
    ($name:ident) => {
        #[derive(Debug, Default)]
        pub(crate) struct $name {
            pub record: Record,
            pub checks: Vec<RecordCheck>,
        }

        impl Event for $name {
            fn matches(&self, observed: &dyn Event) -> bool {
                let Some(typed) = observed.as_any().downcast_ref::<$name>() else {
                    return false;
                };
                self.checks
                    .iter()
                    .all(|check| check(&self.record, &typed.record))
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

record_event!(RecordCreate);
record_event!(RecordUpdate);
record_event!(RecordDelete);

impl Object for Record {
    fn id(&self) -> &str {
        &self.id
    }
    fn copy_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }
    fn event_create(&self) -> Box<dyn Event> {
        Box::new(RecordCreate {
            record: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_update(&self) -> Box<dyn Event> {
        Box::new(RecordUpdate {
            record: self.clone(),
            checks: Vec::new(),
        })
    }
    fn event_delete(&self) -> Box<dyn Event> {
        Box::new(RecordDelete {
            record: self.clone(),
            checks: Vec::new(),
        })
    }
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct RecordById;
impl Indexer for RecordById {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        Some(encode_key(obj.id()))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(arg)
    }
}

struct RecordByName;
impl Indexer for RecordByName {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        let record = obj.as_any().downcast_ref::<Record>()?;
        Some(encode_key(&record.name.to_lowercase()))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(&arg.to_lowercase())
    }
}

struct RecordByParent;
impl Indexer for RecordByParent {
    fn from_object(&self, obj: &dyn Object) -> Option<Vec<u8>> {
        let record = obj.as_any().downcast_ref::<Record>()?;
        Some(encode_key(&record.parent))
    }
    fn from_args(&self, arg: &str) -> Vec<u8> {
        encode_key(arg)
    }
}

/// Two tables over the same kind: `record` with the full index spread and
/// version checks, `task` with only the primary index and no version
/// enforcement.
pub(crate) fn schema() -> Schema {
    let mut schema = Schema::new();
    schema.register(TableConfig {
        name: TABLE_RECORD,
        indexes: vec![
            IndexSchema {
                name: INDEX_ID,
                unique: true,
                indexer: Box::new(RecordById),
            },
            IndexSchema {
                name: INDEX_NAME,
                unique: true,
                indexer: Box::new(RecordByName),
            },
            IndexSchema {
                name: INDEX_CONTAINER_ID,
                unique: false,
                indexer: Box::new(RecordByParent),
            },
        ],
        check_version: true,
    });
    schema.register(TableConfig {
        name: TABLE_TASK,
        indexes: vec![IndexSchema {
            name: INDEX_ID,
            unique: true,
            indexer: Box::new(RecordById),
        }],
        check_version: false,
    });
    schema
}

pub(crate) fn allow_all(_by: &By) -> StoreResult<()> {
    Ok(())
}

pub(crate) fn as_record(obj: Box<dyn Object>) -> Record {
    obj.as_any()
        .downcast_ref::<Record>()
        .expect("fixture table stores records")
        .clone()
}
